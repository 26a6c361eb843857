use crate::app::AppState;
use crate::tui::legacy_log::{self, LegacyLogProps};
use crate::tui::{footer, header, placeholder, steps, toolbar, topology};
use crate::view::mode::{Composition, StructuredBody, StructuredView};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Frame;

pub fn render(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Min(1),    // body
            Constraint::Length(2), // footer
        ])
        .split(f.area());

    header::render(f, chunks[0], state);
    render_body(f, chunks[1], state);
    footer::render(f, chunks[2], state);

    // Error overlay
    if let Some(err) = state.error_message() {
        let area = f.area();
        if area.height > 6 && area.width >= 4 {
            use ratatui::style::{Color, Style};
            use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
            let err_area = Rect {
                x: area.x + 1,
                y: area.y + area.height.saturating_sub(5),
                width: area.width.saturating_sub(2),
                height: 3,
            };
            let err_widget = Paragraph::new(err.to_owned())
                .style(Style::default().fg(Color::Red))
                .block(
                    Block::default()
                        .title(" Error ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Red)),
                )
                .wrap(Wrap { trim: true });
            f.render_widget(err_widget, err_area);
        }
    }
}

fn render_body(f: &mut Frame, area: Rect, state: &AppState) {
    match state.view.compose() {
        Composition::Placeholder { message } => {
            placeholder::render(f, area, &message, Some(state.spinner_frame));
        }
        Composition::LegacyLog { location } => {
            let props = LegacyLogProps {
                location: location.as_ref(),
                lines: state.legacy_log.as_deref(),
                loading: state.legacy_log_loading,
                scroll: state.log_scroll,
                spinner_frame: state.spinner_frame,
            };
            legacy_log::render(f, area, &props);
        }
        Composition::Structured(view) => render_structured(f, area, state, &view),
    }
}

fn render_structured(f: &mut Frame, area: Rect, state: &AppState, view: &StructuredView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if view.topology.is_some() { 3 } else { 0 }),
            Constraint::Length(u16::from(view.toolbar.is_some())),
            Constraint::Min(1),
        ])
        .split(area);

    if let Some(panel) = &view.topology {
        topology::render(f, chunks[0], panel, state.selected_node);
    }
    if let Some(bar) = &view.toolbar {
        toolbar::render(f, chunks[1], bar);
    }
    match &view.body {
        StructuredBody::Steps(list) => steps::render(f, chunks[2], list, state.log_scroll),
        StructuredBody::NoSteps { message } => placeholder::render(f, chunks[2], message, None),
        StructuredBody::Queued { message } => {
            placeholder::render(f, chunks[2], message, Some(state.spinner_frame));
        }
    }
}
