use crate::app::AppState;
use crate::tui::{spinner, status_icon};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let run = &state.view.props().run;
    let mut spans = vec![
        Span::styled(
            format!(" {} ", state.config.version_string),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(
            &state.config.pipeline,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    if let Some(branch) = &state.config.branch {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("[{branch}]"),
            Style::default().fg(Color::Yellow),
        ));
    }

    let (icon, color) = status_icon(Some(run.status), run.result);
    spans.push(Span::raw(format!(" #{} ", run.id)));
    spans.push(Span::styled(icon, Style::default().fg(color)));

    if state.view.karaoke_enabled() {
        spans.push(Span::styled(
            " [follow]",
            Style::default().fg(Color::Green),
        ));
    }

    if state.view.pager_snapshot().pending || state.legacy_log_loading {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            spinner::frame(state.spinner_frame).to_string(),
            Style::default().fg(Color::Yellow),
        ));
    }

    if state.error_message().is_some() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            "!",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(header, area);
}
