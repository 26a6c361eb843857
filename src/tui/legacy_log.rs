use crate::tui::{placeholder, steps::log_window_start};
use crate::view::mode::LogLocation;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub struct LegacyLogProps<'a> {
    pub location: Option<&'a LogLocation>,
    pub lines: Option<&'a [String]>,
    pub loading: bool,
    pub scroll: Option<usize>,
    pub spinner_frame: usize,
}

/// Free-form run log for runs without structured step data.
pub fn render(f: &mut Frame, area: Rect, props: &LegacyLogProps) {
    let Some(lines) = props.lines else {
        let message = if props.loading { "Loading log" } else { "No log loaded" };
        placeholder::render(f, area, message, props.loading.then_some(props.spinner_frame));
        return;
    };

    let inner = area.height.saturating_sub(2) as usize;
    let start = log_window_start(lines.len(), inner, props.scroll);
    let title = props
        .location
        .map_or_else(|| " Log ".to_string(), |l| format!(" {} ", l.file_name));
    let position = if lines.len() > inner {
        format!(" [{}-{}/{}] ", start + 1, (start + inner).min(lines.len()), lines.len())
    } else {
        String::new()
    };

    let visible: Vec<Line> = lines
        .iter()
        .skip(start)
        .take(inner)
        .map(|l| Line::from(Span::raw(l.as_str())))
        .collect();
    let block = Block::default()
        .title(format!("{title}{position}"))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(Paragraph::new(visible).block(block), area);
}
