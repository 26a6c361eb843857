use crate::tui::truncate;
use crate::view::mode::LogToolbar;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

/// Title on the left, log file name and URL after it.
pub fn render(f: &mut Frame, area: Rect, toolbar: &LogToolbar) {
    let width = area.width as usize;
    let mut spans = Vec::new();
    if !toolbar.title.is_empty() {
        spans.push(Span::styled(
            format!(" {} ", toolbar.title),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw("│ "));
    }
    spans.push(Span::styled(
        toolbar.location.file_name.as_str(),
        Style::default().fg(Color::Cyan),
    ));
    let used: usize = spans.iter().map(Span::width).sum();
    let room = width.saturating_sub(used + 1);
    if room > 8 {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            truncate(&toolbar.location.url, room),
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
