use crate::tui::spinner;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

/// Centered waiting/no-logs message. A spinner is drawn when `spinner_frame` is given.
pub fn render(f: &mut Frame, area: Rect, message: &str, spinner_frame: Option<usize>) {
    let mut spans = Vec::new();
    if let Some(frame) = spinner_frame {
        spans.push(Span::styled(
            format!("{} ", spinner::frame(frame)),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::styled(message, Style::default().fg(Color::DarkGray)));

    let top = area.y + area.height / 2;
    let line_area = Rect::new(area.x, top.min(area.bottom().saturating_sub(1)), area.width, area.height.min(1));
    f.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        line_area,
    );
}
