use crate::app::StepEntry;
use crate::tui::{format_duration, status_icon, truncate};
use crate::view::mode::StepList;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// First visible log line for a scroll offset; `None` sticks to the tail.
pub fn log_window_start(total: usize, visible: usize, scroll: Option<usize>) -> usize {
    let max = total.saturating_sub(visible);
    scroll.map_or(max, |s| s.min(max))
}

fn step_line(step: &StepEntry, width: usize) -> Line<'_> {
    let (icon, color) = status_icon(step.status, step.result);
    let duration = step.duration_ms.map(format_duration).unwrap_or_default();
    let name_width = width.saturating_sub(duration.len() + 4);
    Line::from(vec![
        Span::styled(format!(" {icon} "), Style::default().fg(color)),
        Span::raw(format!("{:<name_width$}", truncate(&step.display_name, name_width))),
        Span::styled(duration, Style::default().fg(Color::DarkGray)),
    ])
}

pub fn render(f: &mut Frame, area: Rect, list: &StepList, log_scroll: Option<usize>) {
    let list_height = (list.steps.len() as u16).min(area.height / 3).max(1);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(list_height), Constraint::Min(1)])
        .split(area);

    // Keep the newest steps visible.
    let skip = list.steps.len().saturating_sub(list_height as usize);
    let width = chunks[0].width as usize;
    let lines: Vec<Line> = list
        .steps
        .iter()
        .skip(skip)
        .map(|s| step_line(s, width))
        .collect();
    f.render_widget(Paragraph::new(lines), chunks[0]);

    let Some(last) = list.steps.last() else {
        return;
    };
    let log: Vec<&str> = last.log.as_deref().map_or_else(Vec::new, |l| l.lines().collect());
    let inner = chunks[1].height.saturating_sub(2) as usize;
    let start = log_window_start(log.len(), inner, log_scroll);

    let mut title = vec![Span::styled(
        format!(" {} ", last.display_name),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if list.follow_along && log_scroll.is_none() {
        title.push(Span::styled("[following] ", Style::default().fg(Color::Green)));
    }
    if log.len() > inner {
        title.push(Span::styled(
            format!("[{}-{}/{}] ", start + 1, (start + inner).min(log.len()), log.len()),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let visible: Vec<Line> = log
        .iter()
        .skip(start)
        .take(inner)
        .map(|l| Line::from(Span::raw(*l)))
        .collect();
    let body = Paragraph::new(visible).block(
        Block::default()
            .title(Line::from(title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(body, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_sticks_to_tail() {
        assert_eq!(log_window_start(100, 20, None), 80);
        assert_eq!(log_window_start(10, 20, None), 0);
    }

    #[test]
    fn window_clamps_manual_scroll() {
        assert_eq!(log_window_start(100, 20, Some(5)), 5);
        assert_eq!(log_window_start(100, 20, Some(95)), 80);
    }
}
