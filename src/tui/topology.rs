use crate::tui::status_icon;
use crate::view::mode::TopologyPanel;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Stage strip. `cursor` is the keyboard selection; the pager's focus is underlined.
pub fn render(f: &mut Frame, area: Rect, panel: &TopologyPanel, cursor: usize) {
    let mut spans = Vec::new();
    for (i, node) in panel.nodes.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" → ", Style::default().fg(Color::DarkGray)));
        }
        let (icon, color) = status_icon(node.status, node.result);
        spans.push(Span::styled(format!("{icon} "), Style::default().fg(color)));

        let mut style = Style::default().fg(Color::White);
        if panel.selected.as_deref() == Some(node.id.as_str()) {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        if i == cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(node.display_name.as_str(), style));
    }

    let mut title = format!(" {} ", panel.pipeline_name);
    if let Some(branch) = &panel.branch_name {
        title.push_str(&format!("[{branch}] "));
    }
    title.push_str(&format!("#{} ", panel.run_id));

    let strip = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(strip, area);
}
