pub mod footer;
pub mod header;
pub mod legacy_log;
pub mod placeholder;
pub mod render;
pub mod spinner;
pub mod steps;
pub mod toolbar;
pub mod topology;

use crate::app::{RunResult, RunStatus};
use ratatui::style::Color;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub(crate) fn status_icon(status: Option<RunStatus>, result: Option<RunResult>) -> (&'static str, Color) {
    match (status, result) {
        (_, Some(RunResult::Success)) => ("✓", Color::Green),
        (_, Some(RunResult::Failure)) => ("✗", Color::Red),
        (_, Some(RunResult::Unstable)) => ("!", Color::Yellow),
        (_, Some(RunResult::Aborted)) => ("⊘", Color::Yellow),
        (_, Some(RunResult::NotBuilt)) | (Some(RunStatus::Skipped | RunStatus::NotBuilt), _) => {
            ("⊘", Color::DarkGray)
        }
        (Some(RunStatus::Running), _) => ("⟳", Color::Yellow),
        (Some(RunStatus::Paused), _) => ("‖", Color::Yellow),
        (Some(RunStatus::Queued), _) | (None, _) => ("○", Color::DarkGray),
        _ => ("·", Color::DarkGray),
    }
}

pub(crate) fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Cuts `s` to `max_width` terminal columns, ending in `…` when shortened.
pub(crate) fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for c in s.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw + 1 > max_width {
            break;
        }
        result.push(c);
        width += cw;
    }
    result.push('…');
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59_999), "59s");
        assert_eq!(format_duration(61_000), "1m 1s");
        assert_eq!(format_duration(3_720_000), "1h 2m");
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn result_wins_over_state() {
        assert_eq!(
            status_icon(Some(RunStatus::Finished), Some(RunResult::Failure)).0,
            "✗"
        );
        assert_eq!(status_icon(Some(RunStatus::Running), None).0, "⟳");
        assert_eq!(status_icon(None, None).0, "○");
    }
}
