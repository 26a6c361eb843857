use crate::app::{RunResult, RunState};
use notify_rust::{Notification, Urgency};

pub fn send_desktop(run: &RunState) {
    let (summary, icon, urgency) = match run.result {
        Some(RunResult::Success) => ("Pipeline passed", "dialog-information", Urgency::Normal),
        Some(RunResult::Failure) => ("Pipeline failed", "dialog-error", Urgency::Critical),
        Some(RunResult::Unstable) => ("Pipeline unstable", "dialog-warning", Urgency::Normal),
        _ => ("Pipeline finished", "dialog-information", Urgency::Normal),
    };

    let body = match run.result {
        Some(RunResult::Aborted | RunResult::NotBuilt) | None => {
            format!("{} #{} ({:?})", run.pipeline, run.id, run.result)
        }
        _ => format!("{} #{}", run.pipeline, run.id),
    };

    if let Err(e) = Notification::new()
        .summary(summary)
        .body(&body)
        .icon(icon)
        .urgency(urgency)
        .show()
    {
        tracing::debug!("desktop notification failed: {e}");
    }
}
