//! Background run-state polling with adaptive interval and exponential backoff.
//!
//! The interval is driven by the main loop through a `watch` channel: short while the run
//! is queued or running, long once it has finished. A change wakes the poller early.

use crate::events::AppEvent;
use crate::jenkins::parser;
use crate::traits::PipelineExecutor;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time;

/// Upper bound for retry delays, in seconds.
pub const MAX_BACKOFF_SECS: u64 = 300;

/// `min(base_interval * 2^failures, MAX_BACKOFF_SECS)`, never below one second.
pub fn backoff_delay(base_interval: u64, failures: u32) -> u64 {
    let multiplier = 1u64.checked_shl(failures).unwrap_or(u64::MAX);
    base_interval
        .saturating_mul(multiplier)
        .clamp(1, MAX_BACKOFF_SECS)
}

#[derive(Debug, PartialEq, Eq)]
enum PollOutcome {
    Success,
    Failure,
    ChannelClosed,
}

pub struct RunPoller {
    executor: Arc<dyn PipelineExecutor>,
    run_url: String,
    tx: mpsc::UnboundedSender<AppEvent>,
    interval_rx: watch::Receiver<u64>,
}

impl RunPoller {
    pub fn new(
        executor: Arc<dyn PipelineExecutor>,
        run_url: String,
        tx: mpsc::UnboundedSender<AppEvent>,
        interval_rx: watch::Receiver<u64>,
    ) -> Self {
        Self {
            executor,
            run_url,
            tx,
            interval_rx,
        }
    }

    pub async fn run(mut self) {
        let mut failures: u32 = 0;
        loop {
            let base_interval = *self.interval_rx.borrow();
            let delay = if failures > 0 {
                backoff_delay(base_interval, failures)
            } else {
                base_interval
            };
            tokio::select! {
                () = time::sleep(time::Duration::from_secs(delay)) => {},
                _ = self.interval_rx.changed() => {},
            }

            match self.poll_once().await {
                PollOutcome::Success => failures = 0,
                PollOutcome::Failure => {
                    failures = failures.saturating_add(1);
                    let next_delay = backoff_delay(base_interval, failures);
                    if self
                        .tx
                        .send(AppEvent::PollFailed(format!(
                            "Run poll failed, retrying in {next_delay}s"
                        )))
                        .is_err()
                    {
                        return;
                    }
                }
                PollOutcome::ChannelClosed => return,
            }
        }
    }

    async fn poll_once(&self) -> PollOutcome {
        let run = match self.executor.fetch_run(&self.run_url).await {
            Ok(json) => parser::parse_run(&json),
            Err(e) => Err(e),
        };
        match run {
            Ok(run) => {
                tracing::trace!("run {} is {:?}", run.id, run.status);
                if self.tx.send(AppEvent::RunUpdate(run)).is_err() {
                    return PollOutcome::ChannelClosed;
                }
                PollOutcome::Success
            }
            Err(e) => {
                tracing::warn!("run poll failed: {e}");
                PollOutcome::Failure
            }
        }
    }
}
