use crate::view::mode::{Composition, StructuredBody, StructuredView};
use crate::view::navigation::HistoryRouter;
use crate::view::RunLogView;
use chrono::{DateTime, Utc};
use std::time::Instant;

// Run polling intervals (seconds)
pub const POLL_INTERVAL_ACTIVE: u64 = 3;
pub const POLL_INTERVAL_IDLE: u64 = 30;

// Karaoke timing
pub const DEBOUNCE_MS: u64 = 200;
pub const FOLLOW_INTERVAL_SECS: u64 = 3;

// UI constants
pub const TICK_MS: u64 = 100;
pub const NOTIFICATION_TTL_SECS: u64 = 5;
pub const SPINNER_FRAME_COUNT: usize = 10;
pub const NARROW_WIDTH_THRESHOLD: u16 = 60;
pub const ERROR_TTL_SECS: u64 = 10;

// Log constants
pub const LOG_MAX_LINES: usize = 500;

/// Blue Ocean `state` of a run, stage or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Queued,
    Running,
    Paused,
    Skipped,
    NotBuilt,
    Finished,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn is_active(self) -> bool {
        matches!(self, RunStatus::Running | RunStatus::Paused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    #[serde(other)]
    Unknown,
}

/// A single run of a pipeline, as last reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub id: String,
    pub pipeline: String,
    pub status: RunStatus,
    pub result: Option<RunResult>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

impl RunState {
    pub fn new(id: impl Into<String>, pipeline: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id: id.into(),
            pipeline: pipeline.into(),
            status,
            result: None,
            start_time: None,
            duration_ms: 0,
        }
    }

    pub fn is_queued(&self) -> bool {
        self.status == RunStatus::Queued
    }

    pub fn is_running(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Finished
    }
}

/// A stage or parallel branch of the pipeline graph.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineNode {
    pub id: String,
    pub display_name: String,
    /// `None` until the node has started.
    pub status: Option<RunStatus>,
    pub result: Option<RunResult>,
    pub duration_ms: Option<u64>,
    pub edges: Vec<String>,
}

impl PipelineNode {
    pub fn is_finished(&self) -> bool {
        self.status == Some(RunStatus::Finished)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_some_and(RunStatus::is_active)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub nodes: Vec<PipelineNode>,
}

impl Topology {
    pub fn find(&self, id: &str) -> Option<&PipelineNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepEntry {
    pub id: String,
    pub display_name: String,
    pub status: Option<RunStatus>,
    pub result: Option<RunResult>,
    pub duration_ms: Option<u64>,
    /// Tail of the step log, fetched for the step being followed.
    pub log: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepData {
    pub steps: Vec<StepEntry>,
}

impl StepData {
    pub fn has_results_for_steps(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn last_step(&self) -> Option<&StepEntry> {
        self.steps.last()
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub timestamp: Instant,
}

/// Immutable configuration set at startup.
pub struct AppConfig {
    pub base_url: String,
    pub pipeline: String,
    pub branch: Option<String>,
    pub version_string: String,
}

pub struct AppState {
    pub config: AppConfig,

    // Karaoke view model and the router it navigates through
    pub view: RunLogView,
    pub router: HistoryRouter,

    // Topology selection (index into the fetched node list)
    pub selected_node: usize,

    // Log scrolling; `None` sticks to the bottom
    pub log_scroll: Option<usize>,

    // Free-form run log for pipelines without structured step data
    pub legacy_log: Option<Vec<String>>,
    pub legacy_log_loading: bool,

    // Polling
    pub poll_interval: u64,

    // Transient UI
    pub notifications: Vec<Notification>,
    pub error: Option<(String, Instant)>,
    /// The shown error came from the run poller.
    error_from_poll: bool,
    pub spinner_frame: usize,
    pub should_quit: bool,

    pub desktop_notify: bool,
}

impl AppState {
    pub fn new(config: AppConfig, view: RunLogView) -> Self {
        Self {
            config,
            view,
            router: HistoryRouter::default(),
            selected_node: 0,
            log_scroll: None,
            legacy_log: None,
            legacy_log_loading: false,
            poll_interval: POLL_INTERVAL_ACTIVE,
            notifications: Vec::new(),
            error: None,
            error_from_poll: false,
            spinner_frame: 0,
            should_quit: false,
            desktop_notify: true,
        }
    }

    fn node_count(&self) -> usize {
        self.view
            .pager_snapshot()
            .nodes
            .as_ref()
            .map_or(0, Topology::len)
    }

    pub fn select_prev_node(&mut self) {
        self.selected_node = self.selected_node.saturating_sub(1);
    }

    pub fn select_next_node(&mut self) {
        let count = self.node_count();
        if count > 0 && self.selected_node < count - 1 {
            self.selected_node += 1;
        }
    }

    pub fn selected_node_id(&self) -> Option<String> {
        let snapshot = self.view.pager_snapshot();
        let nodes = snapshot.nodes?;
        nodes.nodes.get(self.selected_node).map(|n| n.id.clone())
    }

    /// Moves the selection onto the node the pager is focused on.
    pub fn sync_selection(&mut self) {
        let snapshot = self.view.pager_snapshot();
        let Some(nodes) = snapshot.nodes else {
            self.selected_node = 0;
            return;
        };
        if let Some(idx) = snapshot
            .current_node
            .as_ref()
            .and_then(|current| nodes.position(&current.id))
        {
            self.selected_node = idx;
        } else if self.selected_node >= nodes.len() {
            self.selected_node = nodes.len().saturating_sub(1);
        }
    }

    pub fn scroll_log_up(&mut self, amount: usize, total: usize, visible_height: usize) {
        let current = self
            .log_scroll
            .unwrap_or_else(|| total.saturating_sub(visible_height));
        self.log_scroll = Some(current.saturating_sub(amount));
    }

    pub fn scroll_log_down(&mut self, amount: usize, total: usize, visible_height: usize) {
        let max_scroll = total.saturating_sub(visible_height);
        let Some(current) = self.log_scroll else {
            return;
        };
        let next = (current + amount).min(max_scroll);
        // Reaching the end re-attaches to the tail.
        self.log_scroll = if next >= max_scroll { None } else { Some(next) };
    }

    pub fn scroll_log_to_top(&mut self) {
        self.log_scroll = Some(0);
    }

    pub fn scroll_log_to_bottom(&mut self) {
        self.log_scroll = None;
    }

    /// Length of whatever log the body currently shows, for scroll clamping.
    pub fn log_line_count(&self) -> usize {
        match self.view.compose() {
            Composition::LegacyLog { .. } => self.legacy_log.as_ref().map_or(0, Vec::len),
            Composition::Structured(StructuredView {
                body: StructuredBody::Steps(list),
                ..
            }) => list
                .steps
                .last()
                .and_then(|s| s.log.as_deref())
                .map_or(0, |l| l.lines().count()),
            _ => 0,
        }
    }

    /// Identity of the shown step list; scrolling resets when it changes.
    pub fn step_list_key(&self) -> Option<String> {
        match self.view.compose() {
            Composition::Structured(StructuredView {
                body: StructuredBody::Steps(list),
                ..
            }) => list.key,
            _ => None,
        }
    }

    pub fn open_legacy_log(&mut self, content: &str) {
        let lines: Vec<String> = content
            .lines()
            .map(std::string::ToString::to_string)
            .collect();
        let lines = if lines.len() > LOG_MAX_LINES {
            lines[lines.len() - LOG_MAX_LINES..].to_vec()
        } else {
            lines
        };
        self.legacy_log = Some(lines);
        self.legacy_log_loading = false;
    }

    pub fn push_notification(&mut self, message: String) {
        self.notifications.push(Notification {
            message,
            timestamp: Instant::now(),
        });
    }

    pub fn prune_notifications(&mut self) {
        let now = Instant::now();
        self.notifications
            .retain(|n| now.duration_since(n.timestamp).as_secs() < NOTIFICATION_TTL_SECS);
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAME_COUNT;
    }

    pub fn set_error(&mut self, msg: String) {
        self.error = Some((msg, Instant::now()));
        self.error_from_poll = false;
    }

    pub fn set_poll_error(&mut self, msg: String) {
        self.set_error(msg);
        self.error_from_poll = true;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.error_from_poll = false;
    }

    /// A poll went through: drop the poller's own failure, keep everything else.
    pub fn clear_poll_error(&mut self) {
        if self.error_from_poll {
            self.clear_error();
        }
    }

    pub fn prune_error(&mut self) {
        if let Some((_, ts)) = &self.error {
            if ts.elapsed().as_secs() >= ERROR_TTL_SECS {
                self.clear_error();
            }
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(msg, _)| msg.as_str())
    }
}
