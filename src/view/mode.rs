//! Display mode selection and the composition handed to the renderer.

use super::ViewProps;
use crate::app::{PipelineNode, RunState, StepData, StepEntry};
use crate::i18n::Translator;
use crate::pager::PagerSnapshot;

pub const QUEUED_MESSAGE_KEY: &str = "rundetail.pipeline.queued.message";
pub const PENDING_MESSAGE_KEY: &str = "rundetail.pipeline.pending.message";
pub const STEPS_TITLE_KEY: &str = "rundetail.pipeline.steps";
pub const NO_STEPS_KEY: &str = "rundetail.pipeline.nosteps";

/// Session-local follow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KaraokeSession {
    pub karaoke: bool,
    /// Cleared by the first sign of activity, to avoid flicker.
    pub show_pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Queued,
    /// Nothing structured to show: fall back to the free-form run log.
    NoDataFallback,
    Pending,
    /// Running without step results yet; shown as queued.
    QueuedByInference,
    Normal,
}

pub fn select_mode(run: &RunState, snapshot: &PagerSnapshot, session: &KaraokeSession) -> DisplayMode {
    let no_results = !snapshot
        .steps
        .as_ref()
        .is_some_and(StepData::has_results_for_steps);

    if run.is_queued() {
        DisplayMode::Queued
    } else if no_results && snapshot.nodes.is_none() && !snapshot.pending {
        DisplayMode::NoDataFallback
    } else if snapshot.pending && session.show_pending {
        DisplayMode::Pending
    } else if run.is_running() && no_results {
        DisplayMode::QueuedByInference
    } else {
        DisplayMode::Normal
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLocation {
    pub url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogToolbar {
    pub title: String,
    pub location: LogLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopologyPanel {
    pub nodes: Vec<PipelineNode>,
    pub selected: Option<String>,
    pub pipeline_name: String,
    /// Only set for multibranch pipelines.
    pub branch_name: Option<String>,
    pub run_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepList {
    /// Changes whenever a different step list is shown; the renderer resets scrolling on it.
    pub key: Option<String>,
    pub steps: Vec<StepEntry>,
    pub follow_along: bool,
    pub scroll_to_bottom: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructuredBody {
    Steps(StepList),
    NoSteps { message: String },
    Queued { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredView {
    pub topology: Option<TopologyPanel>,
    pub toolbar: Option<LogToolbar>,
    pub body: StructuredBody,
}

/// The one leaf view to draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Composition {
    Placeholder { message: String },
    LegacyLog { location: Option<LogLocation> },
    Structured(StructuredView),
}

fn queued_message(t: &Translator) -> String {
    t.t(QUEUED_MESSAGE_KEY, "Waiting for run to start", &[])
}

pub fn compose(mode: DisplayMode, props: &ViewProps, snapshot: &PagerSnapshot) -> Composition {
    let t = props.t.as_ref();
    match mode {
        DisplayMode::Queued => Composition::Placeholder {
            message: queued_message(t),
        },
        DisplayMode::Pending => Composition::Placeholder {
            message: t.t(PENDING_MESSAGE_KEY, "Waiting for backend to response", &[]),
        },
        DisplayMode::NoDataFallback => Composition::LegacyLog {
            location: props.augmenter.as_ref().map(|a| LogLocation {
                url: a.general_log_url(),
                file_name: a.general_log_file_name(),
            }),
        },
        DisplayMode::QueuedByInference | DisplayMode::Normal => {
            Composition::Structured(structured(mode, props, snapshot))
        }
    }
}

fn structured(mode: DisplayMode, props: &ViewProps, snapshot: &PagerSnapshot) -> StructuredView {
    let t = props.t.as_ref();
    let multibranch = props
        .augmenter
        .as_ref()
        .is_some_and(|a| a.is_multi_branch_pipeline());
    let topology = snapshot.nodes.as_ref().map(|nodes| TopologyPanel {
        nodes: nodes.nodes.clone(),
        selected: snapshot.current_node.as_ref().map(|n| n.id.clone()),
        pipeline_name: props.pipeline_name.clone(),
        branch_name: props.branch.clone().filter(|_| multibranch),
        run_id: props.run.id.clone(),
    });

    if mode == DisplayMode::QueuedByInference {
        return StructuredView {
            topology,
            toolbar: None,
            body: StructuredBody::Queued {
                message: queued_message(t),
            },
        };
    }

    let current = snapshot
        .nodes
        .as_ref()
        .and(snapshot.current_node.as_ref());
    let title = current
        .map(|n| t.t(STEPS_TITLE_KEY, "Steps {0}", &[&n.display_name]))
        .unwrap_or_default();
    let toolbar = props.augmenter.as_ref().map(|a| LogToolbar {
        title,
        location: match current {
            Some(node) => LogLocation {
                url: a.nodes_log_url(node),
                file_name: a.nodes_log_file_name(node),
            },
            None => LogLocation {
                url: a.general_log_url(),
                file_name: a.general_log_file_name(),
            },
        },
    });

    let body = match snapshot
        .steps
        .as_ref()
        .filter(|s| s.has_results_for_steps())
    {
        Some(steps) => StructuredBody::Steps(StepList {
            key: snapshot.current_steps_url.clone(),
            steps: steps.steps.clone(),
            follow_along: props.augmenter.as_ref().is_some_and(|a| a.karaoke),
            scroll_to_bottom: props.scroll_to_bottom,
        }),
        None => StructuredBody::NoSteps {
            message: t.t(NO_STEPS_KEY, "There are no logs", &[]),
        },
    };

    StructuredView {
        topology,
        toolbar,
        body,
    }
}
