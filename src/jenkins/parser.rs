//! Blue Ocean REST payloads to domain types.

use crate::app::{PipelineNode, RunResult, RunState, RunStatus, StepEntry};
use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, Result};
use serde::Deserialize;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10 MB

/// Blue Ocean's `startTime` layout, e.g. `2024-03-01T10:15:30.123+0000`.
const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

fn check_response_size(json: &str) -> Result<()> {
    if json.len() > MAX_RESPONSE_SIZE {
        return Err(eyre!(
            "Response too large ({:.1} MB, max {} MB)",
            json.len() as f64 / (1024.0 * 1024.0),
            MAX_RESPONSE_SIZE / (1024 * 1024)
        ));
    }
    Ok(())
}

// -- Intermediate Blue Ocean structs --

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BoRun {
    id: String,
    #[serde(default)]
    pipeline: String,
    #[serde(default)]
    state: Option<RunStatus>,
    #[serde(default)]
    result: Option<RunResult>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    duration_in_millis: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct BoEdge {
    id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BoNode {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    state: Option<RunStatus>,
    #[serde(default)]
    result: Option<RunResult>,
    #[serde(default)]
    duration_in_millis: Option<u64>,
    #[serde(default)]
    edges: Vec<BoEdge>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BoStep {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    state: Option<RunStatus>,
    #[serde(default)]
    result: Option<RunResult>,
    #[serde(default)]
    duration_in_millis: Option<u64>,
}

/// `UNKNOWN` is what Blue Ocean reports while something is still running.
fn known(result: Option<RunResult>) -> Option<RunResult> {
    result.filter(|r| *r != RunResult::Unknown)
}

fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, START_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| tracing::debug!("unparseable startTime {raw:?}: {e}"))
        .ok()
}

impl From<BoRun> for RunState {
    fn from(r: BoRun) -> Self {
        RunState {
            id: r.id,
            pipeline: r.pipeline,
            status: r.state.unwrap_or_default(),
            result: known(r.result),
            start_time: r.start_time.as_deref().and_then(parse_start_time),
            duration_ms: r.duration_in_millis.unwrap_or(0),
        }
    }
}

impl From<BoNode> for PipelineNode {
    fn from(n: BoNode) -> Self {
        PipelineNode {
            display_name: n.display_name.unwrap_or_else(|| n.id.clone()),
            id: n.id,
            status: n.state,
            result: known(n.result),
            duration_ms: n.duration_in_millis,
            edges: n.edges.into_iter().map(|e| e.id).collect(),
        }
    }
}

impl From<BoStep> for StepEntry {
    fn from(s: BoStep) -> Self {
        StepEntry {
            display_name: s.display_name.unwrap_or_else(|| s.id.clone()),
            id: s.id,
            status: s.state,
            result: known(s.result),
            duration_ms: s.duration_in_millis,
            log: None,
        }
    }
}

pub fn parse_run(json: &str) -> Result<RunState> {
    check_response_size(json)?;
    let run: BoRun = serde_json::from_str(json)?;
    Ok(run.into())
}

pub fn parse_nodes(json: &str) -> Result<Vec<PipelineNode>> {
    check_response_size(json)?;
    let nodes: Vec<BoNode> = serde_json::from_str(json)?;
    Ok(nodes.into_iter().map(PipelineNode::from).collect())
}

pub fn parse_steps(json: &str) -> Result<Vec<StepEntry>> {
    check_response_size(json)?;
    let steps: Vec<BoStep> = serde_json::from_str(json)?;
    Ok(steps.into_iter().map(StepEntry::from).collect())
}

/// Takes the last `max_lines` lines from raw log output.
/// Returns `(text, was_truncated)`.
pub fn process_log_output(raw: &str, max_lines: usize) -> (String, bool) {
    let lines: Vec<&str> = raw.lines().collect();
    if lines.len() > max_lines {
        (lines[lines.len() - max_lines..].join("\n"), true)
    } else {
        (raw.trim_end_matches('\n').to_string(), false)
    }
}
