//! Dashboard routes for focusing a pipeline node.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
}

impl Location {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
        }
    }
}

pub trait Router {
    fn push(&mut self, location: Location);
}

/// Records every push; the host drains the latest one and turns it into new view props.
#[derive(Debug, Default)]
pub struct HistoryRouter {
    history: Vec<Location>,
    pending: Option<Location>,
}

impl HistoryRouter {
    pub fn history(&self) -> &[Location] {
        &self.history
    }

    pub fn take_pending(&mut self) -> Option<Location> {
        self.pending.take()
    }
}

impl Router for HistoryRouter {
    fn push(&mut self, location: Location) {
        tracing::debug!("navigating to {}", location.pathname);
        self.history.push(location.clone());
        self.pending = Some(location);
    }
}

const PIPELINE_SEGMENT: &str = "pipeline";

/// Path that focuses `node_id`: appended to the pipeline view path, replacing any node
/// already in it.
pub fn next_node_path(pathname: &str, node_id: &str) -> String {
    let trimmed = pathname.trim_end_matches('/');
    let segments: Vec<&str> = trimmed.split('/').collect();
    let base = match segments.iter().rposition(|s| *s == PIPELINE_SEGMENT) {
        Some(idx) => segments[..=idx].join("/"),
        None => trimmed.to_string(),
    };
    format!("{base}/{node_id}")
}

/// The focus-node route parameter: the segment after `pipeline`, if any.
pub fn node_from_path(pathname: &str) -> Option<String> {
    let segments: Vec<&str> = pathname.split('/').collect();
    let idx = segments.iter().rposition(|s| *s == PIPELINE_SEGMENT)?;
    segments
        .get(idx + 1)
        .filter(|s| !s.is_empty())
        .map(|s| (*s).to_string())
}
