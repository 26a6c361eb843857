use crate::app::{PipelineNode, RunState};

/// Holds the run being watched together with the caller's karaoke flag, and knows
/// where that run's resources live on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAugmenter {
    base_url: String,
    organization: String,
    pipeline: String,
    branch: Option<String>,
    run: RunState,
    /// Whether the caller wants the view to follow the running step.
    pub karaoke: bool,
}

impl RunAugmenter {
    pub fn new(
        base_url: &str,
        organization: &str,
        pipeline: &str,
        branch: Option<&str>,
        run: RunState,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            organization: organization.to_string(),
            pipeline: pipeline.to_string(),
            branch: branch.map(str::to_string),
            run,
            karaoke: true,
        }
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn set_run(&mut self, run: RunState) {
        tracing::debug!("augmenter now tracks run {}", run.id);
        self.run = run;
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn is_multi_branch_pipeline(&self) -> bool {
        self.branch.is_some()
    }

    /// `.../blue/rest/organizations/{org}/pipelines/{pipeline}[/branches/{branch}]/runs/{id}/`
    pub fn run_url(&self) -> String {
        let mut url = format!(
            "{}/blue/rest/organizations/{}/pipelines/{}",
            self.base_url,
            self.organization,
            self.pipeline.split('/').collect::<Vec<_>>().join("/pipelines/"),
        );
        if let Some(branch) = &self.branch {
            url.push_str("/branches/");
            url.push_str(&encode_branch(branch));
        }
        url.push_str("/runs/");
        url.push_str(&self.run.id);
        url.push('/');
        url
    }

    pub fn nodes_url(&self) -> String {
        format!("{}nodes/", self.run_url())
    }

    pub fn node_steps_url(&self, node_id: &str) -> String {
        format!("{}nodes/{node_id}/steps/", self.run_url())
    }

    /// Steps of runs that have no stage graph.
    pub fn run_steps_url(&self) -> String {
        format!("{}steps/", self.run_url())
    }

    pub fn step_log_url(&self, step_id: &str) -> String {
        format!("{}steps/{step_id}/log/", self.run_url())
    }

    pub fn nodes_log_url(&self, node: &PipelineNode) -> String {
        format!("{}nodes/{}/log/", self.run_url(), node.id)
    }

    pub fn nodes_log_file_name(&self, node: &PipelineNode) -> String {
        format!("{}-{}-{}.txt", self.file_stem(), self.run.id, node.id)
    }

    pub fn general_log_url(&self) -> String {
        format!("{}log/", self.run_url())
    }

    pub fn general_log_file_name(&self) -> String {
        format!("{}-{}.txt", self.file_stem(), self.run.id)
    }

    /// Dashboard route of the run's pipeline view; node ids are appended to it.
    pub fn pipeline_view_path(&self) -> String {
        let detail = self
            .branch
            .as_deref()
            .map_or_else(|| self.pipeline.clone(), encode_branch);
        format!(
            "/blue/organizations/{}/{}/detail/{}/{}/pipeline",
            self.organization,
            self.pipeline.replace('/', "%2F"),
            detail,
            self.run.id
        )
    }

    fn file_stem(&self) -> String {
        let mut stem = self.pipeline.replace('/', "-");
        if let Some(branch) = &self.branch {
            stem.push('-');
            stem.push_str(&branch.replace('/', "-"));
        }
        stem
    }
}

/// Branch names are double-encoded in Blue Ocean paths (`feature/x` -> `feature%252Fx`).
fn encode_branch(branch: &str) -> String {
    branch.replace('/', "%252F")
}
