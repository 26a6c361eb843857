use async_trait::async_trait;
use color_eyre::eyre::Result;

/// Transport to the CI server. Every method takes a fully-resolved resource URL
/// (see [`crate::augmenter::RunAugmenter`]) and returns the raw response body.
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    async fn check_available(&self) -> Result<()>;
    async fn fetch_run(&self, url: &str) -> Result<String>;
    async fn fetch_nodes(&self, url: &str) -> Result<String>;
    async fn fetch_steps(&self, url: &str) -> Result<String>;
    async fn fetch_log(&self, url: &str) -> Result<String>;
}
