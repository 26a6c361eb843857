use crate::traits::PipelineExecutor;
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

const CURL_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

/// Talks to the Blue Ocean REST API through the `curl` binary.
pub struct CurlExecutor {
    /// `user:token` for basic auth.
    credentials: Option<String>,
    /// Keeps the session cookie between requests that must share one.
    cookie_jar: Option<PathBuf>,
}

impl CurlExecutor {
    pub fn new(credentials: Option<String>) -> Self {
        Self {
            credentials,
            cookie_jar: None,
        }
    }

    pub fn with_cookie_jar(mut self, path: PathBuf) -> Self {
        self.cookie_jar = Some(path);
        self
    }

    /// Base invocation shared by every request: silent, fail on HTTP errors, follow
    /// redirects, and authenticate when credentials were given.
    pub fn curl_command(&self, extra: &[&str]) -> Command {
        let mut cmd = Command::new("curl");
        cmd.args(["-sSfL"]);
        if let Some(credentials) = &self.credentials {
            cmd.args(["--user", credentials]);
        }
        if let Some(jar) = &self.cookie_jar {
            cmd.arg("-c").arg(jar).arg("-b").arg(jar);
        }
        cmd.args(extra);
        cmd
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        run_curl(self.curl_command(&[url]), url).await
    }

    /// POSTs a JSON body; used to configure push subscriptions.
    pub async fn post_json(&self, url: &str, body: &str) -> Result<String> {
        let cmd = self.curl_command(&[
            "-X",
            "POST",
            "-H",
            "Content-Type: application/json",
            "--data",
            body,
            url,
        ]);
        run_curl(cmd, url).await
    }
}

#[async_trait]
impl PipelineExecutor for CurlExecutor {
    async fn check_available(&self) -> Result<()> {
        let mut cmd = Command::new("curl");
        cmd.arg("--version");
        run_curl(cmd, "curl --version").await.map(|_| ())
    }

    async fn fetch_run(&self, url: &str) -> Result<String> {
        self.get(url).await
    }

    async fn fetch_nodes(&self, url: &str) -> Result<String> {
        self.get(url).await
    }

    async fn fetch_steps(&self, url: &str) -> Result<String> {
        self.get(url).await
    }

    async fn fetch_log(&self, url: &str) -> Result<String> {
        self.get(url).await
    }
}

async fn run_curl(mut cmd: Command, target: &str) -> Result<String> {
    let start = std::time::Instant::now();
    let output = tokio::time::timeout(CURL_TIMEOUT, cmd.kill_on_drop(true).output())
        .await
        .map_err(|_| eyre!("Request to {target} timed out after {}s", CURL_TIMEOUT.as_secs()))?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                eyre!("curl not found. Install it with your package manager.")
            } else {
                eyre!("Failed to run curl: {e}")
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(eyre!("{}", classify_curl_error(&stderr)));
    }
    check_body_size(output.stdout.len())?;

    tracing::debug!(
        request = target,
        elapsed_ms = start.elapsed().as_millis(),
        "curl request completed"
    );
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn check_body_size(len: usize) -> Result<()> {
    if len > BODY_SIZE_LIMIT {
        return Err(eyre!(
            "Response too large ({:.1} MB, max {} MB)",
            len as f64 / (1024.0 * 1024.0),
            BODY_SIZE_LIMIT / (1024 * 1024)
        ));
    }
    Ok(())
}

pub fn classify_curl_error(stderr: &str) -> String {
    if stderr.contains("error: 401") || stderr.contains("error: 403") {
        "Not authorized by Jenkins. Pass --user <user:api-token>.".to_string()
    } else if stderr.contains("error: 404") {
        "Not found on Jenkins. Check --pipeline, --branch and --run.".to_string()
    } else if stderr.contains("Could not resolve host") || stderr.contains("Failed to connect") {
        format!("Jenkins unreachable: {}", stderr.trim())
    } else {
        let trimmed = stderr.trim();
        if trimmed.is_empty() {
            "curl request failed".to_string()
        } else {
            format!("curl request failed: {trimmed}")
        }
    }
}
