//! Jenkins SSE gateway client feeding the [`PushBus`].
//!
//! The gateway is session based: `connect` registers a dispatcher for the HTTP session,
//! `configure` subscribes it to channels, and `listen` streams `text/event-stream` for
//! it. All three go through one curl cookie jar so they share the session. The stream
//! is read from a long-lived `curl -N` child.

use crate::bus::{PushBus, PushEvent};
use crate::events::AppEvent;
use crate::jenkins::executor::CurlExecutor;
use crate::jenkins::poller::backoff_delay;
use color_eyre::eyre::{eyre, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const RECONNECT_BASE_SECS: u64 = 2;
const CHANNELS: [&str; 2] = ["pipeline", "job"];

/// Accumulates `data:` lines; a blank line ends the event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    data: Vec<String>,
}

impl SseDecoder {
    /// Feeds one line (without its terminator). Returns the payload of a completed event.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data).join("\n"));
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data
                .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // `event:`, `id:`, `retry:` and `:` comments carry nothing we use.
        None
    }
}

/// Parses a gateway payload and publishes it on its channel's topic.
/// Returns the delivery count; events on channels nobody can subscribe to deliver zero.
pub fn publish_payload(bus: &PushBus, payload: &str) -> Result<usize> {
    let event: PushEvent =
        serde_json::from_str(payload).map_err(|e| eyre!("Malformed push event: {e}"))?;
    match event.topic() {
        Some(topic) => Ok(bus.publish(topic, &event)),
        None => {
            tracing::trace!("dropping event on channel {:?}", event.jenkins_channel);
            Ok(0)
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ConfigureRequest {
    dispatcher_id: String,
    subscribe: Vec<ChannelFilter>,
    unsubscribe: Vec<ChannelFilter>,
}

#[derive(Serialize, Debug, PartialEq)]
struct ChannelFilter {
    jenkins_channel: String,
}

impl ConfigureRequest {
    fn for_channels(dispatcher_id: &str) -> Self {
        Self {
            dispatcher_id: dispatcher_id.to_string(),
            subscribe: CHANNELS
                .iter()
                .map(|c| ChannelFilter {
                    jenkins_channel: (*c).to_string(),
                })
                .collect(),
            unsubscribe: Vec::new(),
        }
    }
}

pub struct SseFeed {
    executor: CurlExecutor,
    base_url: String,
    client_id: String,
    bus: Arc<PushBus>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl SseFeed {
    pub fn new(
        base_url: &str,
        credentials: Option<String>,
        bus: Arc<PushBus>,
        tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let client_id = format!(
            "plw-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_millis()
        );
        let jar = std::env::temp_dir().join(format!("{client_id}.cookies"));
        Self {
            executor: CurlExecutor::new(credentials).with_cookie_jar(jar),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            bus,
            tx,
        }
    }

    fn connect_url(&self) -> String {
        format!("{}/sse-gateway/connect?clientId={}", self.base_url, self.client_id)
    }

    fn configure_url(&self) -> String {
        format!("{}/sse-gateway/configure?batchId=1", self.base_url)
    }

    fn listen_url(&self) -> String {
        format!("{}/sse-gateway/listen/{}", self.base_url, self.client_id)
    }

    /// Keeps a session alive until the UI channel closes, reconnecting with backoff.
    pub async fn run(self) {
        let mut failures: u32 = 0;
        loop {
            let delay = match self.session().await {
                Ok(()) => {
                    tracing::debug!("push stream ended; reconnecting");
                    failures = 0;
                    RECONNECT_BASE_SECS
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = backoff_delay(RECONNECT_BASE_SECS, failures);
                    tracing::warn!("push stream failed: {e}");
                    if self
                        .tx
                        .send(AppEvent::Error(format!(
                            "Live updates unavailable, retrying in {delay}s"
                        )))
                        .is_err()
                    {
                        break;
                    }
                    delay
                }
            };
            if self.tx.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
        self.remove_cookie_jar();
    }

    async fn session(&self) -> Result<()> {
        self.executor.get(&self.connect_url()).await?;
        let body = serde_json::to_string(&ConfigureRequest::for_channels(&self.client_id))?;
        self.executor.post_json(&self.configure_url(), &body).await?;
        tracing::debug!("push dispatcher {} subscribed to {CHANNELS:?}", self.client_id);
        self.listen().await
    }

    async fn listen(&self) -> Result<()> {
        let listen_url = self.listen_url();
        let mut cmd = self.executor.curl_command(&["-N", &listen_url]);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let mut child = cmd
            .spawn()
            .map_err(|e| eyre!("Failed to start push stream: {e}"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| eyre!("push stream has no stdout"))?;

        let mut decoder = SseDecoder::default();
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            let Some(payload) = decoder.push_line(&line) else {
                continue;
            };
            match publish_payload(&self.bus, &payload) {
                Ok(delivered) => tracing::trace!("push event delivered to {delivered}"),
                Err(e) => tracing::debug!("{e}"),
            }
            if self.tx.is_closed() {
                return Ok(());
            }
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(eyre!("push stream exited with {status}"))
        }
    }

    fn remove_cookie_jar(&self) {
        let jar: PathBuf = std::env::temp_dir().join(format!("{}.cookies", self.client_id));
        if let Err(e) = std::fs::remove_file(&jar) {
            tracing::trace!("cookie jar {jar:?} not removed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Topic;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn decoder_joins_data_lines_until_blank() {
        let mut d = SseDecoder::default();
        assert_eq!(d.push_line("event: pipeline"), None);
        assert_eq!(d.push_line("data: {\"a\":"), None);
        assert_eq!(d.push_line("data:1}"), None);
        assert_eq!(d.push_line(""), Some("{\"a\":\n1}".to_string()));
        assert_eq!(d.push_line(""), None);
    }

    #[test]
    fn decoder_handles_crlf_and_comments() {
        let mut d = SseDecoder::default();
        assert_eq!(d.push_line(": keep-alive\r"), None);
        assert_eq!(d.push_line("data: x\r"), None);
        assert_eq!(d.push_line("\r"), Some("x".to_string()));
    }

    #[test]
    fn payload_is_published_on_its_channel() {
        let bus = PushBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = bus.subscribe(Topic::Job, move |e| {
            assert_eq!(e.pipeline_run_id.as_deref(), Some("12"));
            h.fetch_add(1, Ordering::SeqCst);
        });

        let payload = r#"{"jenkins_channel":"job","jenkins_event":"job_run_ended","pipeline_run_id":"12"}"#;
        assert_eq!(publish_payload(&bus, payload).unwrap(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_channel_and_garbage() {
        let bus = PushBus::new();
        let _sub = bus.subscribe(Topic::Pipeline, |_| {});
        let queue = r#"{"jenkins_channel":"queue","jenkins_event":"queue_left"}"#;
        assert_eq!(publish_payload(&bus, queue).unwrap(), 0);
        assert!(publish_payload(&bus, "{\"dispatcherId\":\"x\"}").is_err());
        assert!(publish_payload(&bus, "not json").is_err());
    }

    #[test]
    fn configure_request_subscribes_both_channels() {
        let body = serde_json::to_value(ConfigureRequest::for_channels("plw-1")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "dispatcherId": "plw-1",
                "subscribe": [{"jenkins_channel": "pipeline"}, {"jenkins_channel": "job"}],
                "unsubscribe": []
            })
        );
    }

    #[test]
    fn gateway_urls() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let feed = SseFeed::new("https://ci.example.com/", None, Arc::new(PushBus::new()), tx);
        assert_eq!(
            feed.connect_url(),
            format!("https://ci.example.com/sse-gateway/connect?clientId={}", feed.client_id)
        );
        assert!(feed.listen_url().ends_with(&format!("/sse-gateway/listen/{}", feed.client_id)));
        assert_eq!(
            feed.configure_url(),
            "https://ci.example.com/sse-gateway/configure?batchId=1"
        );
    }
}
