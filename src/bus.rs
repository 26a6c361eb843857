//! Topic-keyed publish/subscribe for server push events.
//!
//! The SSE feed publishes every decoded event on the topic named by its
//! `jenkins_channel`; views subscribe per topic and get back a [`SubscriptionHandle`]
//! that must be handed back to [`PushBus::unsubscribe`] to stop delivery.

use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Pipeline,
    Job,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Pipeline => "pipeline",
            Topic::Job => "job",
        }
    }

    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            "pipeline" => Some(Topic::Pipeline),
            "job" => Some(Topic::Job),
            _ => None,
        }
    }
}

/// Payload of a Jenkins SSE gateway message. Only the fields the karaoke view reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushEvent {
    #[serde(default)]
    pub jenkins_channel: Option<String>,
    pub jenkins_event: String,
    #[serde(default)]
    pub pipeline_run_id: Option<String>,
}

impl PushEvent {
    pub fn new(channel: Topic, event: &str, run_id: Option<&str>) -> Self {
        Self {
            jenkins_channel: Some(channel.as_str().to_string()),
            jenkins_event: event.to_string(),
            pipeline_run_id: run_id.map(str::to_string),
        }
    }

    pub fn kind(&self) -> PushEventKind {
        PushEventKind::from_name(&self.jenkins_event)
    }

    pub fn topic(&self) -> Option<Topic> {
        self.jenkins_channel.as_deref().and_then(Topic::from_channel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEventKind {
    /// A single step progressed.
    StepProgress,
    PipelineStart,
    PipelineEnd,
    PipelineBlockEnd,
    PipelineStage,
    JobRunEnded,
    Other,
}

impl PushEventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "pipeline_step" => PushEventKind::StepProgress,
            "pipeline_start" => PushEventKind::PipelineStart,
            "pipeline_end" => PushEventKind::PipelineEnd,
            "pipeline_block_end" => PushEventKind::PipelineBlockEnd,
            "pipeline_stage" => PushEventKind::PipelineStage,
            "job_run_ended" => PushEventKind::JobRunEnded,
            _ => PushEventKind::Other,
        }
    }

    /// Events that change the shape or state of the pipeline graph.
    pub fn affects_topology(self) -> bool {
        matches!(
            self,
            PushEventKind::PipelineStart
                | PushEventKind::PipelineEnd
                | PushEventKind::PipelineBlockEnd
                | PushEventKind::PipelineStage
                | PushEventKind::JobRunEnded
        )
    }
}

pub type PushHandler = Arc<dyn Fn(&PushEvent) + Send + Sync>;

/// Proof of a live subscription. Not `Clone`: it can be released only once.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: u64,
    topic: Topic,
}

impl SubscriptionHandle {
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

struct Subscriber {
    id: u64,
    topic: Topic,
    handler: PushHandler,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

#[derive(Default)]
pub struct PushBus {
    inner: Mutex<BusInner>,
}

impl PushBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionHandle
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.push(Subscriber {
            id,
            topic,
            handler: Arc::new(handler),
        });
        tracing::debug!("subscribed #{id} to {}", topic.as_str());
        SubscriptionHandle { id, topic }
    }

    /// Returns whether a live subscription was removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != handle.id);
        let removed = inner.subscribers.len() != before;
        tracing::debug!(
            "unsubscribed #{} from {} (removed: {removed})",
            handle.id,
            handle.topic.as_str()
        );
        removed
    }

    /// Delivers `event` to every handler on `topic`; returns the delivery count.
    pub fn publish(&self, topic: Topic, event: &PushEvent) -> usize {
        // Handlers run outside the lock so they may subscribe or unsubscribe.
        let handlers: Vec<PushHandler> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner
                .subscribers
                .iter()
                .filter(|s| s.topic == topic)
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&PushEvent) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &PushEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn publish_reaches_only_matching_topic() {
        let bus = PushBus::new();
        let (pipeline_hits, on_pipeline) = counter();
        let (job_hits, on_job) = counter();
        let _p = bus.subscribe(Topic::Pipeline, on_pipeline);
        let _j = bus.subscribe(Topic::Job, on_job);

        let event = PushEvent::new(Topic::Pipeline, "pipeline_step", Some("3"));
        assert_eq!(bus.publish(Topic::Pipeline, &event), 1);
        assert_eq!(pipeline_hits.load(Ordering::SeqCst), 1);
        assert_eq!(job_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = PushBus::new();
        let (hits, on_event) = counter();
        let handle = bus.subscribe(Topic::Job, on_event);
        assert_eq!(bus.active_subscriptions(), 1);

        assert!(bus.unsubscribe(handle));
        assert_eq!(bus.active_subscriptions(), 0);
        let event = PushEvent::new(Topic::Job, "job_run_ended", None);
        assert_eq!(bus.publish(Topic::Job, &event), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handles_are_distinct() {
        let bus = PushBus::new();
        let a = bus.subscribe(Topic::Pipeline, |_| {});
        let b = bus.subscribe(Topic::Pipeline, |_| {});
        assert_ne!(a, b);
        assert!(bus.unsubscribe(a));
        assert_eq!(bus.active_subscriptions(), 1);
        assert!(bus.unsubscribe(b));
    }

    #[test]
    fn event_kinds_from_wire_names() {
        assert_eq!(PushEventKind::from_name("pipeline_step"), PushEventKind::StepProgress);
        assert_eq!(PushEventKind::from_name("job_run_ended"), PushEventKind::JobRunEnded);
        assert_eq!(PushEventKind::from_name("job_crud_created"), PushEventKind::Other);
        assert!(PushEventKind::PipelineBlockEnd.affects_topology());
        assert!(!PushEventKind::StepProgress.affects_topology());
        assert!(!PushEventKind::Other.affects_topology());
    }

    #[test]
    fn deserializes_gateway_payload() {
        let json = r#"{
            "jenkins_channel": "pipeline",
            "jenkins_event": "pipeline_stage",
            "pipeline_run_id": "42",
            "pipeline_job_name": "app/main",
            "jenkins_org": "jenkins"
        }"#;
        let event: PushEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.topic(), Some(Topic::Pipeline));
        assert_eq!(event.kind(), PushEventKind::PipelineStage);
        assert_eq!(event.pipeline_run_id.as_deref(), Some("42"));
    }

    #[test]
    fn unknown_channel_has_no_topic() {
        let mut event = PushEvent::new(Topic::Job, "x", None);
        event.jenkins_channel = Some("queue".to_string());
        assert_eq!(event.topic(), None);
    }
}
