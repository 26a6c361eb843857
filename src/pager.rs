//! Fetching and caching of pipeline topology and step data.
//!
//! A [`NodePager`] is driven synchronously from the UI thread: every method returns
//! immediately and the actual requests run on tokio tasks. Results land in a shared
//! [`PagerSnapshot`] and every change is announced with [`AppEvent::PagerUpdated`], so the
//! UI re-renders from the latest snapshot instead of awaiting anything.
//!
//! [`PipelinePager`] keeps at most one fetch task alive. Each spawn (and every
//! [`NodePager::clear`]) bumps a generation counter; a task only publishes while its
//! generation is current, so results of aborted or superseded fetches are dropped even if
//! the abort lands after the response.

use crate::app::{PipelineNode, StepData, Topology, FOLLOW_INTERVAL_SECS, LOG_MAX_LINES};
use crate::augmenter::RunAugmenter;
use crate::events::AppEvent;
use crate::jenkins::parser;
use crate::traits::PipelineExecutor;
use color_eyre::eyre::{eyre, Report, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagerSnapshot {
    /// A topology fetch is in flight.
    pub pending: bool,
    /// `None` until a topology has been fetched, and for runs without a stage graph.
    pub nodes: Option<Topology>,
    pub steps: Option<StepData>,
    pub current_node: Option<PipelineNode>,
    pub current_steps_url: Option<String>,
    pub error: Option<String>,
}

pub trait NodePager {
    fn snapshot(&self) -> PagerSnapshot;
    fn set_run(&mut self, augmenter: &RunAugmenter);
    /// Refetches the topology, focusing `node` when given.
    fn fetch_nodes(&mut self, node: Option<&str>) -> Result<()>;
    /// Refetches the steps (and the followed log) of the current node.
    fn fetch_current_step_url(&mut self) -> Result<()>;
    /// Cancels pending work, including the follow timer.
    fn clear(&mut self);
    /// Whether successful fetches keep refreshing while the focused node runs.
    fn set_follow(&mut self, follow: bool);
}

/// Node to show when the caller did not ask for one (or asked for one that is gone):
/// the first running node, else the last one.
pub fn resolve_focus<'a>(topology: &'a Topology, requested: Option<&str>) -> Option<&'a PipelineNode> {
    requested
        .and_then(|id| topology.find(id))
        .or_else(|| topology.nodes.iter().find(|n| n.is_active()))
        .or_else(|| topology.nodes.last())
}

#[derive(Default)]
struct PagerShared {
    snapshot: PagerSnapshot,
    generation: u64,
    loading_topology: bool,
    follow: bool,
    /// Completion of the bound run; decides following when there is no stage graph.
    run_completed: bool,
}

fn lock(shared: &Mutex<PagerShared>) -> MutexGuard<'_, PagerShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn runtime() -> Result<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|e| eyre!("pager needs a tokio runtime: {e}"))
}

pub struct PipelinePager {
    executor: Arc<dyn PipelineExecutor>,
    augmenter: RunAugmenter,
    requested_node: Option<String>,
    shared: Arc<Mutex<PagerShared>>,
    tx: mpsc::UnboundedSender<AppEvent>,
    follow_interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl PipelinePager {
    pub fn new(
        executor: Arc<dyn PipelineExecutor>,
        augmenter: RunAugmenter,
        node: Option<&str>,
        tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            executor,
            requested_node: node.map(str::to_string),
            shared: Arc::new(Mutex::new(PagerShared {
                follow: true,
                run_completed: augmenter.run().is_completed(),
                ..PagerShared::default()
            })),
            tx,
            follow_interval: Duration::from_secs(FOLLOW_INTERVAL_SECS),
            task: None,
            augmenter,
        }
    }

    pub fn with_follow_interval(mut self, interval: Duration) -> Self {
        self.follow_interval = interval;
        self
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn next_generation(&self) -> u64 {
        let mut shared = lock(&self.shared);
        shared.generation += 1;
        shared.generation
    }

    fn context(&self, generation: u64) -> FetchContext {
        FetchContext {
            executor: Arc::clone(&self.executor),
            augmenter: self.augmenter.clone(),
            shared: Arc::clone(&self.shared),
            tx: self.tx.clone(),
            generation,
            follow_interval: self.follow_interval,
        }
    }

    fn notify(&self) {
        if self.tx.send(AppEvent::PagerUpdated).is_err() {
            tracing::warn!("pager: channel closed");
        }
    }
}

impl NodePager for PipelinePager {
    fn snapshot(&self) -> PagerSnapshot {
        lock(&self.shared).snapshot.clone()
    }

    fn set_run(&mut self, augmenter: &RunAugmenter) {
        tracing::debug!("pager rebound to run {}", augmenter.run().id);
        lock(&self.shared).run_completed = augmenter.run().is_completed();
        self.augmenter = augmenter.clone();
    }

    fn fetch_nodes(&mut self, node: Option<&str>) -> Result<()> {
        let runtime = runtime()?;
        if let Some(node) = node {
            self.requested_node = Some(node.to_string());
        }
        self.abort_task();
        let generation = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.loading_topology = true;
            shared.snapshot.pending = true;
            shared.generation
        };
        self.notify();

        let ctx = self.context(generation);
        let requested = self.requested_node.clone();
        tracing::debug!("fetching nodes (focus {requested:?}, gen {generation})");
        self.task = Some(runtime.spawn(ctx.run_topology_fetch(requested)));
        Ok(())
    }

    fn fetch_current_step_url(&mut self) -> Result<()> {
        let runtime = runtime()?;
        let focus = {
            let shared = lock(&self.shared);
            if shared.loading_topology {
                tracing::trace!("topology fetch in flight; it brings fresh steps");
                return Ok(());
            }
            shared.snapshot.current_node.clone()
        };
        self.abort_task();
        let generation = self.next_generation();
        let ctx = self.context(generation);
        let requested = self.requested_node.clone();
        self.task = Some(runtime.spawn(ctx.run_steps_refresh(focus, requested)));
        Ok(())
    }

    fn clear(&mut self) {
        self.abort_task();
        let was_pending = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.loading_topology = false;
            std::mem::replace(&mut shared.snapshot.pending, false)
        };
        if was_pending {
            self.notify();
        }
    }

    fn set_follow(&mut self, follow: bool) {
        tracing::debug!("pager follow {}", if follow { "on" } else { "off" });
        lock(&self.shared).follow = follow;
    }
}

impl Drop for PipelinePager {
    fn drop(&mut self) {
        self.abort_task();
    }
}

/// Everything a fetch task needs, detached from the pager that spawned it.
struct FetchContext {
    executor: Arc<dyn PipelineExecutor>,
    augmenter: RunAugmenter,
    shared: Arc<Mutex<PagerShared>>,
    tx: mpsc::UnboundedSender<AppEvent>,
    generation: u64,
    follow_interval: Duration,
}

impl FetchContext {
    /// Applies `update` unless this fetch has been superseded. Returns whether it was applied.
    fn publish(&self, update: impl FnOnce(&mut PagerShared)) -> bool {
        {
            let mut shared = lock(&self.shared);
            if shared.generation != self.generation {
                return false;
            }
            update(&mut shared);
        }
        let _ = self.tx.send(AppEvent::PagerUpdated);
        true
    }

    fn fail(&self, what: &str, err: &Report) {
        let msg = format!("Failed to fetch {what}: {err}");
        tracing::warn!("{msg}");
        let applied = self.publish(|s| {
            s.loading_topology = false;
            s.snapshot.pending = false;
            s.snapshot.error = Some(msg.clone());
        });
        if applied {
            let _ = self.tx.send(AppEvent::Error(msg));
        }
    }

    async fn load_topology(&self, requested: Option<&str>) -> Result<Option<(Topology, PipelineNode)>> {
        let body = self.executor.fetch_nodes(&self.augmenter.nodes_url()).await?;
        let topology = Topology {
            nodes: parser::parse_nodes(&body)?,
        };
        let Some(focus) = resolve_focus(&topology, requested).cloned() else {
            return Ok(None);
        };
        Ok(Some((topology, focus)))
    }

    async fn load_steps(&self, focus: Option<&PipelineNode>) -> Result<(String, StepData)> {
        let url = focus.map_or_else(
            || self.augmenter.run_steps_url(),
            |n| self.augmenter.node_steps_url(&n.id),
        );
        let body = self.executor.fetch_steps(&url).await?;
        let mut steps = parser::parse_steps(&body)?;
        if let Some(last) = steps.last_mut() {
            match self
                .executor
                .fetch_log(&self.augmenter.step_log_url(&last.id))
                .await
            {
                Ok(raw) => last.log = Some(parser::process_log_output(&raw, LOG_MAX_LINES).0),
                Err(e) => tracing::warn!("log of step {} unavailable: {e}", last.id),
            }
        }
        Ok((url, StepData { steps }))
    }

    /// Fetches topology and steps. Returns the followed node (`Some(None)` when the run has
    /// no stage graph), or `None` when the fetch failed or was superseded.
    async fn refresh_all(&self, requested: Option<&str>) -> Option<Option<PipelineNode>> {
        let topology = match self.load_topology(requested).await {
            Ok(t) => t,
            Err(e) => {
                self.fail("pipeline nodes", &e);
                return None;
            }
        };
        let (nodes, focus) = match topology {
            Some((t, f)) => (Some(t), Some(f)),
            None => (None, None),
        };
        match self.load_steps(focus.as_ref()).await {
            Ok((url, steps)) => {
                let current = focus.clone();
                let applied = self.publish(|s| {
                    s.loading_topology = false;
                    s.snapshot.pending = false;
                    s.snapshot.error = None;
                    s.snapshot.nodes = nodes;
                    s.snapshot.current_node = current;
                    s.snapshot.steps = Some(steps);
                    s.snapshot.current_steps_url = Some(url);
                });
                applied.then_some(focus)
            }
            Err(e) => {
                let current = focus.clone();
                self.publish(|s| {
                    s.snapshot.nodes = nodes;
                    s.snapshot.current_node = current;
                });
                self.fail("steps", &e);
                None
            }
        }
    }

    /// Read on every round, so `set_follow` and `set_run` reach a loop already running.
    fn should_follow(&self, focus: Option<&PipelineNode>) -> bool {
        let shared = lock(&self.shared);
        shared.follow && focus.map_or(!shared.run_completed, |n| !n.is_finished())
    }

    async fn follow(&self, mut focus: Option<PipelineNode>, requested: Option<String>) {
        while self.should_follow(focus.as_ref()) {
            tokio::time::sleep(self.follow_interval).await;
            if !self.should_follow(focus.as_ref()) {
                break;
            }
            match self.refresh_all(requested.as_deref()).await {
                Some(next) => focus = next,
                None => return,
            }
        }
        tracing::debug!("follow stopped");
    }

    async fn run_topology_fetch(self, requested: Option<String>) {
        if let Some(focus) = self.refresh_all(requested.as_deref()).await {
            self.follow(focus, requested).await;
        }
    }

    async fn run_steps_refresh(self, focus: Option<PipelineNode>, requested: Option<String>) {
        match self.load_steps(focus.as_ref()).await {
            Ok((url, steps)) => {
                let applied = self.publish(|s| {
                    s.snapshot.error = None;
                    s.snapshot.steps = Some(steps);
                    s.snapshot.current_steps_url = Some(url);
                });
                if !applied {
                    return;
                }
            }
            Err(e) => {
                self.fail("steps", &e);
                return;
            }
        }
        self.follow(focus, requested).await;
    }
}


#[cfg(test)]
mod tests {
    use super::fake::node;
    use super::*;
    use crate::app::{RunState, RunStatus};
    use crate::bus::PushBus;
    use crate::prefs::{PreferenceKey, PreferenceValue, StaticPreferences};
    use crate::view::navigation::{node_from_path, HistoryRouter};
    use crate::view::tests_support::props_for;
    use crate::view::{PagerFactory, RunLogView};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::sync::mpsc::UnboundedReceiver;

    const NODES_JSON: &str = r#"[
        {"id": "6", "displayName": "Build", "state": "FINISHED", "result": "SUCCESS", "edges": [{"id": "14"}]},
        {"id": "14", "displayName": "Test", "state": "RUNNING", "result": "UNKNOWN", "edges": []}
    ]"#;

    const FINISHED_NODES_JSON: &str = r#"[
        {"id": "6", "displayName": "Build", "state": "FINISHED", "result": "SUCCESS"}
    ]"#;

    const STEPS_JSON: &str = r#"[
        {"id": "20", "displayName": "Checkout", "state": "FINISHED", "result": "SUCCESS"},
        {"id": "21", "displayName": "Shell Script", "state": "RUNNING", "result": "UNKNOWN"}
    ]"#;

    #[derive(Default)]
    struct FakeExecutor {
        routes: Vec<(&'static str, Result<&'static str, &'static str>)>,
        node_fetches: AtomicUsize,
        step_fetches: AtomicUsize,
    }

    impl FakeExecutor {
        fn route(mut self, suffix: &'static str, body: &'static str) -> Self {
            self.routes.push((suffix, Ok(body)));
            self
        }

        fn failing(mut self, suffix: &'static str, error: &'static str) -> Self {
            self.routes.push((suffix, Err(error)));
            self
        }

        fn respond(&self, url: &str) -> Result<String> {
            self.routes
                .iter()
                .find(|(suffix, _)| url.ends_with(suffix))
                .map_or_else(
                    || Err(eyre!("no route for {url}")),
                    |(_, r)| r.map(str::to_string).map_err(|e| eyre!(e)),
                )
        }
    }

    #[async_trait]
    impl PipelineExecutor for FakeExecutor {
        async fn check_available(&self) -> Result<()> {
            Ok(())
        }
        async fn fetch_run(&self, url: &str) -> Result<String> {
            self.respond(url)
        }
        async fn fetch_nodes(&self, url: &str) -> Result<String> {
            self.node_fetches.fetch_add(1, Ordering::SeqCst);
            self.respond(url)
        }
        async fn fetch_steps(&self, url: &str) -> Result<String> {
            self.step_fetches.fetch_add(1, Ordering::SeqCst);
            self.respond(url)
        }
        async fn fetch_log(&self, url: &str) -> Result<String> {
            self.respond(url)
        }
    }

    fn augmenter() -> RunAugmenter {
        RunAugmenter::new(
            "https://ci.example.com",
            "jenkins",
            "app",
            None,
            RunState::new("12", "app", RunStatus::Running),
        )
    }

    fn pager(
        executor: Arc<FakeExecutor>,
        node: Option<&str>,
    ) -> (PipelinePager, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pager = PipelinePager::new(executor, augmenter(), node, tx)
            .with_follow_interval(Duration::from_secs(3600));
        (pager, rx)
    }

    async fn settle(rx: &mut UnboundedReceiver<AppEvent>, pager: &PipelinePager) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while pager.snapshot().pending {
                rx.recv().await;
            }
        })
        .await
        .expect("pager should settle");
    }

    #[tokio::test]
    async fn fetch_nodes_focuses_running_node() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", NODES_JSON)
                .route("/nodes/14/steps/", STEPS_JSON)
                .route("/steps/21/log/", "compiling\ntesting"),
        );
        let (mut pager, mut rx) = pager(executor, None);

        pager.fetch_nodes(None).unwrap();
        assert!(pager.snapshot().pending);
        settle(&mut rx, &pager).await;

        let snap = pager.snapshot();
        assert_eq!(snap.nodes.as_ref().map(Topology::len), Some(2));
        assert_eq!(snap.current_node.as_ref().map(|n| n.id.as_str()), Some("14"));
        let steps = snap.steps.unwrap();
        assert_eq!(steps.steps.len(), 2);
        assert_eq!(steps.last_step().unwrap().log.as_deref(), Some("compiling\ntesting"));
        assert!(snap.current_steps_url.unwrap().ends_with("/nodes/14/steps/"));
        assert_eq!(snap.error, None);
    }

    #[tokio::test]
    async fn requested_node_wins_over_running_one() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", NODES_JSON)
                .route("/nodes/6/steps/", "[]"),
        );
        let (mut pager, mut rx) = pager(executor, None);

        pager.fetch_nodes(Some("6")).unwrap();
        settle(&mut rx, &pager).await;

        let snap = pager.snapshot();
        assert_eq!(snap.current_node.map(|n| n.id), Some("6".to_string()));
        assert_eq!(snap.steps.map(|s| s.has_results_for_steps()), Some(false));
    }

    #[tokio::test]
    async fn empty_graph_falls_back_to_run_steps() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", "[]")
                .route("/runs/12/steps/", "[]"),
        );
        let (mut pager, mut rx) = pager(executor, None);

        pager.fetch_nodes(None).unwrap();
        settle(&mut rx, &pager).await;

        let snap = pager.snapshot();
        assert_eq!(snap.nodes, None);
        assert!(snap.current_steps_url.unwrap().ends_with("/runs/12/steps/"));
    }

    #[tokio::test]
    async fn failure_surfaces_in_snapshot_and_channel() {
        let executor = Arc::new(FakeExecutor::default().failing("/runs/12/nodes/", "HTTP 500"));
        let (mut pager, mut rx) = pager(executor, None);

        pager.fetch_nodes(None).unwrap();
        settle(&mut rx, &pager).await;

        let snap = pager.snapshot();
        assert!(snap.error.unwrap().contains("HTTP 500"));
        assert_eq!(snap.nodes, None);

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, AppEvent::Error(_)) {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn clear_discards_in_flight_fetch() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", NODES_JSON)
                .route("/nodes/14/steps/", STEPS_JSON),
        );
        let (mut pager, _rx) = pager(executor, None);

        pager.fetch_nodes(None).unwrap();
        pager.clear();
        assert!(!pager.snapshot().pending);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pager.snapshot().nodes, None);
    }

    #[tokio::test]
    async fn step_refresh_is_coalesced_into_topology_fetch() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", NODES_JSON)
                .route("/nodes/14/steps/", STEPS_JSON)
                .route("/steps/21/log/", ""),
        );
        let (mut pager, mut rx) = pager(Arc::clone(&executor), None);

        pager.fetch_nodes(None).unwrap();
        pager.fetch_current_step_url().unwrap();
        settle(&mut rx, &pager).await;

        assert_eq!(executor.step_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn follow_refreshes_until_focus_finishes() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", NODES_JSON)
                .route("/nodes/14/steps/", STEPS_JSON)
                .route("/steps/21/log/", ""),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut pager = PipelinePager::new(Arc::clone(&executor) as Arc<dyn PipelineExecutor>, augmenter(), None, tx)
            .with_follow_interval(Duration::from_millis(10));

        pager.fetch_nodes(None).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while executor.node_fetches.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("follow should keep refreshing a running node");
        pager.clear();
    }

    #[tokio::test]
    async fn no_follow_for_finished_focus() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", FINISHED_NODES_JSON)
                .route("/nodes/6/steps/", "[]"),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pager = PipelinePager::new(Arc::clone(&executor) as Arc<dyn PipelineExecutor>, augmenter(), None, tx)
            .with_follow_interval(Duration::from_millis(5));

        pager.fetch_nodes(None).unwrap();
        settle(&mut rx, &pager).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(executor.node_fetches.load(Ordering::SeqCst), 1);
    }

    async fn node_fetches_settle(executor: &FakeExecutor) -> usize {
        tokio::time::sleep(Duration::from_millis(60)).await;
        executor.node_fetches.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn follow_off_stops_a_running_loop() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", NODES_JSON)
                .route("/nodes/14/steps/", STEPS_JSON)
                .route("/steps/21/log/", ""),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut pager = PipelinePager::new(Arc::clone(&executor) as Arc<dyn PipelineExecutor>, augmenter(), None, tx)
            .with_follow_interval(Duration::from_millis(10));

        pager.fetch_nodes(None).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        pager.set_follow(false);
        let stopped = node_fetches_settle(&executor).await;
        assert_eq!(node_fetches_settle(&executor).await, stopped);
    }

    #[tokio::test]
    async fn completed_run_without_graph_stops_following() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", "[]")
                .route("/runs/12/steps/", "[]"),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut pager = PipelinePager::new(Arc::clone(&executor) as Arc<dyn PipelineExecutor>, augmenter(), None, tx)
            .with_follow_interval(Duration::from_millis(10));

        pager.fetch_nodes(None).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(executor.node_fetches.load(Ordering::SeqCst) > 1);

        let mut done = augmenter();
        done.set_run(RunState::new("12", "app", RunStatus::Finished));
        pager.set_run(&done);
        let stopped = node_fetches_settle(&executor).await;
        assert_eq!(node_fetches_settle(&executor).await, stopped);
    }

    #[tokio::test]
    async fn view_with_karaoke_off_leaves_pager_idle() {
        let executor = Arc::new(
            FakeExecutor::default()
                .route("/runs/12/nodes/", NODES_JSON)
                .route("/nodes/6/steps/", "[]")
                .route("/nodes/14/steps/", STEPS_JSON)
                .route("/steps/21/log/", ""),
        );
        let shared = Arc::clone(&executor);
        let (tx, _rx) = mpsc::unbounded_channel();
        let factory: PagerFactory = Box::new(move |augmenter: &RunAugmenter, node: Option<&str>| {
            Box::new(
                PipelinePager::new(Arc::clone(&shared) as Arc<dyn PipelineExecutor>, augmenter.clone(), node, tx.clone())
                    .with_follow_interval(Duration::from_millis(10)),
            ) as Box<dyn NodePager>
        });
        let prefs = StaticPreferences::new()
            .with(PreferenceKey::StopKaraokeOnAnyNodeClick, PreferenceValue::Always);
        let bus = PushBus::new();
        let mut view = RunLogView::new(props_for(RunState::new("12", "app", RunStatus::Running)), &prefs, factory);
        view.mount(&bus, |_| {});
        tokio::time::timeout(Duration::from_secs(5), async {
            while view.pager_snapshot().nodes.is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("topology should load");

        let mut router = HistoryRouter::default();
        for id in ["6", "14"] {
            view.on_node_click(id, &mut router).unwrap();
            let location = router.take_pending().unwrap();
            let mut next = view.props().clone();
            next.node = node_from_path(&location.pathname);
            next.location = location;
            view.receive_props(next, Instant::now());
        }
        assert!(!view.karaoke_enabled());

        let settled = node_fetches_settle(&executor).await;
        assert_eq!(node_fetches_settle(&executor).await, settled);
        assert_eq!(
            view.pager_snapshot().current_node.map(|n| n.id),
            Some("14".to_string())
        );
        view.unmount(&bus);
    }

    #[test]
    fn fetch_without_runtime_is_an_error() {
        let (mut pager, _rx) = pager(Arc::new(FakeExecutor::default()), None);
        assert!(pager.fetch_nodes(None).is_err());
        assert!(!pager.snapshot().pending);
        assert!(pager.fetch_current_step_url().is_err());
    }

    #[test]
    fn resolve_focus_prefers_request_then_running_then_last() {
        let topology = Topology {
            nodes: vec![
                node("1", "A", Some(RunStatus::Finished)),
                node("2", "B", Some(RunStatus::Running)),
                node("3", "C", None),
            ],
        };
        assert_eq!(resolve_focus(&topology, Some("1")).unwrap().id, "1");
        assert_eq!(resolve_focus(&topology, Some("99")).unwrap().id, "2");
        assert_eq!(resolve_focus(&topology, None).unwrap().id, "2");

        let idle = Topology {
            nodes: vec![node("1", "A", Some(RunStatus::Finished)), node("3", "C", None)],
        };
        assert_eq!(resolve_focus(&idle, None).unwrap().id, "3");
        assert!(resolve_focus(&Topology::default(), None).is_none());
    }
}
