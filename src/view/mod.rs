//! Karaoke view model of a single pipeline run.
//!
//! [`RunLogView`] owns the follow session, the pager and the two push subscriptions, and
//! decides which leaf view to draw. It is driven entirely from the UI task: props updates,
//! forwarded push events, clicks and the periodic [`RunLogView::tick`] that fires
//! debounced refetches.

pub mod mode;
pub mod navigation;

use crate::app::{RunState, DEBOUNCE_MS};
use crate::augmenter::RunAugmenter;
use crate::bus::{PushBus, PushEvent, PushEventKind, SubscriptionHandle, Topic};
use crate::debounce::Debounced;
use crate::i18n::Translator;
use crate::pager::{NodePager, PagerSnapshot};
use crate::prefs::{DisplayPreferences, PreferenceStore};
use color_eyre::eyre::{eyre, Result};
use mode::{Composition, DisplayMode, KaraokeSession};
use navigation::{next_node_path, Location, Router};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Creates the pager for a run, focused on an optional node.
pub type PagerFactory = Box<dyn Fn(&RunAugmenter, Option<&str>) -> Box<dyn NodePager>>;

#[derive(Debug, Clone)]
pub struct ViewProps {
    pub run: RunState,
    pub augmenter: Option<RunAugmenter>,
    pub pipeline_name: String,
    pub branch: Option<String>,
    pub location: Location,
    /// Focus-node route parameter.
    pub node: Option<String>,
    pub scroll_to_bottom: bool,
    pub t: Arc<Translator>,
}

pub struct RunLogView {
    props: ViewProps,
    prefs: DisplayPreferences,
    session: KaraokeSession,
    pager_factory: PagerFactory,
    pager: Option<Box<dyn NodePager>>,
    pipeline_sub: Option<SubscriptionHandle>,
    job_sub: Option<SubscriptionHandle>,
    reload: Debounced<Option<String>>,
    step_refresh: Debounced<()>,
    topology_refresh: Debounced<()>,
}

impl RunLogView {
    /// Preferences are read here once and never again.
    pub fn new(props: ViewProps, store: &dyn PreferenceStore, pager_factory: PagerFactory) -> Self {
        let prefs = DisplayPreferences::load(store);
        let session = KaraokeSession {
            karaoke: prefs.karaoke_allowed && props.augmenter.as_ref().is_some_and(|a| a.karaoke),
            show_pending: prefs.show_pending,
        };
        let window = Duration::from_millis(DEBOUNCE_MS);
        Self {
            props,
            prefs,
            session,
            pager_factory,
            pager: None,
            pipeline_sub: None,
            job_sub: None,
            reload: Debounced::new("reload", window),
            step_refresh: Debounced::new("step-refresh", window),
            topology_refresh: Debounced::new("topology-refresh", window),
        }
    }

    /// Starts the pager (when there is an augmenter) and subscribes `forward` to both
    /// push topics. `forward` must hand events back to [`Self::handle_push_event`].
    pub fn mount<F>(&mut self, bus: &PushBus, forward: F)
    where
        F: Fn(&PushEvent) + Clone + Send + Sync + 'static,
    {
        if self.is_mounted() {
            tracing::warn!("view already mounted");
            return;
        }
        if let Some(augmenter) = &self.props.augmenter {
            let node = self.props.node.as_deref();
            let mut pager = (self.pager_factory)(augmenter, node);
            pager.set_follow(self.session.karaoke);
            if let Err(e) = pager.fetch_nodes(node) {
                tracing::error!("initial node fetch failed: {e}");
            }
            self.pager = Some(pager);
        }
        self.pipeline_sub = Some(bus.subscribe(Topic::Pipeline, forward.clone()));
        self.job_sub = Some(bus.subscribe(Topic::Job, forward));
        tracing::debug!(
            "mounted for run {} (karaoke {}, pending {})",
            self.props.run.id,
            self.session.karaoke,
            self.session.show_pending
        );
    }

    pub fn is_mounted(&self) -> bool {
        self.pipeline_sub.is_some() || self.job_sub.is_some()
    }

    pub fn receive_props(&mut self, mut next: ViewProps, now: Instant) {
        let follow = next.augmenter.as_ref().is_some_and(|a| a.karaoke);
        let followed = self.props.augmenter.as_ref().is_some_and(|a| a.karaoke);
        if !follow {
            tracing::debug!("stopping karaoke: caller turned follow off");
            self.stop_karaoke();
        } else if !followed && self.prefs.karaoke_allowed {
            tracing::debug!("resuming karaoke: caller turned follow on");
            self.start_karaoke();
            self.fetch_current_step();
        }

        let switched = next.run.id != self.props.run.id;
        let finished = self.prefs.update_on_finish
            && next.run.is_completed()
            && !self.props.run.is_completed();
        if switched || finished {
            tracing::debug!("run {} changed (switched: {switched}); reloading", next.run.id);
            self.stop_karaoke();
            self.reload.trigger(now, next.node.clone());
        }
        if next.run != self.props.run {
            if let Some(augmenter) = next.augmenter.as_mut() {
                augmenter.set_run(next.run.clone());
                if let Some(pager) = self.pager.as_mut() {
                    pager.set_run(augmenter);
                }
            }
        }

        if next.node != self.props.node {
            tracing::debug!("focus moved to {:?}", next.node);
            self.fetch_nodes(next.node.as_deref());
        }
        self.props = next;
    }

    /// Idempotent.
    pub fn unmount(&mut self, bus: &PushBus) {
        self.reload.cancel();
        self.stop_karaoke();
        for handle in [self.pipeline_sub.take(), self.job_sub.take()]
            .into_iter()
            .flatten()
        {
            bus.unsubscribe(handle);
        }
    }

    pub fn handle_push_event(&mut self, event: &PushEvent, now: Instant) {
        if !self.prefs.karaoke_allowed || !self.session.karaoke {
            tracing::trace!("ignoring {}: not following", event.jenkins_event);
            return;
        }
        if event.pipeline_run_id.as_deref() != Some(self.props.run.id.as_str()) {
            tracing::trace!("ignoring {}: other run", event.jenkins_event);
            return;
        }
        match event.kind() {
            PushEventKind::StepProgress => {
                self.step_refresh.trigger(now, ());
                self.session.show_pending = false;
            }
            kind if kind.affects_topology() => {
                tracing::debug!("{} refetches nodes", event.jenkins_event);
                self.topology_refresh.trigger(now, ());
                self.session.show_pending = false;
            }
            _ => tracing::trace!("ignoring {}", event.jenkins_event),
        }
    }

    /// Runs the debounced refetches that are due.
    pub fn tick(&mut self, now: Instant) {
        if let Some(node) = self.reload.fire(now) {
            if self.prefs.karaoke_allowed {
                self.start_karaoke();
            }
            self.fetch_nodes(node.as_deref());
        }
        if self.step_refresh.fire(now).is_some() {
            self.fetch_current_step();
        }
        if self.topology_refresh.fire(now).is_some() {
            self.fetch_nodes(None);
        }
    }

    /// Focuses the clicked node. Fails without side effects when `id` is not in the
    /// fetched topology.
    pub fn on_node_click(&mut self, id: &str, router: &mut dyn Router) -> Result<()> {
        let node = self
            .pager_snapshot()
            .nodes
            .and_then(|t| t.find(id).cloned())
            .ok_or_else(|| eyre!("Node {id} is not part of the current pipeline graph"))?;

        self.session.show_pending = false;
        let path = next_node_path(&self.props.location.pathname, id);
        self.props.location.pathname.clone_from(&path);

        if node.is_finished() && self.session.karaoke {
            tracing::debug!("stopping karaoke: focused a finished node");
            self.stop_karaoke();
        } else if !self.prefs.stop_on_click && !node.is_finished() && !self.session.karaoke {
            tracing::debug!("resuming karaoke: focused an unfinished node");
            self.start_karaoke();
        }
        router.push(Location { pathname: path });
        Ok(())
    }

    /// Manual topology refetch.
    pub fn refresh(&mut self) {
        self.session.show_pending = false;
        self.fetch_nodes(None);
    }

    pub fn display_mode(&self) -> DisplayMode {
        mode::select_mode(&self.props.run, &self.pager_snapshot(), &self.session)
    }

    pub fn compose(&self) -> Composition {
        let snapshot = self.pager_snapshot();
        let mode = mode::select_mode(&self.props.run, &snapshot, &self.session);
        tracing::trace!("display mode {mode:?}");
        mode::compose(mode, &self.props, &snapshot)
    }

    pub fn karaoke_enabled(&self) -> bool {
        self.session.karaoke
    }

    pub fn show_pending(&self) -> bool {
        self.session.show_pending
    }

    pub fn props(&self) -> &ViewProps {
        &self.props
    }

    pub fn pager_snapshot(&self) -> PagerSnapshot {
        self.pager
            .as_ref()
            .map(|p| p.snapshot())
            .unwrap_or_default()
    }

    fn start_karaoke(&mut self) {
        if let Some(pager) = self.pager.as_mut() {
            pager.set_follow(true);
        }
        self.session.karaoke = true;
    }

    fn stop_karaoke(&mut self) {
        if let Some(pager) = self.pager.as_mut() {
            pager.clear();
            pager.set_follow(false);
        }
        self.session.karaoke = false;
        self.step_refresh.cancel();
        self.topology_refresh.cancel();
    }

    fn fetch_nodes(&mut self, node: Option<&str>) {
        if let Some(pager) = self.pager.as_mut() {
            if let Err(e) = pager.fetch_nodes(node) {
                tracing::error!("node fetch failed: {e}");
            }
        }
    }

    fn fetch_current_step(&mut self) {
        if let Some(pager) = self.pager.as_mut() {
            if let Err(e) = pager.fetch_current_step_url() {
                tracing::error!("step fetch failed: {e}");
            }
        }
    }
}
