use plw::app;
use plw::augmenter::RunAugmenter;
use plw::bus::{PushBus, PushEvent};
use plw::cli;
use plw::events;
use plw::i18n::Translator;
use plw::input;
use plw::jenkins::executor::CurlExecutor;
use plw::jenkins::parser;
use plw::jenkins::poller::RunPoller;
use plw::jenkins::sse::SseFeed;
use plw::pager::{NodePager, PipelinePager};
use plw::traits::PipelineExecutor;
use plw::tui;
use plw::view::mode::Composition;
use plw::view::navigation::{node_from_path, Location};
use plw::view::{RunLogView, ViewProps};

use app::{AppConfig, AppState, RunState};
use clap::Parser;
use cli::Cli;
use color_eyre::eyre::{eyre, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use events::{AppEvent, EventHandler};
use input::{Action, InputContext};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

fn setup_verbose_logging() -> Result<()> {
    let state_dir = dirs_next_or_fallback();
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| eyre!("Failed to create log directory {state_dir:?}: {e}"))?;
    let log_path = state_dir.join("debug.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eyre!("Failed to open log file {log_path:?}: {e}"))?;
    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .init();
    tracing::info!(
        "plw v{} starting with verbose logging",
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

fn dirs_next_or_fallback() -> std::path::PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME") {
        std::path::PathBuf::from(state).join("plw")
    } else if let Some(home) = std::env::var_os("HOME") {
        std::path::PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("plw")
    } else {
        std::env::temp_dir().join("plw")
    }
}

fn spawn_monitored(
    tx: mpsc::UnboundedSender<AppEvent>,
    label: &'static str,
    fut: impl Future<Output = ()> + Send + 'static,
) {
    tokio::spawn(async move {
        let handle = tokio::spawn(fut);
        if let Err(join_err) = handle.await {
            let msg = if join_err.is_panic() {
                match join_err.into_panic().downcast::<String>() {
                    Ok(s) => *s,
                    Err(payload) => match payload.downcast::<&str>() {
                        Ok(s) => s.to_string(),
                        Err(_) => "unknown panic".to_string(),
                    },
                }
            } else {
                "task cancelled".to_string()
            };
            tracing::error!("{label} panicked: {msg}");
            if tx
                .send(AppEvent::Error(format!("{label} crashed: {msg}")))
                .is_err()
            {
                tracing::warn!("{label}: channel closed while reporting panic");
            }
        }
    });
}

/// Everything the event loop needs besides the state itself.
struct Runtime {
    executor: Arc<dyn PipelineExecutor>,
    bus: Arc<PushBus>,
    tx: mpsc::UnboundedSender<AppEvent>,
    interval_tx: watch::Sender<u64>,
    active_interval: u64,
}

/// Fails before the terminal is touched, so errors print normally.
async fn fetch_initial_run(executor: &dyn PipelineExecutor, augmenter: &RunAugmenter) -> Result<RunState> {
    executor.check_available().await?;
    let json = executor.fetch_run(&augmenter.run_url()).await?;
    parser::parse_run(&json)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    if args.verbose {
        setup_verbose_logging()?;
    }

    let translator = match &args.messages {
        Some(path) => Translator::load(path)?,
        None => Translator::new(),
    };

    let executor: Arc<dyn PipelineExecutor> = Arc::new(CurlExecutor::new(args.user.clone()));
    let placeholder_run = RunState::new(&args.run, &args.pipeline, app::RunStatus::Unknown);
    let mut augmenter = RunAugmenter::new(
        &args.url,
        &args.organization,
        &args.pipeline,
        args.branch.as_deref(),
        placeholder_run,
    );

    let run = match fetch_initial_run(executor.as_ref(), &augmenter).await {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    augmenter.set_run(run.clone());

    // Setup terminal with panic hook
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to disable raw mode during panic: {e}");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, SetTitle("")) {
            eprintln!("Failed to leave alternate screen during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        SetTitle(format!("watching {} #{}", args.pipeline, run.id))
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let events = EventHandler::new(Duration::from_millis(app::TICK_MS));
    let tx = events.sender();
    let bus = Arc::new(PushBus::new());

    // Pager factory shares the executor and reports back over the event channel
    let factory_executor = Arc::clone(&executor);
    let factory_tx = tx.clone();
    let pager_factory = Box::new(
        move |augmenter: &RunAugmenter, node: Option<&str>| -> Box<dyn NodePager> {
            Box::new(PipelinePager::new(
                Arc::clone(&factory_executor),
                augmenter.clone(),
                node,
                factory_tx.clone(),
            ))
        },
    );

    let props = ViewProps {
        location: Location::new(match &args.node {
            Some(node) => format!("{}/{node}", augmenter.pipeline_view_path()),
            None => augmenter.pipeline_view_path(),
        }),
        run: run.clone(),
        pipeline_name: args.pipeline.clone(),
        branch: args.branch.clone(),
        node: args.node.clone(),
        scroll_to_bottom: true,
        t: Arc::new(translator),
        augmenter: Some(augmenter.clone()),
    };
    let mut view = RunLogView::new(props, &args.preferences(), pager_factory);
    let forward_tx = tx.clone();
    view.mount(&bus, move |event: &PushEvent| {
        if forward_tx.send(AppEvent::Push(event.clone())).is_err() {
            tracing::debug!("event loop gone; dropping {}", event.jenkins_event);
        }
    });

    let mut state = AppState::new(
        AppConfig {
            base_url: args.url.clone(),
            pipeline: args.pipeline.clone(),
            branch: args.branch.clone(),
            version_string: format!(
                "plw v{}+{}",
                env!("CARGO_PKG_VERSION"),
                env!("BUILD_NUMBER")
            ),
        },
        view,
    );
    state.desktop_notify = !args.no_notify;
    state.poll_interval = interval_for(&run, args.interval);

    let (interval_tx, interval_rx) = watch::channel(state.poll_interval);

    let poller = RunPoller::new(
        Arc::clone(&executor),
        augmenter.run_url(),
        tx.clone(),
        interval_rx,
    );
    spawn_monitored(tx.clone(), "Run poller", poller.run());

    let feed = SseFeed::new(&args.url, args.user.clone(), Arc::clone(&bus), tx.clone());
    spawn_monitored(tx.clone(), "Event stream", feed.run());

    let rt = Runtime {
        executor,
        bus,
        tx,
        interval_tx,
        active_interval: args.interval,
    };
    let result = run_app(&mut terminal, &mut state, events, &rt).await;

    state.view.unmount(&rt.bus);

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, SetTitle(""))?;
    terminal.show_cursor()?;

    result
}

fn interval_for(run: &RunState, active: u64) -> u64 {
    if run.is_completed() {
        app::POLL_INTERVAL_IDLE
    } else {
        active
    }
}

/// Rough height of the log pane for page scrolling.
fn log_view_height(terminal: &Terminal<CrosstermBackend<io::Stdout>>) -> usize {
    terminal
        .size()
        .map(|s| (s.height as usize * 2 / 3).saturating_sub(6))
        .unwrap_or(20)
        .max(1)
}

/// Starts a fetch of the free-form run log when that is what the body shows.
fn request_legacy_log(state: &mut AppState, rt: &Runtime, force: bool) {
    if state.legacy_log_loading || (state.legacy_log.is_some() && !force) {
        return;
    }
    let Composition::LegacyLog {
        location: Some(location),
    } = state.view.compose()
    else {
        return;
    };
    state.legacy_log_loading = true;
    let run_id = state.view.props().run.id.clone();
    let executor = Arc::clone(&rt.executor);
    let tx = rt.tx.clone();
    tokio::spawn(async move {
        let event = match executor.fetch_log(&location.url).await {
            Ok(raw) => {
                let (content, _truncated) = parser::process_log_output(&raw, app::LOG_MAX_LINES);
                AppEvent::LegacyLog { run_id, content }
            }
            Err(e) => AppEvent::Error(format!("Failed to fetch {}: {e}", location.file_name)),
        };
        if tx.send(event).is_err() {
            tracing::debug!("event loop gone; dropping log");
        }
    });
}

fn follow_props(state: &AppState, follow: bool) -> Option<ViewProps> {
    let mut next = state.view.props().clone();
    next.augmenter.as_mut()?.karaoke = follow;
    Some(next)
}

fn toggle_follow(state: &mut AppState) {
    let now = Instant::now();
    let follow = !state.view.karaoke_enabled();
    let flagged = state
        .view
        .props()
        .augmenter
        .as_ref()
        .is_some_and(|a| a.karaoke);
    // The view can stop following on its own; clear the flag so turning it on is seen.
    if follow && flagged {
        if let Some(next) = follow_props(state, false) {
            state.view.receive_props(next, now);
        }
    }
    if let Some(next) = follow_props(state, follow) {
        state.view.receive_props(next, now);
    }
    let message = if state.view.karaoke_enabled() {
        "Following the running step"
    } else {
        "Not following"
    };
    state.push_notification(message.to_string());
}

fn open_selected_node(state: &mut AppState) {
    let Some(id) = state.selected_node_id() else {
        return;
    };
    if let Err(e) = state.view.on_node_click(&id, &mut state.router) {
        state.set_error(format!("{e}"));
        return;
    }
    if let Some(location) = state.router.take_pending() {
        let mut next = state.view.props().clone();
        next.node = node_from_path(&location.pathname);
        next.location = location;
        state.view.receive_props(next, Instant::now());
        state.log_scroll = None;
    }
}

fn apply_run_update(state: &mut AppState, run: RunState, rt: &Runtime) {
    state.clear_poll_error();
    let previous = state.view.props().run.clone();
    if run == previous {
        return;
    }

    let mut next = state.view.props().clone();
    if let Some(augmenter) = next.augmenter.as_mut() {
        augmenter.set_run(run.clone());
    }
    next.run = run.clone();
    state.view.receive_props(next, Instant::now());

    if run.is_completed() && !previous.is_completed() {
        state.push_notification(format!("Run #{} finished", run.id));
        #[cfg(feature = "desktop-notify")]
        if state.desktop_notify {
            plw::notify::send_desktop(&run);
        }
    }

    let interval = interval_for(&run, rt.active_interval);
    if interval != state.poll_interval {
        state.poll_interval = interval;
        if rt.interval_tx.send(interval).is_err() {
            tracing::debug!("run poller stopped; interval change dropped");
        }
    }

    if state.legacy_log.is_some() && !previous.is_completed() {
        request_legacy_log(state, rt, true);
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    mut events: EventHandler,
    rt: &Runtime,
) -> Result<()> {
    let mut last_tick = Instant::now();
    let mut step_list_key = state.step_list_key();

    loop {
        terminal.draw(|f| tui::render::render(f, state))?;

        state.prune_notifications();
        state.prune_error();

        let Some(event) = events.next().await else {
            return Ok(());
        };
        match event {
            AppEvent::Key(key) => {
                let ctx = InputContext {
                    has_error: state.error.is_some(),
                    pending: state.view.pager_snapshot().pending,
                };
                let total = state.log_line_count();
                let height = log_view_height(terminal);
                match input::map_key(key, &ctx) {
                    Action::Quit => state.should_quit = true,
                    Action::DismissError => state.clear_error(),
                    Action::SelectPrev => state.select_prev_node(),
                    Action::SelectNext => state.select_next_node(),
                    Action::OpenNode => open_selected_node(state),
                    Action::ToggleFollow => toggle_follow(state),
                    Action::Refresh => {
                        state.view.refresh();
                        request_legacy_log(state, rt, true);
                    }
                    Action::ScrollUp => state.scroll_log_up(1, total, height),
                    Action::ScrollDown => state.scroll_log_down(1, total, height),
                    Action::PageUp => state.scroll_log_up(height, total, height),
                    Action::PageDown => state.scroll_log_down(height, total, height),
                    Action::ScrollToTop => state.scroll_log_to_top(),
                    Action::ScrollToBottom => state.scroll_log_to_bottom(),
                    Action::None => {}
                }
            }
            AppEvent::Tick => {
                let now = Instant::now();
                state.view.tick(now);
                if now.duration_since(last_tick) >= Duration::from_millis(app::TICK_MS) {
                    state.advance_spinner();
                    last_tick = now;
                }
            }
            AppEvent::Push(event) => state.view.handle_push_event(&event, Instant::now()),
            AppEvent::PagerUpdated => state.sync_selection(),
            AppEvent::RunUpdate(run) => apply_run_update(state, run, rt),
            AppEvent::LegacyLog { run_id, content } => {
                if run_id == state.view.props().run.id {
                    state.open_legacy_log(&content);
                } else {
                    tracing::debug!("dropping log of run {run_id}");
                    state.legacy_log_loading = false;
                }
            }
            AppEvent::Error(e) => {
                if state.legacy_log_loading {
                    // No automatic retry; `r` fetches again.
                    state.legacy_log_loading = false;
                    state.legacy_log.get_or_insert_with(Vec::new);
                }
                state.set_error(e);
            }
            AppEvent::PollFailed(e) => state.set_poll_error(e),
        }

        request_legacy_log(state, rt, false);

        let key = state.step_list_key();
        if key != step_list_key {
            state.log_scroll = None;
            step_list_key = key;
        }

        if state.should_quit {
            return Ok(());
        }
    }
}
