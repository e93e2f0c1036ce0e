mod config;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

use tailview_client::{Backoff, ClientError, HttpLogClient, PushStreamManager};
use tailview_logs::{
    Effect, FetchError, FetchTicket, LogRecord, PushEvent, StreamController, SystemClock,
    sanitize_message,
};
use tailview_tui::{
    Action, AppState, Event, EventHandler, HelpOverlay, KeyBindings, KeyContext, LogViewerScreen,
    Tui,
};

use crate::config::Config;

/// Tailview - A terminal client for tailing and browsing server logs
#[derive(Parser, Debug)]
#[command(name = "tailview")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: <config dir>/tailview/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://127.0.0.1:8080
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Day to open (YYYY-MM-DD); today streams live
    #[arg(long, value_name = "DATE")]
    date: Option<NaiveDate>,

    /// Maximum number of entries kept in memory
    #[arg(long)]
    max_stored: Option<usize>,

    /// Maximum number of entries rendered
    #[arg(long)]
    display_cap: Option<usize>,

    /// Entries requested per historical page
    #[arg(long)]
    page_size: Option<usize>,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Command-line flags win over the config file
    fn apply_to(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.server.base_url = server.clone();
        }
        if let Some(max_stored) = self.max_stored {
            config.buffer.max_stored = max_stored;
        }
        if let Some(display_cap) = self.display_cap {
            config.buffer.display_cap = display_cap;
        }
        if let Some(page_size) = self.page_size {
            config.buffer.page_size = page_size;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.log_file.as_deref())?;

    let mut config = Config::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;

    // Run the application
    let result = run_app(config, args.date).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Completions of background work, fed back into the controller
enum InternalAction {
    FetchCompleted(FetchTicket, Result<Vec<LogRecord>, FetchError>),
    LogsDeleted(NaiveDate, Result<(), FetchError>),
}

/// Carries out the controller's effects
struct EffectRunner {
    client: HttpLogClient,
    push: PushStreamManager,
    push_url: Url,
    backoff: Backoff,
    internal_tx: mpsc::UnboundedSender<InternalAction>,
    push_tx: mpsc::UnboundedSender<(u64, PushEvent)>,
}

impl EffectRunner {
    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            debug!(?effect, "executing effect");
            match effect {
                Effect::Fetch(ticket) => {
                    let client = self.client.clone();
                    let tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        let result = client
                            .fetch_page(ticket.date, ticket.limit, ticket.offset)
                            .await
                            .map_err(fetch_error);
                        let _ = tx.send(InternalAction::FetchCompleted(ticket, result));
                    });
                }
                Effect::ConnectPush { subscription } => {
                    self.push.start(
                        subscription,
                        self.push_url.clone(),
                        self.backoff,
                        self.push_tx.clone(),
                    );
                }
                Effect::DisconnectPush => self.push.stop(),
                Effect::DeleteLogs { date } => {
                    let client = self.client.clone();
                    let tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        let result = client.delete_logs(date).await.map_err(fetch_error);
                        let _ = tx.send(InternalAction::LogsDeleted(date, result));
                    });
                }
            }
        }
    }

    fn shutdown(&mut self) {
        self.push.stop();
    }
}

fn fetch_error(error: ClientError) -> FetchError {
    if error.is_backend() {
        FetchError::Application(error.to_string())
    } else {
        FetchError::Transport(error.to_string())
    }
}

async fn run_app(config: Config, date: Option<NaiveDate>) -> Result<()> {
    // Create channels
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<InternalAction>();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<(u64, PushEvent)>();

    let endpoints = config.endpoints().context("invalid server settings")?;
    let push_url = endpoints.push_url().context("invalid server settings")?;
    info!(server = %endpoints.base(), "starting tailview");

    let mut runner = EffectRunner {
        client: HttpLogClient::new(endpoints)?,
        push: PushStreamManager::new(),
        push_url,
        backoff: config.backoff(),
        internal_tx,
        push_tx,
    };

    let mut controller = StreamController::with_system_clock(config.controller_config());
    let mut state = AppState::new();

    // Initialize TUI
    let mut tui = Tui::new()?;

    // Initialize event handler
    let mut events = EventHandler::new(Duration::from_millis(100));

    // Initialize keybindings
    let keybindings = KeyBindings::new();

    let start_date = date.unwrap_or_else(|| controller.today());
    runner.execute(controller.start(start_date));

    // Initial render
    render(&mut tui, &mut state, &controller)?;

    // Main event loop
    loop {
        tokio::select! {
            // Handle terminal events
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let action = if state.ui_state.confirm_delete {
                            Some(keybindings.get_confirm_action(&key))
                        } else if state.ui_state.search_active {
                            keybindings.get_filter_input_action(&key)
                        } else {
                            keybindings.get_action(KeyContext::LogViewer, &key)
                        };
                        if let Some(action) = action {
                            let _ = action_tx.send(action);
                        }
                        continue;
                    }
                    Event::Tick => {}
                    Event::Resize(_, _) => state.render_dirty = true,
                    Event::Error(e) => {
                        state.show_error(e);
                        state.render_dirty = true;
                    }
                }
            }

            // Live entries are drawn on the next tick, not one frame each
            Some((subscription, event)) = push_rx.recv() => {
                controller.on_push_event(subscription, event);
                state.render_dirty = true;
                continue;
            }

            // Handle completed fetches and deletes
            Some(internal) = internal_rx.recv() => {
                match internal {
                    InternalAction::FetchCompleted(ticket, result) => {
                        controller.on_fetch_completed(&ticket, result);
                    }
                    InternalAction::LogsDeleted(date, result) => {
                        match &result {
                            Ok(()) => state.show_message(format!("Deleted server logs for {}", date)),
                            Err(e) => state.show_error(format!("Delete failed: {}", e)),
                        }
                        controller.on_logs_deleted(date, result);
                    }
                }
                state.render_dirty = true;
            }

            // Handle user actions
            Some(action) = action_rx.recv() => {
                let effects = handle_action(&mut state, &mut controller, action);
                runner.execute(effects);
            }
        }

        if state.should_quit {
            break;
        }

        if state.render_dirty {
            render(&mut tui, &mut state, &controller)?;
            state.render_dirty = false;
        }
    }

    runner.shutdown();
    events.shutdown();
    tui.restore()?;

    Ok(())
}

fn handle_action(
    state: &mut AppState,
    controller: &mut StreamController<SystemClock>,
    action: Action,
) -> Vec<Effect> {
    state.render_dirty = true;
    let shown = controller.visible().shown();

    match action {
        Action::Quit => state.should_quit = true,
        Action::ToggleHelp => state.ui_state.help_visible = !state.ui_state.help_visible,
        Action::ToggleStats => state.ui_state.stats_visible = !state.ui_state.stats_visible,
        Action::ToggleTimestamps => {
            state.ui_state.show_timestamps = !state.ui_state.show_timestamps;
        }
        Action::Cancel => {
            if state.ui_state.help_visible {
                state.ui_state.help_visible = false;
            } else {
                state.dismiss_error();
                state.ui_state.status_message = None;
            }
        }

        Action::ScrollUp(n) => state.scroll_up(n),
        Action::PageUp => state.page_up(),
        Action::ScrollToNewest => state.scroll_to_newest(),
        Action::ScrollDown(n) => {
            if state.scroll_down(n, shown) {
                return controller.on_scroll_boundary_reached();
            }
        }
        Action::PageDown => {
            if state.page_down(shown) {
                return controller.on_scroll_boundary_reached();
            }
        }
        Action::ScrollToOldest => {
            if state.scroll_to_oldest(shown) {
                return controller.on_scroll_boundary_reached();
            }
        }

        Action::TogglePause => controller.on_pause_toggle(),
        Action::ClearDisplay => controller.on_clear_requested(),
        Action::Resume => controller.on_resume_requested(),
        Action::Retry => {
            state.dismiss_error();
            return controller.on_retry_requested();
        }
        Action::Reload => {
            state.scroll_to_newest();
            return controller.reset();
        }

        Action::OpenSearch => state.start_search(controller.filter().pattern()),
        Action::CloseSearch => state.cancel_search(),
        Action::SearchInput(c) => state.search_input_char(c),
        Action::SearchBackspace => state.search_input_backspace(),
        Action::SearchClear => state.ui_state.search_input.clear(),
        Action::ApplyFilter => {
            let mut filter_state = controller.filter_state().clone();
            filter_state.search = state.take_search();
            state.scroll_to_newest();
            return controller.on_filter_changed(filter_state);
        }
        Action::ClearFilter => {
            let mut filter_state = controller.filter_state().clone();
            filter_state.search.clear();
            return controller.on_filter_changed(filter_state);
        }
        Action::CycleLevel => {
            let mut filter_state = controller.filter_state().clone();
            filter_state.level = filter_state.level.next();
            state.scroll_to_newest();
            return controller.on_filter_changed(filter_state);
        }

        Action::PreviousDay => {
            if let Some(date) = controller.filter_state().date.pred_opt() {
                return change_date(state, controller, date);
            }
        }
        Action::NextDay => {
            // Nothing is logged in the future
            if let Some(date) = controller.filter_state().date.succ_opt()
                && date <= controller.today()
            {
                return change_date(state, controller, date);
            }
        }
        Action::Today => {
            let today = controller.today();
            return change_date(state, controller, today);
        }

        Action::RequestDelete => state.ui_state.confirm_delete = true,
        Action::CancelDelete => state.ui_state.confirm_delete = false,
        Action::ConfirmDelete => {
            state.ui_state.confirm_delete = false;
            return controller.request_delete();
        }
        Action::ExportLogs => {
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            let filename = format!("{}_{}.log", controller.filter_state().date, timestamp);

            match export_logs_to_file(&filename, controller) {
                Ok(count) => state.show_message(format!("Exported {} logs to {}", count, filename)),
                Err(e) => state.show_error(format!("Export failed: {:#}", e)),
            }
        }
    }

    Vec::new()
}

fn change_date(
    state: &mut AppState,
    controller: &mut StreamController<SystemClock>,
    date: NaiveDate,
) -> Vec<Effect> {
    state.scroll_to_newest();
    state.dismiss_error();
    let mut filter_state = controller.filter_state().clone();
    filter_state.date = date;
    controller.on_filter_changed(filter_state)
}

fn render(tui: &mut Tui, state: &mut AppState, controller: &StreamController<SystemClock>) -> Result<()> {
    tui.terminal().draw(|frame| {
        LogViewerScreen::render(frame, state, controller);

        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    })?;

    Ok(())
}

/// Write every stored entry that passes the current filters, newest first
fn export_logs_to_file(filename: &str, controller: &StreamController<SystemClock>) -> Result<usize> {
    let mut file = File::create(filename).with_context(|| format!("cannot create {}", filename))?;

    let mut entries = controller.filter().apply(&controller.store().snapshot());
    entries.sort_by(|a, b| b.order_key.cmp(&a.order_key));

    for entry in &entries {
        writeln!(
            file,
            "{} [{}] {}",
            sanitize_message(&entry.display_timestamp),
            entry.level.name(),
            sanitize_message(&entry.message)
        )?;
    }

    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "tailview",
            "--server",
            "http://logs:9000",
            "--page-size",
            "25",
            "--date",
            "2024-02-29",
        ]);
        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config.server.base_url, "http://logs:9000");
        assert_eq!(config.buffer.page_size, 25);
        assert_eq!(config.buffer.max_stored, 2000);
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn test_backend_errors_map_to_application() {
        assert_eq!(
            fetch_error(ClientError::Backend("no table".into())),
            FetchError::Application("no table".into())
        );
        assert!(matches!(
            fetch_error(ClientError::UnsupportedScheme("ftp".into())),
            FetchError::Transport(_)
        ));
    }

    #[test]
    fn test_invalid_config_surfaces_as_config_error() {
        let mut config = Config::default();
        config.buffer.page_size = 0;
        let err: ConfigError = config.validate().unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }
}
