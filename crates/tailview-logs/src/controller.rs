use std::collections::VecDeque;

use chrono::{FixedOffset, Local, NaiveDate, TimeZone, Utc};
use tracing::{debug, info, warn};

use tailview_types::{
    BackfillState, ConnectionState, EntryOrigin, FilterState, LogEntry, LogRecord, OrderKey,
    PushEvent, StreamMode,
};

use crate::backfill::{BackfillPaginator, FetchKind, FetchTicket};
use crate::buffer::{ArcLogEntry, DedupPolicy, InsertOutcome, LogStore};
use crate::error::FetchError;
use crate::filter::LogFilter;
use crate::parser::{LogParser, ParseContext};
use crate::window::{RenderWindow, WindowView};

/// Source of "today" and of arrival times
pub trait Clock {
    /// The calendar date considered live
    fn today(&self) -> NaiveDate;

    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;

    /// Offset of the wall clock that produced `HH:MM:SS` labels on `date`
    fn utc_offset(&self, date: NaiveDate) -> FixedOffset;
}

/// Local system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn utc_offset(&self, date: NaiveDate) -> FixedOffset {
        // Noon stays clear of DST transitions placed at midnight
        date.and_hms_opt(12, 0, 0)
            .and_then(|noon| Local.from_local_datetime(&noon).earliest())
            .map(|local| *local.offset())
            .unwrap_or_else(|| *Local::now().offset())
    }
}

/// Size limits and policies for the controller
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Storage ceiling applied by live insertion
    pub max_stored: usize,
    /// Display ceiling applied by the render window
    pub display_cap: usize,
    /// Records requested per historical fetch
    pub page_size: usize,
    pub dedup: DedupPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_stored: 2000,
            display_cap: 1500,
            page_size: 200,
            dedup: DedupPolicy::Off,
        }
    }
}

/// Work the runtime must carry out on the controller's behalf
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Fetch a historical page and report back via `on_fetch_completed`
    Fetch(FetchTicket),
    /// Open the push channel; tag its events with `subscription`
    ConnectPush { subscription: u64 },
    /// Close the push channel
    DisconnectPush,
    /// Delete server-side logs for `date` and report via `on_logs_deleted`
    DeleteLogs { date: NaiveDate },
}

/// Everything the UI needs for its indicators
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamStatus {
    pub mode: StreamMode,
    pub primary_mode: StreamMode,
    pub date: NaiveDate,
    pub push: ConnectionState,
    pub backfill: BackfillState,
    pub stored: usize,
    pub over_capacity: bool,
    pub skipped_duplicates: usize,
    pub last_error: Option<String>,
}

/// Orchestrates the store, filter, window and paginator
///
/// All mutation happens through the `on_*` methods, one event at a time.
/// Methods that need I/O return [`Effect`]s instead of doing it.
pub struct StreamController<C = SystemClock> {
    clock: C,

    store: LogStore,
    filter_state: FilterState,
    filter: LogFilter,
    window: RenderWindow,
    paginator: BackfillPaginator,

    /// Primary classification (never `Cleared`)
    mode: StreamMode,

    /// Whether the selected date was today when it was selected
    live_date: bool,

    /// Display blanked until resumed
    cleared: bool,

    /// Store content captured when pausing
    frozen: Option<Vec<ArcLogEntry>>,

    /// Live entries that arrived before the first page
    pending_live: VecDeque<LogEntry>,

    /// Context generation; bumped whenever in-flight fetches must be ignored
    epoch: u64,

    subscription: Option<u64>,
    next_subscription: u64,
    push_state: ConnectionState,

    /// The first page of the current date failed and can be retried
    initial_failed: bool,

    last_error: Option<String>,
    skipped_duplicates: usize,

    /// Window computed after the last mutation
    view: WindowView,
}

impl StreamController<SystemClock> {
    pub fn with_system_clock(config: ControllerConfig) -> Self {
        Self::new(config, SystemClock)
    }
}

impl<C: Clock> StreamController<C> {
    pub fn new(config: ControllerConfig, clock: C) -> Self {
        let filter_state = FilterState::new(clock.today());
        Self {
            store: LogStore::new(config.max_stored, config.dedup),
            filter: LogFilter::compile(&filter_state),
            filter_state,
            window: RenderWindow::new(config.display_cap),
            paginator: BackfillPaginator::new(config.page_size),
            mode: StreamMode::Initializing,
            live_date: true,
            cleared: false,
            frozen: None,
            pending_live: VecDeque::new(),
            epoch: 0,
            subscription: None,
            next_subscription: 1,
            push_state: ConnectionState::Disconnected,
            initial_failed: false,
            last_error: None,
            skipped_duplicates: 0,
            view: WindowView::default(),
            clock,
        }
    }

    /// Load `date` for the first time
    pub fn start(&mut self, date: NaiveDate) -> Vec<Effect> {
        self.on_date_changed(date)
    }

    // ------------------------------------------------------------------------
    // User input
    // ------------------------------------------------------------------------

    /// Switch to another date: reset the buffer and fetch its first page
    ///
    /// Today keeps (or opens) the push channel; any other date closes it.
    pub fn on_date_changed(&mut self, date: NaiveDate) -> Vec<Effect> {
        let live = date == self.clock.today();
        let mut effects = Vec::new();

        self.epoch += 1;

        if live {
            if self.subscription.is_none() {
                let subscription = self.next_subscription;
                self.next_subscription += 1;
                self.subscription = Some(subscription);
                self.push_state = ConnectionState::Connecting;
                effects.push(Effect::ConnectPush { subscription });
            }
        } else if self.subscription.take().is_some() {
            self.push_state = ConnectionState::Disconnected;
            effects.push(Effect::DisconnectPush);
        }

        self.filter_state.date = date;
        self.live_date = live;
        self.mode = StreamMode::Initializing;
        self.cleared = false;
        self.frozen = None;
        self.pending_live.clear();
        self.initial_failed = false;
        self.last_error = None;
        self.skipped_duplicates = 0;
        self.store.replace_all(Vec::new());
        self.paginator.reset();

        if let Some(ticket) = self.paginator.next_page(self.epoch, date, FetchKind::Initial) {
            effects.push(Effect::Fetch(ticket));
        }

        info!(%date, live, epoch = self.epoch, "date selected");
        self.recompute();
        effects
    }

    /// Apply new filter inputs; a different date is handled as a date change
    pub fn on_filter_changed(&mut self, state: FilterState) -> Vec<Effect> {
        if state == self.filter_state {
            return Vec::new();
        }

        let date_changed = state.date != self.filter_state.date;
        self.filter = LogFilter::compile(&state);
        let date = state.date;
        self.filter_state = state;

        if date_changed {
            return self.on_date_changed(date);
        }

        debug!(filter = ?self.filter, "filter changed");
        self.recompute();
        Vec::new()
    }

    /// Toggle between LIVE and PAUSED; ignored in every other mode
    pub fn on_pause_toggle(&mut self) {
        match self.mode {
            StreamMode::Live => {
                self.mode = StreamMode::Paused;
                self.frozen = Some(self.store.snapshot());
                info!(stored = self.store.len(), "stream paused");
            }
            StreamMode::Paused => {
                self.mode = StreamMode::Live;
                self.frozen = None;
                info!(stored = self.store.len(), "stream resumed");
            }
            _ => return,
        }
        self.recompute();
    }

    /// Blank the display; ingestion continues underneath
    pub fn on_clear_requested(&mut self) {
        self.cleared = true;
        self.recompute();
    }

    /// Undo a clear and show the current buffer again
    pub fn on_resume_requested(&mut self) {
        if self.cleared {
            self.cleared = false;
            self.recompute();
        }
    }

    /// The display was scrolled to the oldest rendered entry
    pub fn on_scroll_boundary_reached(&mut self) -> Vec<Effect> {
        if self.mode != StreamMode::Historical {
            return Vec::new();
        }

        match self
            .paginator
            .next_page(self.epoch, self.filter_state.date, FetchKind::Backfill)
        {
            Some(ticket) => {
                debug!(offset = ticket.offset, limit = ticket.limit, "requesting older page");
                vec![Effect::Fetch(ticket)]
            }
            None => Vec::new(),
        }
    }

    /// Retry after a failure: reload a failed first page, or page again
    pub fn on_retry_requested(&mut self) -> Vec<Effect> {
        if self.initial_failed {
            let date = self.filter_state.date;
            return self.on_date_changed(date);
        }
        self.on_scroll_boundary_reached()
    }

    /// Explicit reset: reload the current date from scratch
    pub fn reset(&mut self) -> Vec<Effect> {
        let date = self.filter_state.date;
        self.on_date_changed(date)
    }

    /// Ask the backend to delete logs for the selected date
    pub fn request_delete(&self) -> Vec<Effect> {
        vec![Effect::DeleteLogs {
            date: self.filter_state.date,
        }]
    }

    // ------------------------------------------------------------------------
    // Completions and push channel
    // ------------------------------------------------------------------------

    /// A historical fetch finished
    ///
    /// Responses for a context the controller has since left are dropped
    /// without side effects.
    pub fn on_fetch_completed(&mut self, ticket: &FetchTicket, result: Result<Vec<LogRecord>, FetchError>) {
        if ticket.epoch != self.epoch || !self.paginator.is_current(ticket) {
            debug!(
                epoch = ticket.epoch,
                current_epoch = self.epoch,
                date = %ticket.date,
                offset = ticket.offset,
                "discarding stale fetch response"
            );
            return;
        }

        match result {
            Ok(records) => {
                self.paginator.complete(ticket, records.len());
                self.last_error = None;

                let outcome = match ticket.kind {
                    FetchKind::Initial => {
                        self.initial_failed = false;
                        let offset = self.clock.utc_offset(ticket.date);
                        let page = LogParser::parse_page(
                            records,
                            ticket.date,
                            offset,
                            LogParser::end_of_day(ticket.date, offset),
                        );
                        let outcome = self.store.replace_all(page);
                        self.finish_initializing();
                        outcome
                    }
                    FetchKind::Backfill => {
                        let offset = self.clock.utc_offset(ticket.date);
                        let start = self
                            .store
                            .oldest_key()
                            .unwrap_or_else(|| LogParser::end_of_day(ticket.date, offset));
                        let page = LogParser::parse_page(records, ticket.date, offset, start);
                        self.store.append_older_page(page)
                    }
                };
                self.note_insert(outcome);

                debug!(
                    kind = ?ticket.kind,
                    offset = ticket.offset,
                    inserted = outcome.inserted,
                    has_more = self.paginator.has_more(),
                    "page applied"
                );
            }
            Err(error) => {
                self.paginator.fail(ticket);
                warn!(kind = ?ticket.kind, offset = ticket.offset, %error, "historical fetch failed");
                self.last_error = Some(error.to_string());
                if ticket.kind == FetchKind::Initial {
                    self.initial_failed = true;
                    self.finish_initializing();
                }
            }
        }

        self.recompute();
    }

    /// An event from the push channel tagged with its subscription
    pub fn on_push_event(&mut self, subscription: u64, event: PushEvent) {
        if self.subscription != Some(subscription) {
            debug!(subscription, "discarding event from closed subscription");
            return;
        }

        match event {
            PushEvent::Connecting => self.push_state = ConnectionState::Connecting,
            PushEvent::Connected => {
                info!(subscription, "push channel connected, live ingestion resumes from now");
                self.push_state = ConnectionState::Connected;
            }
            PushEvent::Disconnected => {
                warn!(subscription, "push channel dropped");
                self.push_state = ConnectionState::Disconnected;
            }
            PushEvent::Entry(record) => {
                let ctx = ParseContext {
                    date: self.filter_state.date,
                    offset: self.clock.utc_offset(self.filter_state.date),
                    fallback: OrderKey(self.clock.now_millis()),
                    origin: EntryOrigin::Live,
                };
                let entry = LogParser::parse(record, &ctx);

                if self.mode == StreamMode::Initializing {
                    if self.pending_live.len() >= self.store.capacity() {
                        self.pending_live.pop_front();
                    }
                    self.pending_live.push_back(entry);
                    return;
                }

                let outcome = self.store.prepend_live(entry);
                self.note_insert(outcome);
                self.recompute();
            }
        }
    }

    /// The administrative delete for `date` finished
    pub fn on_logs_deleted(&mut self, date: NaiveDate, result: Result<(), FetchError>) {
        if let Err(error) = result {
            warn!(%date, %error, "log deletion failed");
            self.last_error = Some(error.to_string());
            return;
        }
        if date != self.filter_state.date {
            return;
        }

        info!(%date, "server logs deleted, resetting buffer");
        self.epoch += 1;
        self.store.replace_all(Vec::new());
        self.paginator.reset();
        self.paginator.mark_exhausted();
        self.pending_live.clear();
        self.initial_failed = false;
        self.last_error = None;
        if self.frozen.is_some() {
            self.frozen = Some(Vec::new());
        }
        if self.mode == StreamMode::Initializing {
            self.finish_initializing();
        }
        self.recompute();
    }

    // ------------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------------

    /// The window to display
    pub fn visible(&self) -> &WindowView {
        &self.view
    }

    /// Mode as shown to the user (`Cleared` overrides the primary mode)
    pub fn mode(&self) -> StreamMode {
        if self.cleared {
            StreamMode::Cleared
        } else {
            self.mode
        }
    }

    /// LIVE / PAUSED / HISTORICAL / INITIALIZING, ignoring the cleared flag
    pub fn primary_mode(&self) -> StreamMode {
        self.mode
    }

    pub fn status(&self) -> StreamStatus {
        StreamStatus {
            mode: self.mode(),
            primary_mode: self.mode,
            date: self.filter_state.date,
            push: self.push_state,
            backfill: self.paginator.state(),
            stored: self.store.len(),
            over_capacity: self.store.over_capacity(),
            skipped_duplicates: self.skipped_duplicates,
            last_error: self.last_error.clone(),
        }
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.filter_state
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn finish_initializing(&mut self) {
        if self.mode != StreamMode::Initializing {
            return;
        }
        self.mode = if self.live_date {
            StreamMode::Live
        } else {
            StreamMode::Historical
        };

        for entry in std::mem::take(&mut self.pending_live) {
            let outcome = self.store.prepend_live(entry);
            self.note_insert(outcome);
        }
        info!(mode = ?self.mode, stored = self.store.len(), "initial load finished");
    }

    fn note_insert(&mut self, outcome: InsertOutcome) {
        self.skipped_duplicates += outcome.skipped_duplicates;
        if outcome.evicted > 0 {
            debug!(evicted = outcome.evicted, stored = self.store.len(), "evicted oldest entries");
        }
    }

    fn recompute(&mut self) {
        let filtered = match &self.frozen {
            Some(snapshot) => self.filter.apply(snapshot),
            None => self.filter.apply(&self.store.snapshot()),
        };
        let view = self.window.compute(filtered);
        self.view = if self.cleared {
            WindowView::blank(view.total_filtered)
        } else {
            view
        };
    }
}
