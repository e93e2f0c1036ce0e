/// UI-specific transient state
pub struct UiState {
    /// Is search/filter bar active?
    pub search_active: bool,

    /// Current search input text
    pub search_input: String,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Is the delete confirmation prompt showing?
    pub confirm_delete: bool,

    /// Error message to display (if any)
    pub error_message: Option<String>,

    /// Informational message (export result and similar)
    pub status_message: Option<String>,

    /// First rendered row, counted from the newest entry
    pub log_scroll: usize,

    /// Rows available for entries in the last render
    pub viewport_height: usize,

    /// Show timestamps in log viewer?
    pub show_timestamps: bool,

    /// Show statistics panel?
    pub stats_visible: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            search_active: false,
            search_input: String::new(),
            help_visible: false,
            confirm_delete: false,
            error_message: None,
            status_message: None,
            log_scroll: 0,
            viewport_height: 1,
            show_timestamps: true,
            stats_visible: false,
        }
    }
}

/// Global application state
pub struct AppState {
    /// UI state
    pub ui_state: UiState,

    /// Whether app should quit
    pub should_quit: bool,

    /// Dirty flag for rendering - only render when true
    pub render_dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            ui_state: UiState::default(),
            should_quit: false,
            render_dirty: true, // Start dirty to ensure initial render
        }
    }

    /// Show an error message
    pub fn show_error(&mut self, msg: String) {
        self.ui_state.error_message = Some(msg);
    }

    /// Dismiss the error message
    pub fn dismiss_error(&mut self) {
        self.ui_state.error_message = None;
    }

    /// Show an informational message in the status bar
    pub fn show_message(&mut self, msg: String) {
        self.ui_state.status_message = Some(msg);
    }

    /// Start search input, pre-filled with the active search text
    pub fn start_search(&mut self, current: &str) {
        self.ui_state.search_active = true;
        self.ui_state.search_input = current.to_string();
    }

    /// Leave search input without changing the active filter
    pub fn cancel_search(&mut self) {
        self.ui_state.search_active = false;
        self.ui_state.search_input.clear();
    }

    /// Leave search input and return what was typed
    pub fn take_search(&mut self) -> String {
        self.ui_state.search_active = false;
        std::mem::take(&mut self.ui_state.search_input)
    }

    /// Add a character to search input
    pub fn search_input_char(&mut self, c: char) {
        self.ui_state.search_input.push(c);
    }

    /// Remove last character from search input
    pub fn search_input_backspace(&mut self) {
        self.ui_state.search_input.pop();
    }

    /// Scroll towards newer entries
    pub fn scroll_up(&mut self, lines: usize) {
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_sub(lines);
    }

    /// Scroll towards older entries
    ///
    /// Returns true when the oldest rendered entry is in view afterwards.
    pub fn scroll_down(&mut self, lines: usize, total: usize) -> bool {
        let max_scroll = self.max_scroll(total);
        self.ui_state.log_scroll = (self.ui_state.log_scroll + lines).min(max_scroll);
        self.ui_state.log_scroll >= max_scroll
    }

    pub fn page_up(&mut self) {
        let page = self.ui_state.viewport_height.max(1);
        self.scroll_up(page);
    }

    pub fn page_down(&mut self, total: usize) -> bool {
        let page = self.ui_state.viewport_height.max(1);
        self.scroll_down(page, total)
    }

    pub fn scroll_to_newest(&mut self) {
        self.ui_state.log_scroll = 0;
    }

    pub fn scroll_to_oldest(&mut self, total: usize) -> bool {
        self.ui_state.log_scroll = self.max_scroll(total);
        true
    }

    /// Keep the scroll position inside the current window
    pub fn clamp_scroll(&mut self, total: usize) {
        let max_scroll = self.max_scroll(total);
        if self.ui_state.log_scroll > max_scroll {
            self.ui_state.log_scroll = max_scroll;
        }
    }

    fn max_scroll(&self, total: usize) -> usize {
        total.saturating_sub(self.ui_state.viewport_height)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
