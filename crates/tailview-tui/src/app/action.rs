/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,

    // UI toggles
    ToggleHelp,
    ToggleStats,
    ToggleTimestamps,
    Cancel,

    // Scrolling (newest entries are at the top)
    ScrollUp(usize),
    ScrollDown(usize),
    PageUp,
    PageDown,
    ScrollToNewest,
    ScrollToOldest,

    // Stream control
    TogglePause,
    ClearDisplay,
    Resume,
    Retry,
    Reload,

    // Search
    OpenSearch,
    CloseSearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,
    ApplyFilter,
    ClearFilter,

    // Level filter
    CycleLevel,

    // Date navigation
    PreviousDay,
    NextDay,
    Today,

    // Admin
    RequestDelete,
    ConfirmDelete,
    CancelDelete,
    ExportLogs,
}
