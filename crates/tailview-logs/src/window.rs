use crate::buffer::ArcLogEntry;

/// The slice of filtered entries handed to the display
#[derive(Clone, Debug, Default)]
pub struct WindowView {
    /// Newest first, at most the display cap
    pub entries: Vec<ArcLogEntry>,

    /// Number of entries that passed the filter before truncation
    pub total_filtered: usize,
}

impl WindowView {
    /// A blank surface that still knows how much is behind it
    pub fn blank(total_filtered: usize) -> Self {
        Self {
            entries: Vec::new(),
            total_filtered,
        }
    }

    /// Number of entries shown
    pub fn shown(&self) -> usize {
        self.entries.len()
    }

    /// True when entries were cut to fit the display cap
    pub fn truncated(&self) -> bool {
        self.total_filtered > self.entries.len()
    }
}

/// Bounds what is rendered, independently of what is stored
#[derive(Clone, Copy, Debug)]
pub struct RenderWindow {
    display_cap: usize,
}

impl RenderWindow {
    pub fn new(display_cap: usize) -> Self {
        Self { display_cap }
    }

    pub fn display_cap(&self) -> usize {
        self.display_cap
    }

    /// Sort newest first and keep the newest `display_cap` entries
    ///
    /// The sort is stable, so entries sharing an order key keep their store
    /// order and repeated calls give identical windows.
    pub fn compute(&self, mut filtered: Vec<ArcLogEntry>) -> WindowView {
        let total_filtered = filtered.len();
        filtered.sort_by(|a, b| b.order_key.cmp(&a.order_key));
        filtered.truncate(self.display_cap);

        WindowView {
            entries: filtered,
            total_filtered,
        }
    }
}
