use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Deserialize;

use tailview_types::{IdentityKey, LogEntry, LogLevel, OrderKey};

/// Shared handle to an immutable entry (cloning is a reference count bump)
pub type ArcLogEntry = Arc<LogEntry>;

/// What to do with an entry whose identity key is already stored
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupPolicy {
    /// Store every entry, duplicates included
    #[default]
    Off,
    /// Skip entries whose (timestamp, level, message) is already held
    #[serde(alias = "identity_key")]
    Identity,
}

/// Result of an insert operation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub evicted: usize,
}

/// Ordered, capacity-limited log buffer
///
/// The front holds the most recent entries. Live entries are prepended and
/// evict from the back once the cap is exceeded; historical pages extend the
/// back and never evict.
pub struct LogStore {
    /// Internal storage, newest first
    entries: VecDeque<ArcLogEntry>,

    /// Maximum number of entries kept by live insertion
    capacity: usize,

    /// Next entry ID
    next_id: u64,

    /// Per-level counts, maintained on insert and evict
    level_counts: LevelCounts,

    dedup: DedupPolicy,

    /// Identity key -> number of stored entries with that key
    identities: HashMap<IdentityKey, usize>,
}

impl LogStore {
    /// Create a new store with the given capacity
    pub fn new(capacity: usize, dedup: DedupPolicy) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 0,
            level_counts: LevelCounts::default(),
            dedup,
            identities: HashMap::new(),
        }
    }

    /// Insert a live entry at the front, evicting from the back past capacity
    pub fn prepend_live(&mut self, entry: LogEntry) -> InsertOutcome {
        let mut outcome = InsertOutcome::default();
        match self.admit(entry) {
            Some(entry) => {
                self.entries.push_front(entry);
                outcome.inserted = 1;
            }
            None => outcome.skipped_duplicates = 1,
        }

        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                self.forget(&evicted);
                outcome.evicted += 1;
            }
        }

        outcome
    }

    /// Extend the back with a page of older entries (newest of the page first)
    ///
    /// The cap is not applied here: a page the user asked for is never
    /// silently dropped.
    pub fn append_older_page(&mut self, page: Vec<LogEntry>) -> InsertOutcome {
        let mut outcome = InsertOutcome::default();
        for entry in page {
            match self.admit(entry) {
                Some(entry) => {
                    self.entries.push_back(entry);
                    outcome.inserted += 1;
                }
                None => outcome.skipped_duplicates += 1,
            }
        }
        outcome
    }

    /// Discard everything and take `entries` (newest first) as the new content
    pub fn replace_all(&mut self, entries: Vec<LogEntry>) -> InsertOutcome {
        self.clear();
        self.append_older_page(entries)
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.identities.clear();
        self.level_counts = LevelCounts::default();
        self.next_id = 0;
    }

    /// Total entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True after historical paging pushed the store past its cap
    pub fn over_capacity(&self) -> bool {
        self.entries.len() > self.capacity
    }

    /// Copy of the current content, newest first (Arc clones are cheap)
    pub fn snapshot(&self) -> Vec<ArcLogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Iterate entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &ArcLogEntry> {
        self.entries.iter()
    }

    /// Smallest order key currently held
    pub fn oldest_key(&self) -> Option<OrderKey> {
        self.entries.iter().map(|e| e.order_key).min()
    }

    /// Get entry count per log level
    pub fn level_counts(&self) -> LevelCounts {
        self.level_counts.clone()
    }

    /// Assign an id and check the dedup policy; `None` means skip
    fn admit(&mut self, mut entry: LogEntry) -> Option<ArcLogEntry> {
        if self.dedup == DedupPolicy::Identity {
            let count = self.identities.entry(entry.identity_key()).or_insert(0);
            if *count > 0 {
                return None;
            }
            *count += 1;
        }

        entry.id = self.next_id;
        self.next_id += 1;
        self.level_counts.increment(&entry.level);
        Some(Arc::new(entry))
    }

    fn forget(&mut self, entry: &LogEntry) {
        self.level_counts.decrement(&entry.level);
        if self.dedup == DedupPolicy::Identity {
            let key = entry.identity_key();
            if let Some(count) = self.identities.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    self.identities.remove(&key);
                }
            }
        }
    }
}

/// Counts per log level
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub trace: usize,
    pub debug: usize,
    pub info: usize,
    pub warn: usize,
    pub error: usize,
    pub fatal: usize,
    pub other: usize,
}

impl LevelCounts {
    pub fn total(&self) -> usize {
        self.trace + self.debug + self.info + self.warn + self.error + self.fatal + self.other
    }

    fn slot(&mut self, level: &LogLevel) -> &mut usize {
        match level {
            LogLevel::Trace => &mut self.trace,
            LogLevel::Debug => &mut self.debug,
            LogLevel::Info => &mut self.info,
            LogLevel::Warn => &mut self.warn,
            LogLevel::Error => &mut self.error,
            LogLevel::Fatal => &mut self.fatal,
            LogLevel::Other(_) => &mut self.other,
        }
    }

    fn increment(&mut self, level: &LogLevel) {
        *self.slot(level) += 1;
    }

    fn decrement(&mut self, level: &LogLevel) {
        let slot = self.slot(level);
        *slot = slot.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(n: i64) -> LogEntry {
        LogEntry::new(LogLevel::Info, format!("E{}", n), format!("00:00:{:02}", n % 60))
            .with_order_key(OrderKey(n))
    }

    fn messages(store: &LogStore) -> Vec<String> {
        store.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn test_prepend_evicts_oldest() {
        let mut store = LogStore::new(3, DedupPolicy::Off);
        for n in 1..=5 {
            store.prepend_live(entry(n));
        }
        assert_eq!(messages(&store), vec!["E5", "E4", "E3"]);
    }

    #[test]
    fn test_append_page_does_not_evict() {
        let mut store = LogStore::new(2, DedupPolicy::Off);
        store.replace_all(vec![entry(10), entry(9)]);
        let outcome = store.append_older_page(vec![entry(8), entry(7)]);

        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.evicted, 0);
        assert_eq!(store.len(), 4);
        assert!(store.over_capacity());
        assert_eq!(messages(&store), vec!["E10", "E9", "E8", "E7"]);
    }

    #[test]
    fn test_prepend_after_overflowing_page_trims_to_cap() {
        let mut store = LogStore::new(2, DedupPolicy::Off);
        store.replace_all(vec![entry(3), entry(2), entry(1)]);
        let outcome = store.prepend_live(entry(4));

        assert_eq!(outcome.evicted, 2);
        assert_eq!(messages(&store), vec!["E4", "E3"]);
    }

    #[test]
    fn test_replace_all_discards_previous_content() {
        let mut store = LogStore::new(10, DedupPolicy::Off);
        store.prepend_live(entry(1));
        store.replace_all(vec![entry(7)]);
        assert_eq!(messages(&store), vec!["E7"]);
        assert_eq!(store.level_counts().total(), 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = LogStore::new(10, DedupPolicy::Off);
        store.prepend_live(entry(1));
        let snapshot = store.snapshot();
        store.prepend_live(entry(2));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_level_counts_follow_eviction() {
        let mut store = LogStore::new(1, DedupPolicy::Off);
        store.prepend_live(LogEntry::new(LogLevel::Error, "boom", "10:00:00"));
        store.prepend_live(LogEntry::new(LogLevel::Debug, "tick", "10:00:01"));

        let counts = store.level_counts();
        assert_eq!(counts.error, 0);
        assert_eq!(counts.debug, 1);
        assert_eq!(counts.total(), 1);
    }

    #[test]
    fn test_duplicates_kept_when_dedup_off() {
        let mut store = LogStore::new(10, DedupPolicy::Off);
        store.prepend_live(entry(1));
        store.prepend_live(entry(1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_identity_dedup_across_live_and_backfill() {
        let mut store = LogStore::new(10, DedupPolicy::Identity);
        store.replace_all(vec![entry(2), entry(1)]);

        let live = store.prepend_live(entry(2));
        assert_eq!(live.skipped_duplicates, 1);

        let page = store.append_older_page(vec![entry(1), entry(0)]);
        assert_eq!(page.inserted, 1);
        assert_eq!(page.skipped_duplicates, 1);
        assert_eq!(messages(&store), vec!["E2", "E1", "E0"]);
    }

    #[test]
    fn test_identity_dedup_forgets_evicted_keys() {
        let mut store = LogStore::new(1, DedupPolicy::Identity);
        store.prepend_live(entry(1));
        store.prepend_live(entry(2));
        let outcome = store.prepend_live(entry(1));
        assert_eq!(outcome.inserted, 1);
        assert_eq!(messages(&store), vec!["E1"]);
    }

    proptest! {
        #[test]
        fn prepend_never_exceeds_capacity(cap in 1usize..50, count in 0usize..200) {
            let mut store = LogStore::new(cap, DedupPolicy::Off);
            for n in 0..count {
                store.prepend_live(entry(n as i64));
                prop_assert!(store.len() <= cap);
            }
        }

        #[test]
        fn append_keeps_existing_relative_order(
            existing in 0usize..30,
            page in 0usize..30,
        ) {
            let mut store = LogStore::new(10, DedupPolicy::Off);
            store.replace_all((0..existing).map(|n| entry(1000 - n as i64)).collect());
            let before = messages(&store);

            store.append_older_page((0..page).map(|n| entry(-(n as i64))).collect());
            let after = messages(&store);

            prop_assert_eq!(&after[..before.len()], &before[..]);
            prop_assert_eq!(after.len(), existing + page);
        }
    }
}
