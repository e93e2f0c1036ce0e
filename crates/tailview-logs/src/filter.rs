use regex::{Regex, RegexBuilder};
use tracing::warn;

use tailview_types::{FilterState, LevelFilter, LogEntry};

use crate::buffer::ArcLogEntry;

/// Compiled filter for log entries
///
/// Holds no state besides the compiled inputs, so it can be re-run over the
/// whole buffer on every change.
#[derive(Clone)]
pub struct LogFilter {
    /// Search text compiled as a case-insensitive literal (if any)
    search: Option<Search>,

    /// Original search text
    pattern: String,

    level: LevelFilter,
}

#[derive(Clone)]
enum Search {
    Regex(Regex),
    /// Lower-cased needle, used if the escaped pattern is too large to compile
    Plain(String),
}

impl LogFilter {
    /// Compile a filter from the user's filter state
    pub fn compile(state: &FilterState) -> Self {
        let search = if state.search.is_empty() {
            None
        } else {
            match RegexBuilder::new(&regex::escape(&state.search))
                .case_insensitive(true)
                .build()
            {
                Ok(re) => Some(Search::Regex(re)),
                Err(e) => {
                    warn!(error = %e, "search text did not compile, using plain matching");
                    Some(Search::Plain(state.search.to_lowercase()))
                }
            }
        };

        Self {
            search,
            pattern: state.search.clone(),
            level: state.level.clone(),
        }
    }

    /// Check if a log entry matches this filter
    pub fn matches(&self, entry: &LogEntry) -> bool {
        let level_match = match &self.level {
            LevelFilter::All => true,
            LevelFilter::Important => entry.level.is_important(),
            LevelFilter::Exact(level) => &entry.level == level,
        };
        if !level_match {
            return false;
        }

        match &self.search {
            Some(Search::Regex(re)) => re.is_match(&entry.message),
            Some(Search::Plain(needle)) => entry.message.to_lowercase().contains(needle),
            None => true,
        }
    }

    /// Entries that pass the filter, in input order
    pub fn apply(&self, entries: &[ArcLogEntry]) -> Vec<ArcLogEntry> {
        if self.is_empty() {
            return entries.to_vec();
        }
        entries.iter().filter(|e| self.matches(e)).cloned().collect()
    }

    /// Find all match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.search {
            Some(Search::Regex(re)) => re.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            _ => Vec::new(),
        }
    }

    /// Get the original search text
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.level == LevelFilter::All
    }
}

impl std::fmt::Debug for LogFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFilter")
            .field("pattern", &self.pattern)
            .field("level", &self.level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tailview_types::LogLevel;

    fn state(level: LevelFilter, search: &str) -> FilterState {
        FilterState {
            level,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            search: search.to_string(),
        }
    }

    fn entries(levels: &[LogLevel]) -> Vec<ArcLogEntry> {
        levels
            .iter()
            .enumerate()
            .map(|(i, level)| Arc::new(LogEntry::new(level.clone(), format!("message {}", i), "10:00:00")))
            .collect()
    }

    #[test]
    fn test_important_excludes_debug() {
        let filter = LogFilter::compile(&state(LevelFilter::Important, ""));
        let input = entries(&[LogLevel::Error, LogLevel::Warn, LogLevel::Info, LogLevel::Debug]);
        let result = filter.apply(&input);

        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|e| e.level != LogLevel::Debug));
    }

    #[test]
    fn test_exact_level_matches_only_that_level() {
        let filter = LogFilter::compile(&state(LevelFilter::Exact(LogLevel::Warn), ""));
        let input = entries(&[LogLevel::Error, LogLevel::Warn, LogLevel::parse("WARNING")]);
        assert_eq!(filter.apply(&input).len(), 2);
    }

    #[test]
    fn test_exact_matches_producer_defined_level() {
        let filter = LogFilter::compile(&state(LevelFilter::Exact(LogLevel::parse("audit")), ""));
        let input = entries(&[LogLevel::parse("AUDIT"), LogLevel::Info]);
        assert_eq!(filter.apply(&input).len(), 1);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let filter = LogFilter::compile(&state(LevelFilter::All, "DISK"));
        let hit = LogEntry::new(LogLevel::Warn, "disk usage at 91%", "10:00:00");
        let miss = LogEntry::new(LogLevel::Warn, "memory fine", "10:00:00");
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }

    #[test]
    fn test_search_treats_regex_metacharacters_literally() {
        let filter = LogFilter::compile(&state(LevelFilter::All, "a.c (x)"));
        assert!(filter.matches(&LogEntry::new(LogLevel::Info, "got a.c (x) here", "")));
        assert!(!filter.matches(&LogEntry::new(LogLevel::Info, "got abc x here", "")));
    }

    #[test]
    fn test_empty_search_matches_everything() {
        let filter = LogFilter::compile(&state(LevelFilter::All, ""));
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&entries(&[LogLevel::Debug, LogLevel::Trace])).len(), 2);
    }

    #[test]
    fn test_find_matches() {
        let filter = LogFilter::compile(&state(LevelFilter::All, "error"));
        let matches = filter.find_matches("an Error occurred, another error here");
        assert_eq!(matches, vec![(3, 8), (27, 32)]);
    }

    proptest! {
        #[test]
        fn apply_is_pure(search in "[a-c]{0,2}", seeds in proptest::collection::vec(0u8..4, 0..40)) {
            let levels: Vec<LogLevel> = seeds
                .iter()
                .map(|s| match s {
                    0 => LogLevel::Error,
                    1 => LogLevel::Warn,
                    2 => LogLevel::Info,
                    _ => LogLevel::Debug,
                })
                .collect();
            let input: Vec<ArcLogEntry> = levels
                .iter()
                .zip(seeds.iter())
                .map(|(level, s)| Arc::new(LogEntry::new(level.clone(), format!("ab{}c", s), "")))
                .collect();
            let before: Vec<u64> = input.iter().map(|e| e.id).collect();
            let filter = LogFilter::compile(&state(LevelFilter::Important, &search));

            let first: Vec<String> = filter.apply(&input).iter().map(|e| e.message.clone()).collect();
            let second: Vec<String> = filter.apply(&input).iter().map(|e| e.message.clone()).collect();

            prop_assert_eq!(first, second);
            prop_assert_eq!(input.iter().map(|e| e.id).collect::<Vec<_>>(), before);
        }
    }
}
