use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use tailview_types::{EntryOrigin, LogEntry, LogLevel, LogRecord, OrderKey, OrderSource};

/// Label shown for records without any usable time
const MISSING_TIMESTAMP: &str = "--:--:--";

/// Everything the parser needs besides the record itself
#[derive(Clone, Copy, Debug)]
pub struct ParseContext {
    /// Date the record belongs to (anchors HH:MM:SS labels)
    pub date: NaiveDate,

    /// Offset of the producer's wall clock on `date`
    pub offset: FixedOffset,

    /// Order key used when the record has no usable time at all
    pub fallback: OrderKey,

    pub origin: EntryOrigin,
}

/// Turns backend records into log entries
pub struct LogParser;

impl LogParser {
    /// Parse a single record into a LogEntry
    ///
    /// Malformed records still produce an entry: a missing level becomes
    /// `UNKNOWN`, a missing message becomes empty, and the order key falls
    /// back through display time to `ctx.fallback`.
    pub fn parse(record: LogRecord, ctx: &ParseContext) -> LogEntry {
        let level = match record.level.as_deref().map(str::trim) {
            Some(level) if !level.is_empty() => LogLevel::parse(level),
            _ => LogLevel::Other("UNKNOWN".to_string()),
        };

        let (order_key, order_source) = Self::derive_order_key(&record, ctx);

        let display_timestamp = match (record.timestamp, record.epoch_ms) {
            (Some(label), _) if !label.trim().is_empty() => label,
            (_, Some(ms)) => DateTime::from_timestamp_millis(ms)
                .map(|ts| ts.with_timezone(&ctx.offset).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| MISSING_TIMESTAMP.to_string()),
            _ => MISSING_TIMESTAMP.to_string(),
        };

        if order_source == OrderSource::Fallback {
            debug!(label = %display_timestamp, "record has no usable timestamp, using fallback order key");
        }

        LogEntry {
            id: 0,
            level,
            message: record.message.unwrap_or_default(),
            display_timestamp,
            order_key,
            order_source,
            origin: ctx.origin,
        }
    }

    /// Parse a page of historical records (newest first)
    ///
    /// Records without a usable time inherit the key of the record before
    /// them, so they stay next to their neighbours after sorting.
    pub fn parse_page(
        records: Vec<LogRecord>,
        date: NaiveDate,
        offset: FixedOffset,
        start_fallback: OrderKey,
    ) -> Vec<LogEntry> {
        let mut fallback = start_fallback;
        records
            .into_iter()
            .map(|record| {
                let ctx = ParseContext {
                    date,
                    offset,
                    fallback,
                    origin: EntryOrigin::Backfill,
                };
                let entry = Self::parse(record, &ctx);
                fallback = entry.order_key;
                entry
            })
            .collect()
    }

    /// Order key of the last millisecond of `date` on a clock at `offset`
    pub fn end_of_day(date: NaiveDate, offset: FixedOffset) -> OrderKey {
        let start = Self::start_of_day(date, offset).as_millis();
        OrderKey(start + 24 * 60 * 60 * 1000 - 1)
    }

    /// Order key of midnight on `date` on a clock at `offset`
    pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> OrderKey {
        Self::wall_clock_key(date.and_time(NaiveTime::MIN), offset)
    }

    /// Epoch milliseconds of a wall-clock reading taken at `offset`
    fn wall_clock_key(local: NaiveDateTime, offset: FixedOffset) -> OrderKey {
        let utc = local.and_utc().timestamp_millis();
        OrderKey(utc - i64::from(offset.local_minus_utc()) * 1000)
    }

    fn derive_order_key(record: &LogRecord, ctx: &ParseContext) -> (OrderKey, OrderSource) {
        if let Some(ms) = record.epoch_ms {
            return (OrderKey(ms), OrderSource::Producer);
        }

        if let Some(key) = record
            .timestamp
            .as_deref()
            .and_then(|label| Self::display_time_key(label, ctx.date, ctx.offset))
        {
            return (key, OrderSource::DisplayTime);
        }

        (ctx.fallback, OrderSource::Fallback)
    }

    /// Parse an `HH:MM:SS[.fff]` label (optionally preceded by a date part)
    /// into an order key on `date`
    fn display_time_key(label: &str, date: NaiveDate, offset: FixedOffset) -> Option<OrderKey> {
        // "2024-01-15 10:30:00" and "2024-01-15T10:30:00" keep only the time
        let time_part = label
            .trim()
            .rsplit(|c: char| c == ' ' || c == 'T')
            .next()?;
        let time = NaiveTime::parse_from_str(time_part, "%H:%M:%S%.f").ok()?;
        Some(Self::wall_clock_key(date.and_time(time), offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn ctx(fallback: i64) -> ParseContext {
        ParseContext {
            date: date(),
            offset: utc(),
            fallback: OrderKey(fallback),
            origin: EntryOrigin::Live,
        }
    }

    fn record(level: Option<&str>, message: &str, timestamp: Option<&str>, epoch_ms: Option<i64>) -> LogRecord {
        LogRecord {
            level: level.map(String::from),
            message: Some(message.to_string()),
            timestamp: timestamp.map(String::from),
            epoch_ms,
        }
    }

    #[test]
    fn test_producer_timestamp_wins() {
        let entry = LogParser::parse(record(Some("INFO"), "a", Some("10:00:00"), Some(42)), &ctx(0));
        assert_eq!(entry.order_key, OrderKey(42));
        assert_eq!(entry.order_source, OrderSource::Producer);
        assert_eq!(entry.display_timestamp, "10:00:00");
    }

    #[test]
    fn test_display_time_fallback_is_anchored_to_date() {
        let entry = LogParser::parse(record(Some("INFO"), "a", Some("10:30:15"), None), &ctx(0));
        let expected = LogParser::start_of_day(date(), utc()).as_millis() + (10 * 3600 + 30 * 60 + 15) * 1000;
        assert_eq!(entry.order_key, OrderKey(expected));
        assert_eq!(entry.order_source, OrderSource::DisplayTime);
    }

    #[test]
    fn test_display_time_with_fraction_and_date_prefix() {
        let plain = LogParser::parse(record(None, "a", Some("10:30:15"), None), &ctx(0));
        let fraction = LogParser::parse(record(None, "a", Some("10:30:15.250"), None), &ctx(0));
        let prefixed = LogParser::parse(record(None, "a", Some("2024-01-15 10:30:15"), None), &ctx(0));

        assert_eq!(fraction.order_key.as_millis() - plain.order_key.as_millis(), 250);
        assert_eq!(prefixed.order_key, plain.order_key);
    }

    #[test]
    fn test_missing_everything_still_produces_entry() {
        let entry = LogParser::parse(LogRecord::default(), &ctx(99));
        assert_eq!(entry.level, LogLevel::Other("UNKNOWN".to_string()));
        assert_eq!(entry.message, "");
        assert_eq!(entry.display_timestamp, MISSING_TIMESTAMP);
        assert_eq!(entry.order_key, OrderKey(99));
        assert_eq!(entry.order_source, OrderSource::Fallback);
    }

    #[test]
    fn test_unparseable_label_uses_fallback() {
        let entry = LogParser::parse(record(Some("WARN"), "a", Some("yesterday-ish"), None), &ctx(7));
        assert_eq!(entry.order_key, OrderKey(7));
        assert_eq!(entry.display_timestamp, "yesterday-ish");
    }

    #[test]
    fn test_epoch_only_record_gets_display_label() {
        // 2024-01-15T10:00:00Z
        let entry = LogParser::parse(record(Some("INFO"), "a", None, Some(1_705_312_800_000)), &ctx(0));
        assert_eq!(entry.display_timestamp, "10:00:00");
    }

    #[test]
    fn test_page_carries_fallback_forward() {
        let records = vec![
            record(Some("INFO"), "newest", Some("12:00:00"), None),
            record(Some("INFO"), "no time", None, None),
            record(Some("INFO"), "older", Some("11:00:00"), None),
        ];
        let page = LogParser::parse_page(records, date(), utc(), LogParser::end_of_day(date(), utc()));

        assert_eq!(page[1].order_key, page[0].order_key);
        assert_eq!(page[1].origin, EntryOrigin::Backfill);
        assert!(page[2].order_key < page[1].order_key);
    }

    #[test]
    fn test_display_time_west_of_utc() {
        // 10:00 in New York (UTC-5) is 15:00 UTC
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        let ctx = ParseContext {
            offset: new_york,
            ..ctx(0)
        };
        let local = LogParser::parse(record(Some("INFO"), "a", Some("10:00:00"), None), &ctx);
        let producer = LogParser::parse(record(Some("INFO"), "a", None, Some(1_705_330_800_000)), &ctx);

        assert_eq!(local.order_key, OrderKey(1_705_330_800_000));
        assert_eq!(producer.display_timestamp, "10:00:00");
        assert_eq!(
            LogParser::start_of_day(date(), new_york).as_millis(),
            LogParser::start_of_day(date(), utc()).as_millis() + 5 * 3600 * 1000
        );
    }
}
