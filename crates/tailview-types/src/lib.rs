//! Shared types for tailview
//!
//! This crate contains the log data model and the wire records exchanged with
//! the log backend. It is used by every other tailview crate.

use chrono::NaiveDate;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    /// Producer-defined level outside the known set (stored upper-cased)
    Other(String),
}

impl LogLevel {
    /// Parse log level from common formats
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "trace" | "trc" | "trce" => Self::Trace,
            "debug" | "dbg" | "debg" => Self::Debug,
            "info" | "inf" | "information" => Self::Info,
            "warn" | "warning" | "wrn" => Self::Warn,
            "error" | "err" | "erro" => Self::Error,
            "fatal" | "panic" | "critical" | "crit" | "ftl" => Self::Fatal,
            _ => Self::Other(trimmed.to_uppercase()),
        }
    }

    /// Get display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Trace => Color::DarkGray,
            Self::Debug => Color::Cyan,
            Self::Info => Color::Green,
            Self::Warn => Color::Yellow,
            Self::Error => Color::Red,
            Self::Fatal => Color::Magenta,
            Self::Other(_) => Color::White,
        }
    }

    /// Short display string (3 chars)
    pub fn as_str(&self) -> &str {
        match self {
            Self::Trace => "TRC",
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Warn => "WRN",
            Self::Error => "ERR",
            Self::Fatal => "FTL",
            Self::Other(_) => "???",
        }
    }

    /// Canonical upper-case name, as producers usually spell it
    pub fn name(&self) -> &str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Other(name) => name,
        }
    }

    /// Levels an operator normally cares about (no debug/trace chatter)
    pub fn is_important(&self) -> bool {
        matches!(self, Self::Info | Self::Warn | Self::Error | Self::Fatal)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sort key for log entries, in epoch milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OrderKey(pub i64);

impl OrderKey {
    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

/// Where an entry's order key came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderSource {
    /// High-resolution timestamp supplied by the producer
    Producer,
    /// Parsed from the HH:MM:SS display label, anchored to the active date
    DisplayTime,
    /// Neither was usable; the key was borrowed from the entry's surroundings
    Fallback,
}

/// How an entry reached the client
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryOrigin {
    Live,
    Backfill,
}

/// Composite key used to recognise the same record arriving twice
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub display_timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

/// A single log entry
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// Sequential ID assigned by the store
    pub id: u64,

    /// Severity level
    pub level: LogLevel,

    /// Producer-supplied message (untrusted, sanitize before display)
    pub message: String,

    /// Short human-readable time label, as formatted by the producer
    pub display_timestamp: String,

    /// Sort key (newest = largest)
    pub order_key: OrderKey,

    /// How the order key was derived
    pub order_source: OrderSource,

    /// Push channel or historical page
    pub origin: EntryOrigin,
}

impl LogEntry {
    /// Create a new log entry with minimal fields
    pub fn new(level: LogLevel, message: impl Into<String>, display_timestamp: impl Into<String>) -> Self {
        Self {
            id: 0,
            level,
            message: message.into(),
            display_timestamp: display_timestamp.into(),
            order_key: OrderKey::default(),
            order_source: OrderSource::Fallback,
            origin: EntryOrigin::Live,
        }
    }

    /// Set an authoritative order key
    pub fn with_order_key(mut self, key: OrderKey) -> Self {
        self.order_key = key;
        self.order_source = OrderSource::Producer;
        self
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            display_timestamp: self.display_timestamp.clone(),
            level: self.level.clone(),
            message: self.message.clone(),
        }
    }
}

// ============================================================================
// Filter & Mode Types
// ============================================================================

/// Level selection in the filter bar
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum LevelFilter {
    /// No filtering by level
    #[default]
    All,
    /// ERROR, WARN and INFO (plus FATAL), never DEBUG
    Important,
    /// Exactly this level
    Exact(LogLevel),
}

impl LevelFilter {
    pub fn label(&self) -> String {
        match self {
            Self::All => "ALL".to_string(),
            Self::Important => "IMPORTANT".to_string(),
            Self::Exact(level) => level.name().to_string(),
        }
    }

    /// Cycle to the next level selection
    pub fn next(&self) -> Self {
        match self {
            Self::All => Self::Important,
            Self::Important => Self::Exact(LogLevel::Error),
            Self::Exact(LogLevel::Error) => Self::Exact(LogLevel::Warn),
            Self::Exact(LogLevel::Warn) => Self::Exact(LogLevel::Info),
            Self::Exact(LogLevel::Info) => Self::Exact(LogLevel::Debug),
            Self::Exact(_) => Self::All,
        }
    }
}

/// User-controlled filter inputs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterState {
    pub level: LevelFilter,
    pub date: NaiveDate,
    pub search: String,
}

impl FilterState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            level: LevelFilter::All,
            date,
            search: String::new(),
        }
    }
}

/// Stream mode as reported to the UI
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMode {
    Initializing,
    Live,
    Paused,
    Cleared,
    Historical,
}

impl StreamMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initializing => "LOADING",
            Self::Live => "LIVE",
            Self::Paused => "PAUSED",
            Self::Cleared => "CLEARED",
            Self::Historical => "HISTORY",
        }
    }
}

/// Push channel connectivity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "offline",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

/// Historical paging state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BackfillState {
    #[default]
    Idle,
    Loading,
    Exhausted,
    Failed,
}

impl BackfillState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Exhausted => "end of logs",
            Self::Failed => "retry",
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// A log record as sent by the backend, before it becomes a [`LogEntry`]
///
/// Decoding never fails: fields of the wrong type are coerced where the
/// meaning is clear and left empty otherwise, so one odd record cannot take
/// the rest of its page down with it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct LogRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch_ms: Option<i64>,
}

impl From<serde_json::Value> for LogRecord {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Self::default(),
            // A bare string or number is all message
            other => {
                return Self {
                    message: wire_text(&other),
                    ..Self::default()
                };
            }
        };

        let field = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| map.get(*name))
                .find(|value| !value.is_null())
        };

        let mut epoch_ms = field(&["epoch_ms", "ts", "timestamp_ms"]).and_then(wire_epoch_ms);
        let timestamp = match field(&["timestamp", "time"]) {
            // Numeric timestamps are epoch milliseconds
            Some(value) if value.is_number() => {
                epoch_ms = epoch_ms.or_else(|| wire_epoch_ms(value));
                None
            }
            Some(value) => wire_text(value),
            None => None,
        };

        Self {
            level: field(&["level", "severity"]).and_then(wire_text),
            message: field(&["message", "msg"]).and_then(wire_text),
            timestamp,
            epoch_ms,
        }
    }
}

fn wire_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn wire_epoch_ms(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|ms| ms.is_finite()).map(|ms| ms as i64)),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Response body of a historical fetch
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchResponse {
    pub success: bool,
    pub logs: Vec<LogRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A message on the push channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushMessage {
    Connected,
    Log(LogRecord),
}

/// Events produced by the push channel connection task
#[derive(Clone, Debug, PartialEq)]
pub enum PushEvent {
    /// A (re)connect attempt is in progress
    Connecting,
    /// The server acknowledged the subscription
    Connected,
    /// A new log record arrived
    Entry(LogRecord),
    /// The connection dropped; a reconnect will follow
    Disconnected,
}

/// Response body of the administrative delete
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
