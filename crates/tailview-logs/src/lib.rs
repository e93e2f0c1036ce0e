//! Log processing for tailview
//!
//! This crate provides the bounded log store, filtering, the render window,
//! historical paging and the stream controller state machine. Nothing in here
//! performs I/O: the controller hands [`Effect`]s to its caller and is told
//! about their completion.

mod backfill;
mod buffer;
mod controller;
mod error;
mod filter;
mod parser;
mod sanitize;
mod window;

pub use backfill::{BackfillPaginator, FetchKind, FetchTicket};
pub use buffer::{ArcLogEntry, DedupPolicy, InsertOutcome, LevelCounts, LogStore};
pub use controller::{
    Clock, ControllerConfig, Effect, StreamController, StreamStatus, SystemClock,
};
pub use error::FetchError;
pub use filter::LogFilter;
pub use parser::{LogParser, ParseContext};
pub use sanitize::sanitize_message;
pub use window::{RenderWindow, WindowView};

// Re-export types used in our public API
pub use tailview_types::{
    FilterState, LevelFilter, LogEntry, LogLevel, LogRecord, PushEvent, StreamMode,
};
