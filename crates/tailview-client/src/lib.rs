//! Backend client for tailview
//!
//! This crate talks to the log backend: paginated historical fetches and the
//! administrative delete over HTTP, and the live push channel over a
//! WebSocket with automatic reconnects.

mod endpoints;
mod error;
mod http;
mod push;

pub use endpoints::Endpoints;
pub use error::ClientError;
pub use http::HttpLogClient;
pub use push::{Backoff, PushStreamManager, decode_push_message};

// Re-export types that are used in our public API
pub use tailview_types::{FetchResponse, LogRecord, PushEvent};
