use thiserror::Error;

/// Why a historical fetch produced no page
///
/// Both kinds are retryable; neither marks the paginator exhausted.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a usable response (network, decode)
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with `success: false`
    #[error("backend error: {0}")]
    Application(String),
}
