use thiserror::Error;

/// Shared lightweight error type for core primitive operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Sample timestamp lies before the Unix epoch.
    #[error("timestamp precedes unix epoch")]
    TimestampBeforeEpoch,
}
