use thiserror::Error;

/// Errors returned by frame and message codec operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input does not begin with the `AA 55` sync marker.
    #[error("missing sync marker")]
    MissingSync,
    /// Input ends before the frame announced by its length byte.
    #[error("truncated frame: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    /// Input carries bytes past the end of the announced frame.
    #[error("trailing bytes after frame: expected {expected}, got {got}")]
    TrailingBytes { expected: usize, got: usize },
    /// Payload does not fit the single length byte.
    #[error("payload too long: {0} bytes")]
    PayloadTooLong(usize),
    /// Vitals report payload is shorter than the fixed field layout.
    #[error("short vitals report: {0} payload bytes")]
    ShortVitalsReport(usize),
}
