//! Error types for the transcode core.
//!
//! Only the first fatal error encountered during a run is surfaced to the
//! caller; failures during teardown are logged and suppressed so cleanup
//! always runs to completion. Audio-stage failures are deliberately absent
//! from the fatal set seen by callers: the orchestrator maps them to a
//! degraded, video-only outcome.

use thiserror::Error;

/// Custom error types for shroud.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("codec configuration rejected: {0}")]
    CodecConfiguration(String),

    #[error("encoder never reported an output format")]
    FormatNegotiationTimeout,

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("muxing error: {0}")]
    Muxing(String),

    #[error("audio stage failed: {0}")]
    Audio(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for shroud operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
