//! Domain-specific error types for the luma pipeline.
//!
//! All fallible operations return `Result<T, LumaError>`.
//! No panics on invalid input; every error is typed. Per-frame
//! failures are recoverable: a bad frame is dropped and logged, never
//! allowed to stop the stream.

use thiserror::Error;

/// The canonical error type for the luma pipeline.
#[derive(Debug, Error)]
pub enum LumaError {
    // ── Geometry Errors ──────────────────────────────────────────
    /// A geometry dimension was zero.
    #[error("invalid geometry: {width}x{height} (both dimensions must be > 0)")]
    InvalidGeometry { width: u32, height: u32 },

    // ── Frame Errors ─────────────────────────────────────────────
    /// A binary payload arrived before any `initial` control message.
    #[error("frame received before geometry was announced")]
    NoGeometry,

    /// The binary payload length does not match the active geometry.
    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    // ── Control Errors ───────────────────────────────────────────
    /// A text payload could not be parsed as a control message.
    #[error("malformed control message: {0}")]
    MalformedControl(#[from] serde_json::Error),

    // ── Connection Errors ────────────────────────────────────────
    /// The WebSocket layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    /// The TCP/IO layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An event channel was closed unexpectedly.
    #[error("event channel closed")]
    ChannelClosed,

    // ── Surface Errors ───────────────────────────────────────────
    /// No GPU adapter or device could be acquired.
    #[error("gpu unavailable: {0}")]
    GpuUnavailable(String),

    /// Shader compilation or pipeline creation failed.
    ///
    /// Fatal to the surface: rendering cannot proceed without a
    /// valid program, so initialization fails loudly rather than
    /// leaving a half-built renderer behind.
    #[error("surface initialization failed: {0}")]
    SurfaceInit(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for LumaError {
    fn from(s: String) -> Self {
        LumaError::Other(s)
    }
}

impl From<&str> for LumaError {
    fn from(s: &str) -> Self {
        LumaError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for LumaError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        LumaError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = LumaError::FrameSizeMismatch {
            expected: 12,
            actual: 10,
        };
        assert!(e.to_string().contains("12"));
        assert!(e.to_string().contains("10"));

        let e = LumaError::NoGeometry;
        assert!(e.to_string().contains("geometry"));
    }

    #[test]
    fn from_string() {
        let e: LumaError = "something broke".into();
        assert!(matches!(e, LumaError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: LumaError = io_err.into();
        assert!(matches!(e, LumaError::Io(_)));
    }
}
