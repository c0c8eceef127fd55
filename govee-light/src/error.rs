//! Light interface error types

use govee_transport::{FrameError, TransportError};
use thiserror::Error;

/// Errors from light operations
#[derive(Error, Debug)]
pub enum LightError {
    /// Transport layer error (connect, write, teardown)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A buffered packet could not be serialized
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// A write failed part-way through a flush; the buffer is kept intact
    #[error("Flush aborted after {sent} of {total} frames: {source}")]
    PartialFlush {
        sent: usize,
        total: usize,
        source: TransportError,
    },
}

impl LightError {
    /// Frames written before the error, for a flush error
    pub fn frames_sent(&self) -> usize {
        match self {
            LightError::PartialFlush { sent, .. } => *sent,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_flush_message() {
        let err = LightError::PartialFlush {
            sent: 4,
            total: 9,
            source: TransportError::Disconnected,
        };
        assert_eq!(
            err.to_string(),
            "Flush aborted after 4 of 9 frames: Device disconnected"
        );
        assert_eq!(err.frames_sent(), 4);
        assert_eq!(LightError::Transport(TransportError::Cancelled).frames_sent(), 0);
    }
}
