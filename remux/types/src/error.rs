/*!
    Error taxonomy for the remux pipeline.
*/

use thiserror::Error;

/**
    Errors produced by the remux pipeline.

    Setup-phase errors (everything up to and including the container
    header) are fatal: the pipeline aborts and releases its resources.
    `MuxWrite` is the one per-packet error a caller may choose to
    tolerate mid-stream.
*/
#[derive(Debug, Error)]
pub enum RemuxError {
    // ── Input binding ─────────────────────────────────────────────────
    #[error("could not open {0}")]
    Open(String),
    #[error("could not determine input stream parameters: {0}")]
    FormatProbe(String),
    #[error("input has no video stream")]
    NoVideoStream,

    // ── Output mapping ────────────────────────────────────────────────
    #[error("no container format matches '{0}'")]
    UnsupportedContainer(String),
    #[error("no usable encoder for {0}")]
    EncoderUnavailable(String),
    #[error("audio encoding failed: {0}")]
    Encode(String),
    #[error("output is missing its video or audio track")]
    NoVideoOrAudioTrack,

    // ── Muxing ────────────────────────────────────────────────────────
    #[error("could not write container header: {0}")]
    MuxHeader(String),
    #[error("could not mux packet: {0}")]
    MuxWrite(String),

    // ── I/O ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RemuxError {
    /**
        Returns true if the remux loop may recover from this error by
        dropping the offending packet and continuing.
    */
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MuxWrite(_))
    }
}

/// Type alias for results that may return a [`RemuxError`].
pub type RemuxResult<T> = std::result::Result<T, RemuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_packet_writes_are_recoverable() {
        assert!(RemuxError::MuxWrite("boom".into()).is_recoverable());
        assert!(!RemuxError::MuxHeader("boom".into()).is_recoverable());
        assert!(!RemuxError::NoVideoStream.is_recoverable());
        assert!(!RemuxError::EncoderUnavailable("aac".into()).is_recoverable());
    }

    #[test]
    fn messages_name_the_stage() {
        let err = RemuxError::Open("input.flv".into());
        assert_eq!(err.to_string(), "could not open input.flv");
        let err = RemuxError::NoVideoStream;
        assert_eq!(err.to_string(), "input has no video stream");
    }
}
