use thiserror::Error;

/// Errors surfaced by graph construction and mutation.
///
/// `run` never returns these; an engine that cannot produce audio
/// produces silence instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A fixed-capacity resource (unit pool, sink list, scheduler
    /// scratch, bus pool) is exhausted on a real-time path.
    #[error("capacity exhausted")]
    OutOfCapacity,

    /// The connection would wire a unit directly to itself.
    #[error("connection would form a feedback loop")]
    FeedbackLoop,

    /// The engine latched an unrecoverable scheduling state: `run`
    /// emits silence and [`crate::AudioGraph::status`] reports this
    /// error until a later `reschedule` succeeds.
    #[error("graph is in an invalid state")]
    InvalidGraph,
}

/// Errors from the WAV decoder.
#[derive(Debug, Error)]
pub enum WavError {
    #[error("missing RIFF header")]
    NotARiffFile,

    #[error("RIFF container does not hold WAVE data")]
    NotAWavFile,

    #[error("fmt subchunk length is not 16")]
    UnsupportedFormatLength,

    #[error("compressed WAV data is not supported")]
    CompressedWavFile,

    #[error("byte rate disagrees with sample rate and block alignment")]
    MismatchedByteRate,

    #[error("block alignment disagrees with channel count and sample width")]
    MismatchedBlockAlign,

    #[error("expected a data subchunk header")]
    InvalidDataHeader,

    #[error("unexpected end of stream")]
    UnexpectedEOF,

    #[error("unsupported bits per sample or channel count")]
    Unsupported,

    #[error("destination buffer is too small")]
    InsufficientBuffer,

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}
