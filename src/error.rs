//! Error types for jitstream.

use std::io;
use thiserror::Error;

/// Result type for jitstream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type covering every failure mode of the segmenter core.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading the source file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or unusable MP4 structure.
    #[error("Invalid MP4: {0}")]
    Parse(String),

    /// A box required by the requested operation is missing.
    #[error("Missing required box: {0}")]
    MissingBox(&'static str),

    /// A sample number fell outside the track's sample tables.
    #[error("Sample {sample} out of range (track has {count})")]
    SampleOutOfRange { sample: u32, count: u32 },

    /// A chunk referenced by stsc has no stco/co64 offset entry.
    #[error("Chunk {chunk} has no offset entry")]
    ChunkOffsetMissing { chunk: u32 },

    /// The requested segment index maps to no samples.
    #[error("Segment {index} contains no samples")]
    EmptySegment { index: u32 },

    /// Invalid service configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Status-code hint for an HTTP caller.
    ///
    /// The core never touches HTTP itself; this keeps the mapping next to
    /// the error definitions so callers agree on it.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Parse(_) | Self::MissingBox(_) => 404,
            Self::EmptySegment { .. } => 400,
            Self::Io(_)
            | Self::SampleOutOfRange { .. }
            | Self::ChunkOffsetMissing { .. }
            | Self::Config(_) => 500,
        }
    }
}
