//! MP4 container parsing.
//!
//! Reads the moov box tree of a progressive MP4 and exposes the track
//! metadata and sample tables the segmenter needs. The source file is only
//! ever read; nothing here mutates it.

pub mod atoms;
pub mod codec;
pub mod reader;
pub mod sample_table;

pub use atoms::{Atom, AtomType, HandlerType, TrackInfo};
pub use codec::{codec_string, DEFAULT_VIDEO_CODEC};
pub use reader::Mp4Reader;
pub use sample_table::{SampleRange, SampleTable, SampleTableBuilder};

/// Parsed movie-level metadata plus the tracks of interest.
#[derive(Debug, Clone)]
pub struct Mp4File {
    /// Movie timescale from mvhd.
    pub timescale: u32,
    /// Movie duration in movie timescale ticks.
    pub duration: u64,
    /// First video track, if any.
    pub video_track: Option<TrackInfo>,
    /// First audio track, if any. Parsed for completeness; the segmenter
    /// emits video-only output.
    pub audio_track: Option<TrackInfo>,
}
