//! Fragmented MP4 (fMP4) serialization.
//!
//! - `boxes` - box-level encoders with exact size arithmetic
//! - `init` - init segment (ftyp + moov with mvex)
//! - `segment` - media segments (styp + moof + mdat)

pub(crate) mod boxes;
mod init;
mod segment;

pub use init::write_init_segment;
pub use segment::write_media_segment;
