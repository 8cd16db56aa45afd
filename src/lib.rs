//! jitstream: just-in-time fMP4 segmentation for HLS and MPEG-DASH.
//!
//! Serves VOD streams straight from unmodified progressive MP4 files with no
//! pre-packaging step and no on-disk segment cache. When a player asks for
//! `segment_37.m4s`, the segmenter reads the source's sample tables, finds
//! the samples whose decode times fall in that window, and emits a
//! self-contained `styp/moof/mdat` fragment consistent with a minimal init
//! segment it can also produce on demand.
//!
//! # Modules
//!
//! - `mp4` - container parsing (box tree, sample tables, codec string)
//! - `fmp4` - fragmented MP4 serialization (init + media segments)
//! - `manifest` - HLS playlists and the DASH MPD
//! - `cache` / `video` - opened-source handles and the path-keyed cache
//!
//! # Architecture
//!
//! All builders are pure functions of a parsed [`Video`] (plus a segment
//! index); the [`VideoCache`] is the only shared mutable state. A request
//! flows: path → cache (parse on miss) → sample index → init/segment/
//! manifest builder → bytes or text. Identical inputs always produce
//! identical bytes, so segment responses are content-addressable.

pub mod cache;
pub mod config;
pub mod error;
pub mod fmp4;
pub mod manifest;
pub mod mp4;
pub mod video;

pub use cache::VideoCache;
pub use config::StreamingConfig;
pub use error::{Error, Result};
pub use manifest::VideoParams;
pub use video::Video;

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

/// The just-in-time segmenter service.
///
/// Owns the video cache and the per-instance segment duration; every
/// operation the HTTP layer needs funnels through here.
#[derive(Debug)]
pub struct Segmenter {
    cache: VideoCache,
    segment_duration_secs: u64,
}

impl Segmenter {
    /// Create a segmenter with the given configuration.
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            cache: VideoCache::new(),
            segment_duration_secs: config.segment_duration_secs,
        }
    }

    /// Target segment duration in seconds.
    pub fn segment_duration_secs(&self) -> u64 {
        self.segment_duration_secs
    }

    /// The underlying video cache.
    pub fn cache(&self) -> &VideoCache {
        &self.cache
    }

    /// Open a source, reusing the cached parse when present.
    pub fn open_video(&self, path: impl AsRef<Path>) -> Result<Arc<Video>> {
        self.cache.open(path)
    }

    /// Source duration in seconds.
    pub fn duration_secs(&self, video: &Video) -> f64 {
        video.duration_secs()
    }

    /// Number of media segments the source divides into (ceiling).
    pub fn segment_count(&self, video: &Video) -> u64 {
        let timescale = video.timescale() as u64;
        if timescale == 0 {
            return 0;
        }
        let seg_dur_ticks = self.segment_duration_secs * timescale;
        video.duration().div_ceil(seg_dur_ticks)
    }

    /// Generate the init segment (`ftyp + moov`).
    pub fn init_segment(&self, video: &Video) -> Bytes {
        fmp4::write_init_segment(video.video_track())
    }

    /// Generate the media segment with the given index
    /// (`styp + moof + mdat`).
    pub fn media_segment(&self, video: &Video, index: u32) -> Result<Bytes> {
        fmp4::write_media_segment(video, self.segment_duration_secs, index)
    }

    /// Generate the HLS master playlist.
    pub fn hls_master(&self, video: &Video) -> String {
        manifest::hls_master_playlist(&VideoParams::from_video(video))
    }

    /// Generate the HLS media playlist.
    pub fn hls_media(&self, video: &Video) -> String {
        manifest::hls_media_playlist(
            video.duration_secs(),
            self.segment_duration_secs,
            self.segment_count(video),
        )
    }

    /// Generate the DASH MPD.
    pub fn dash_mpd(&self, video: &Video) -> String {
        manifest::dash_mpd(
            &VideoParams::from_video(video),
            video.duration(),
            self.segment_duration_secs,
            self.segment_count(video),
        )
    }

    /// Close every cached source.
    pub fn close(&self) {
        self.cache.close();
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(StreamingConfig::default())
    }
}

/// Parse a segment index out of a `segment_<N>.m4s` request name.
///
/// Anything that does not match the pattern is `None`; callers should treat
/// that as a bad request rather than serving a default segment.
pub fn segment_index_from_name(name: &str) -> Option<u32> {
    name.strip_prefix("segment_")?
        .strip_suffix(".m4s")?
        .parse()
        .ok()
}
