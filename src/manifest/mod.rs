//! Manifest generation for HLS and MPEG-DASH.
//!
//! Both formats describe the exact same segmentation the fMP4 builders
//! produce: fixed-duration segments with a short final one. The timing here
//! must stay in lockstep with the segmenter's window arithmetic.

pub mod dash;
pub mod hls;

pub use dash::dash_mpd;
pub use hls::{hls_master_playlist, hls_media_playlist};

use crate::mp4::DEFAULT_VIDEO_CODEC;
use crate::video::Video;

/// Advertised bandwidth for the single representation, in bits per second.
pub const REPRESENTATION_BANDWIDTH: u32 = 5_000_000;

/// Video parameters the manifests advertise.
#[derive(Debug, Clone)]
pub struct VideoParams {
    /// Codec string for CODECS / codecs attributes.
    pub codec: String,
    /// Display width in pixels.
    pub width: u32,
    /// Display height in pixels.
    pub height: u32,
    /// Track timescale (ticks per second).
    pub timescale: u32,
}

impl VideoParams {
    /// Extract the advertised parameters from an opened video.
    pub fn from_video(video: &Video) -> Self {
        Self {
            codec: video.codec().to_string(),
            width: video.width(),
            height: video.height(),
            timescale: video.timescale(),
        }
    }

    /// The codec string, falling back to the default when empty.
    pub(crate) fn codec_or_default(&self) -> &str {
        if self.codec.is_empty() {
            DEFAULT_VIDEO_CODEC
        } else {
            &self.codec
        }
    }
}
