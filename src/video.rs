//! Opened source videos.
//!
//! A [`Video`] pairs the open file handle with the parsed container
//! metadata. The box tree is parsed once at open time and immutable
//! afterwards; the file handle is shared by every concurrent segment build,
//! so reads go through a mutex that keeps each seek/read pair atomic.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::mp4::{codec_string, Mp4Reader, TrackInfo};

/// An opened and parsed MP4 source.
pub struct Video {
    path: PathBuf,
    file: Mutex<File>,
    movie_timescale: u32,
    movie_duration: u64,
    video: TrackInfo,
    audio: Option<TrackInfo>,
    codec: String,
}

impl Video {
    /// Open and parse a source file.
    ///
    /// Rejects sources without a moov box, without a video track, or with a
    /// zero video timescale.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|e| Error::parse(format!("cannot open {}: {e}", path.display())))?;

        let mp4 = Mp4Reader::new(&mut file).parse()?;

        let video = mp4
            .video_track
            .ok_or_else(|| Error::parse(format!("no video track in {}", path.display())))?;
        if video.timescale == 0 {
            return Err(Error::parse(format!(
                "video track in {} has zero timescale",
                path.display()
            )));
        }

        let codec = codec_string(&video.stsd);

        tracing::info!(
            path = %path.display(),
            timescale = video.timescale,
            duration_secs = video.duration_secs(),
            width = video.width(),
            height = video.height(),
            codec = %codec,
            "opened video"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            movie_timescale: mp4.timescale,
            movie_duration: mp4.duration,
            video,
            audio: mp4.audio_track,
            codec,
        })
    }

    /// Source file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The video track.
    pub fn video_track(&self) -> &TrackInfo {
        &self.video
    }

    /// The audio track, if the source carries one. Output is video-only;
    /// this is informational.
    pub fn audio_track(&self) -> Option<&TrackInfo> {
        self.audio.as_ref()
    }

    /// Video track timescale (ticks per second).
    pub fn timescale(&self) -> u32 {
        self.video.timescale
    }

    /// Video track duration in timescale ticks.
    pub fn duration(&self) -> u64 {
        self.video.duration
    }

    /// Video track duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.video.duration_secs()
    }

    /// Movie timescale from mvhd.
    pub fn movie_timescale(&self) -> u32 {
        self.movie_timescale
    }

    /// Movie duration in movie timescale ticks.
    pub fn movie_duration(&self) -> u64 {
        self.movie_duration
    }

    /// Display width in pixels.
    pub fn width(&self) -> u32 {
        self.video.width()
    }

    /// Display height in pixels.
    pub fn height(&self) -> u32 {
        self.video.height()
    }

    /// Manifest-grade codec string.
    pub fn codec(&self) -> &str {
        &self.codec
    }

    /// Read `size` bytes of sample data at the given absolute offset.
    ///
    /// The handle mutex serializes the seek/read pair, so concurrent
    /// segment builds on the same source never tear each other's reads.
    pub fn read_sample(&self, offset: u64, size: u32) -> Result<Vec<u8>> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; size as usize];
        file.read_exact(&mut data)?;
        Ok(data)
    }
}

impl std::fmt::Debug for Video {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Video")
            .field("path", &self.path)
            .field("timescale", &self.video.timescale)
            .field("duration", &self.video.duration)
            .field("codec", &self.codec)
            .finish()
    }
}
