//! HLS playlist generation.

use std::fmt::Write;

use super::{VideoParams, REPRESENTATION_BANDWIDTH};

/// Generate the HLS master playlist: a single variant pointing at
/// `media.m3u8`, advertising the source's own resolution and codec.
pub fn hls_master_playlist(params: &VideoParams) -> String {
    let mut playlist = String::new();

    writeln!(playlist, "#EXTM3U").unwrap();
    writeln!(playlist, "#EXT-X-VERSION:6").unwrap();
    writeln!(playlist).unwrap();

    writeln!(
        playlist,
        "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{},CODECS=\"{}\"",
        REPRESENTATION_BANDWIDTH,
        params.width,
        params.height,
        params.codec_or_default()
    )
    .unwrap();
    writeln!(playlist, "media.m3u8").unwrap();

    playlist
}

/// Generate the HLS media playlist.
///
/// Every segment lasts `segment_duration_secs` except the last, which gets
/// whatever remains; the EXTINF values sum to the total duration exactly
/// (modulo formatting).
pub fn hls_media_playlist(
    duration_secs: f64,
    segment_duration_secs: u64,
    segment_count: u64,
) -> String {
    let mut playlist = String::new();

    writeln!(playlist, "#EXTM3U").unwrap();
    writeln!(playlist, "#EXT-X-VERSION:6").unwrap();
    writeln!(playlist, "#EXT-X-TARGETDURATION:{segment_duration_secs}").unwrap();
    writeln!(playlist, "#EXT-X-MEDIA-SEQUENCE:0").unwrap();
    writeln!(playlist, "#EXT-X-PLAYLIST-TYPE:VOD").unwrap();
    writeln!(playlist, "#EXT-X-MAP:URI=\"init.mp4\"").unwrap();
    writeln!(playlist).unwrap();

    let mut remaining = duration_secs;
    for i in 0..segment_count {
        let seg_dur = (segment_duration_secs as f64).min(remaining);
        writeln!(playlist, "#EXTINF:{seg_dur:.6},").unwrap();
        writeln!(playlist, "segment_{i}.m4s").unwrap();
        remaining -= seg_dur;
    }

    writeln!(playlist, "#EXT-X-ENDLIST").unwrap();
    playlist
}
