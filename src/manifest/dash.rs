//! DASH MPD generation.

use std::fmt::Write;

use super::{VideoParams, REPRESENTATION_BANDWIDTH};

/// Generate a static single-period MPD with one video representation.
///
/// The SegmentTimeline is derived from integer track ticks, so its `<S>`
/// durations sum to `track_duration` exactly.
pub fn dash_mpd(
    params: &VideoParams,
    track_duration: u64,
    segment_duration_secs: u64,
    segment_count: u64,
) -> String {
    let duration_secs = if params.timescale == 0 {
        0.0
    } else {
        track_duration as f64 / params.timescale as f64
    };

    let mut timeline = String::new();
    let seg_dur_ticks = segment_duration_secs * params.timescale as u64;
    let mut remaining = track_duration;
    for i in 0..segment_count {
        let d = seg_dur_ticks.min(remaining);
        if i == 0 {
            write!(timeline, "            <S t=\"0\" d=\"{d}\"/>").unwrap();
        } else {
            write!(timeline, "\n            <S d=\"{d}\"/>").unwrap();
        }
        remaining -= d;
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"
     xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
     xsi:schemaLocation="urn:mpeg:dash:schema:mpd:2011 DASH-MPD.xsd"
     type="static"
     mediaPresentationDuration="{duration}"
     minBufferTime="PT2S"
     profiles="urn:mpeg:dash:profile:isoff-on-demand:2011">
  <Period id="0" start="PT0S">
    <AdaptationSet id="0" contentType="video" mimeType="video/mp4" segmentAlignment="true" bitstreamSwitching="true">
      <Representation id="video" codecs="{codec}"
                      bandwidth="{bandwidth}" width="{width}" height="{height}">
        <SegmentTemplate timescale="{timescale}"
                         initialization="init.mp4"
                         media="segment_$Number$.m4s"
                         startNumber="0">
          <SegmentTimeline>
{timeline}
          </SegmentTimeline>
        </SegmentTemplate>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#,
        duration = format_pt_duration(duration_secs),
        codec = params.codec_or_default(),
        bandwidth = REPRESENTATION_BANDWIDTH,
        width = params.width,
        height = params.height,
        timescale = params.timescale,
        timeline = timeline,
    )
}

/// Format seconds as an ISO-8601 presentation duration.
///
/// Hour and minute fields appear only when non-zero above them; seconds
/// always carry three fractional digits.
pub(crate) fn format_pt_duration(duration_secs: f64) -> String {
    let whole = duration_secs as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let seconds = duration_secs - (hours * 3600 + minutes * 60) as f64;

    if hours > 0 {
        format!("PT{hours}H{minutes}M{seconds:.3}S")
    } else if minutes > 0 {
        format!("PT{minutes}M{seconds:.3}S")
    } else {
        format!("PT{seconds:.3}S")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> VideoParams {
        VideoParams {
            codec: "avc1.64001f".to_string(),
            width: 1280,
            height: 720,
            timescale: 1000,
        }
    }

    #[test]
    fn test_pt_duration_formats() {
        assert_eq!(format_pt_duration(10.0), "PT10.000S");
        assert_eq!(format_pt_duration(61.0), "PT1M1.000S");
        assert_eq!(format_pt_duration(3661.5), "PT1H1M1.500S");
        assert_eq!(format_pt_duration(7200.0), "PT2H0M0.000S");
        assert_eq!(format_pt_duration(0.25), "PT0.250S");
    }

    #[test]
    fn test_mpd_timeline_short_final_segment() {
        let mpd = dash_mpd(&params(), 10_000, 4, 3);
        assert!(mpd.contains("mediaPresentationDuration=\"PT10.000S\""));
        assert!(mpd.contains("<S t=\"0\" d=\"4000\"/>"));
        assert!(mpd.contains("<S d=\"2000\"/>"));
        assert!(mpd.contains("timescale=\"1000\""));
        assert!(mpd.contains("media=\"segment_$Number$.m4s\""));
        assert!(mpd.contains("startNumber=\"0\""));
        assert!(mpd.contains("initialization=\"init.mp4\""));
    }

    #[test]
    fn test_mpd_timeline_ticks_sum_exactly() {
        // 10.001 s at 90 kHz does not divide evenly into 4 s segments.
        let mut p = params();
        p.timescale = 90_000;
        let track_duration = 900_090u64;
        let mpd = dash_mpd(&p, track_duration, 4, 3);

        let sum: u64 = mpd
            .lines()
            .filter_map(|l| {
                let l = l.trim();
                l.strip_prefix("<S ")
                    .and_then(|r| r.split("d=\"").nth(1))
                    .and_then(|r| r.split('"').next())
                    .map(|d| d.parse::<u64>().unwrap())
            })
            .sum();
        assert_eq!(sum, track_duration);
    }

    #[test]
    fn test_mpd_attributes() {
        let mpd = dash_mpd(&params(), 8_000, 4, 2);
        assert!(mpd.contains("type=\"static\""));
        assert!(mpd.contains("contentType=\"video\""));
        assert!(mpd.contains("mimeType=\"video/mp4\""));
        assert!(mpd.contains("segmentAlignment=\"true\""));
        assert!(mpd.contains("bitstreamSwitching=\"true\""));
        assert!(mpd.contains("codecs=\"avc1.64001f\""));
        assert!(mpd.contains("bandwidth=\"5000000\""));
        assert!(mpd.contains("width=\"1280\" height=\"720\""));
        // Exactly divisible: two equal entries, no zero-length third.
        assert!(mpd.contains("<S t=\"0\" d=\"4000\"/>"));
        assert_eq!(mpd.matches("<S ").count(), 2);
    }
}
