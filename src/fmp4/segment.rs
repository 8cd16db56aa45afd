//! Media segment assembly.
//!
//! Builds one self-contained `styp + moof + mdat` fragment for a segment
//! index. Sample timing, sizes, flags and composition offsets come from the
//! source's sample tables; payload bytes are read from the source file in
//! sample order.
//!
//! The moof size is computed from the fixed box layouts before anything is
//! serialized, so `trun.data_offset` is right the first time. Invariant:
//! measured from the first byte of moof, `data_offset` lands exactly on the
//! first sample byte inside mdat.

use bytes::{BufMut, Bytes, BytesMut};

use super::boxes::{self, TrunSample, SAMPLE_FLAGS_NON_SYNC, SAMPLE_FLAGS_SYNC};
use crate::error::{Error, Result};
use crate::video::Video;

/// Fallback sample duration when stts does not cover a sample.
const FALLBACK_SAMPLE_DURATION: u32 = 1024;

/// Generate the media segment with the given index.
///
/// Segment `i` covers decode times `[i*D*ts, min((i+1)*D*ts, duration))`.
/// Returns [`Error::EmptySegment`] when that window holds no samples.
pub fn write_media_segment(
    video: &Video,
    segment_duration_secs: u64,
    index: u32,
) -> Result<Bytes> {
    let track = video.video_track();
    let table = &track.sample_table;

    let seg_dur_ticks = segment_duration_secs * track.timescale as u64;
    let start = index as u64 * seg_dur_ticks;
    let end = (start + seg_dur_ticks).min(track.duration);
    if start >= end {
        return Err(Error::EmptySegment { index });
    }

    let range = table.sample_range(start, end)?;
    if range.is_empty() {
        return Err(Error::EmptySegment { index });
    }

    // Per-sample trun entries and the mdat payload, in decode order.
    let mut samples = Vec::with_capacity(range.len() as usize);
    let mut payload = BytesMut::new();

    for n in range.first..range.last {
        let size = table.size(n)?;
        samples.push(TrunSample {
            duration: table.duration(n).unwrap_or(FALLBACK_SAMPLE_DURATION),
            size,
            flags: if table.is_sync(n) {
                SAMPLE_FLAGS_SYNC
            } else {
                SAMPLE_FLAGS_NON_SYNC
            },
            composition_time_offset: table.composition_offset(n),
        });

        let offset = table.file_offset(n)?;
        let data = video.read_sample(offset, size)?;
        payload.put_slice(&data);
    }

    let styp = boxes::write_styp();
    let mfhd = boxes::write_mfhd(index + 1);
    let tfhd = boxes::write_tfhd(1);
    let tfdt = boxes::write_tfdt(start);

    // moof = header + mfhd + traf(header + tfhd + tfdt + trun).
    let traf_size = 8 + tfhd.len() + tfdt.len() + boxes::trun_size(samples.len());
    let moof_size = 8 + mfhd.len() + traf_size;

    let mdat_header = boxes::write_mdat_header(payload.len() as u64);
    let data_offset = (moof_size + mdat_header.len()) as i32;

    let trun = boxes::write_trun(&samples, data_offset);
    let traf = boxes::write_container_box(b"traf", &[&tfhd, &tfdt, &trun]);
    let moof = boxes::write_container_box(b"moof", &[&mfhd, &traf]);
    debug_assert_eq!(moof.len(), moof_size);

    tracing::debug!(
        index,
        first = range.first,
        last = range.last,
        bytes = payload.len(),
        "built media segment"
    );

    let mut out =
        BytesMut::with_capacity(styp.len() + moof.len() + mdat_header.len() + payload.len());
    out.put_slice(&styp);
    out.put_slice(&moof);
    out.put_slice(&mdat_header);
    out.put_slice(&payload);
    Ok(out.freeze())
}
