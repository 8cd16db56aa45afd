//! Init segment assembly.
//!
//! Builds the `ftyp + moov` bytes that prime the decoder before any media
//! fragment. The moov carries a single fragmented video trak whose stsd is
//! the source's own, so codec configuration survives untouched, plus an
//! mvex announcing that timing lives in fragments.

use bytes::{BufMut, Bytes, BytesMut};

use super::boxes;
use crate::mp4::TrackInfo;

/// Generate the init segment for a video track.
///
/// Deterministic: repeated calls for the same track produce identical bytes.
pub fn write_init_segment(track: &TrackInfo) -> Bytes {
    let ftyp = boxes::write_ftyp();

    let tkhd = boxes::write_tkhd(
        1,
        track.width_fixed,
        track.height_fixed,
        track.volume,
        track.layer,
        track.alternate_group,
    );

    let mdhd = boxes::write_mdhd(track.timescale, track.language);
    let hdlr = boxes::write_hdlr(&track.handler_type.as_bytes(), &track.handler_name);

    let vmhd = boxes::write_vmhd();
    let dinf = boxes::write_dinf();
    let stbl = boxes::write_fragmented_stbl(&track.stsd);
    let minf = boxes::write_container_box(b"minf", &[&vmhd, &dinf, &stbl]);

    let mdia = boxes::write_container_box(b"mdia", &[&mdhd, &hdlr, &minf]);
    let trak = boxes::write_container_box(b"trak", &[&tkhd, &mdia]);

    let mvhd = boxes::write_mvhd(track.timescale);
    let mvex = boxes::write_mvex(1);
    let moov = boxes::write_container_box(b"moov", &[&mvhd, &trak, &mvex]);

    let mut out = BytesMut::with_capacity(ftyp.len() + moov.len());
    out.put_slice(&ftyp);
    out.put_slice(&moov);
    out.freeze()
}
