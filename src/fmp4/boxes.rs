//! ISO BMFF box serialization primitives.
//!
//! Each box follows the standard layout: 4-byte size (big-endian u32),
//! 4-byte type (ASCII), then box-specific content. Sizes are computed
//! exactly at construction time; `trun.data_offset` depends on them.

/// Write a complete box: size (u32 BE) + type (4 ASCII bytes) + content.
pub(crate) fn write_box(box_type: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let size = (8 + content.len()) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(box_type);
    out.extend_from_slice(content);
    out
}

/// Write a container box (size + type + children concatenated).
pub(crate) fn write_container_box(box_type: &[u8; 4], children: &[&[u8]]) -> Vec<u8> {
    let children_len: usize = children.iter().map(|c| c.len()).sum();
    let size = (8 + children_len) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(box_type);
    for child in children {
        out.extend_from_slice(child);
    }
    out
}

/// Full box header (version + flags), big-endian packed.
pub(crate) fn fullbox_header(version: u8, flags: u32) -> [u8; 4] {
    let val = ((version as u32) << 24) | (flags & 0x00FFFFFF);
    val.to_be_bytes()
}

// ---------------------------------------------------------------------------
// ftyp / styp
// ---------------------------------------------------------------------------

/// `ftyp` for init segments: major brand "isom", minor 0x200, compatible
/// brands ["isom", "iso2", "avc1", "mp41"].
pub(crate) fn write_ftyp() -> Vec<u8> {
    let mut content = Vec::with_capacity(4 + 4 + 4 * 4);
    content.extend_from_slice(b"isom");
    content.extend_from_slice(&0x200u32.to_be_bytes());
    content.extend_from_slice(b"isom");
    content.extend_from_slice(b"iso2");
    content.extend_from_slice(b"avc1");
    content.extend_from_slice(b"mp41");
    write_box(b"ftyp", &content)
}

/// `styp` for media segments: major brand "msdh", minor 0, compatible
/// brands ["msdh", "msix"].
pub(crate) fn write_styp() -> Vec<u8> {
    let mut content = Vec::with_capacity(4 + 4 + 2 * 4);
    content.extend_from_slice(b"msdh");
    content.extend_from_slice(&0u32.to_be_bytes());
    content.extend_from_slice(b"msdh");
    content.extend_from_slice(b"msix");
    write_box(b"styp", &content)
}

// ---------------------------------------------------------------------------
// moov children for the init segment
// ---------------------------------------------------------------------------

/// `mvhd` for fragmented output: duration 0, next track ID 2.
pub(crate) fn write_mvhd(timescale: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(100);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&0u32.to_be_bytes()); // creation time
    content.extend_from_slice(&0u32.to_be_bytes()); // modification time
    content.extend_from_slice(&timescale.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes()); // duration lives in fragments
    content.extend_from_slice(&0x00010000u32.to_be_bytes()); // rate 1.0
    content.extend_from_slice(&0x0100u16.to_be_bytes()); // volume 1.0
    content.extend_from_slice(&[0u8; 10]); // reserved
    write_identity_matrix(&mut content);
    content.extend_from_slice(&[0u8; 24]); // pre_defined
    content.extend_from_slice(&2u32.to_be_bytes()); // next track ID
    write_box(b"mvhd", &content)
}

/// `tkhd` version 0, flags 3 (enabled + in movie), duration 0.
///
/// Width, height and volume are the source's fixed-point values, copied
/// through untouched.
pub(crate) fn write_tkhd(
    track_id: u32,
    width_fixed: u32,
    height_fixed: u32,
    volume: u16,
    layer: i16,
    alternate_group: i16,
) -> Vec<u8> {
    let mut content = Vec::with_capacity(84);
    content.extend_from_slice(&fullbox_header(0, 0x000003));
    content.extend_from_slice(&0u32.to_be_bytes()); // creation time
    content.extend_from_slice(&0u32.to_be_bytes()); // modification time
    content.extend_from_slice(&track_id.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes()); // reserved
    content.extend_from_slice(&0u32.to_be_bytes()); // duration lives in fragments
    content.extend_from_slice(&[0u8; 8]); // reserved
    content.extend_from_slice(&layer.to_be_bytes());
    content.extend_from_slice(&alternate_group.to_be_bytes());
    content.extend_from_slice(&volume.to_be_bytes());
    content.extend_from_slice(&0u16.to_be_bytes()); // reserved
    write_identity_matrix(&mut content);
    content.extend_from_slice(&width_fixed.to_be_bytes());
    content.extend_from_slice(&height_fixed.to_be_bytes());
    write_box(b"tkhd", &content)
}

/// `mdhd` version 0, duration 0, language copied from the source.
pub(crate) fn write_mdhd(timescale: u32, language: u16) -> Vec<u8> {
    let mut content = Vec::with_capacity(24);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&0u32.to_be_bytes()); // creation time
    content.extend_from_slice(&0u32.to_be_bytes()); // modification time
    content.extend_from_slice(&timescale.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes()); // duration
    content.extend_from_slice(&language.to_be_bytes());
    content.extend_from_slice(&0u16.to_be_bytes()); // pre_defined
    write_box(b"mdhd", &content)
}

/// `hdlr` with the source's handler type and name.
pub(crate) fn write_hdlr(handler_type: &[u8; 4], name: &str) -> Vec<u8> {
    let name = name.as_bytes();
    let mut content = Vec::with_capacity(24 + name.len() + 1);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&0u32.to_be_bytes()); // pre_defined
    content.extend_from_slice(handler_type);
    content.extend_from_slice(&[0u8; 12]); // reserved
    content.extend_from_slice(name);
    content.push(0);
    write_box(b"hdlr", &content)
}

/// `vmhd` with flags 1.
pub(crate) fn write_vmhd() -> Vec<u8> {
    let mut content = Vec::with_capacity(12);
    content.extend_from_slice(&fullbox_header(0, 1));
    content.extend_from_slice(&0u16.to_be_bytes()); // graphicsmode
    content.extend_from_slice(&[0u8; 6]); // opcolor
    write_box(b"vmhd", &content)
}

/// `dinf` > `dref` > `url ` with the self-contained flag.
pub(crate) fn write_dinf() -> Vec<u8> {
    let url_box = write_box(b"url ", &fullbox_header(0, 1));
    let dref_box = {
        let mut c = Vec::with_capacity(8 + url_box.len());
        c.extend_from_slice(&fullbox_header(0, 0));
        c.extend_from_slice(&1u32.to_be_bytes()); // entry count
        c.extend_from_slice(&url_box);
        write_box(b"dref", &c)
    };
    write_container_box(b"dinf", &[&dref_box])
}

fn write_empty_stts() -> Vec<u8> {
    let mut content = Vec::with_capacity(8);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&0u32.to_be_bytes()); // entry count
    write_box(b"stts", &content)
}

fn write_empty_stsc() -> Vec<u8> {
    let mut content = Vec::with_capacity(8);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&0u32.to_be_bytes()); // entry count
    write_box(b"stsc", &content)
}

fn write_empty_stsz() -> Vec<u8> {
    let mut content = Vec::with_capacity(12);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&0u32.to_be_bytes()); // sample size
    content.extend_from_slice(&0u32.to_be_bytes()); // sample count
    write_box(b"stsz", &content)
}

fn write_empty_stco() -> Vec<u8> {
    let mut content = Vec::with_capacity(8);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&0u32.to_be_bytes()); // entry count
    write_box(b"stco", &content)
}

/// `stbl` for the init segment: the source's stsd verbatim, then the empty
/// tables fragmented MP4 requires.
pub(crate) fn write_fragmented_stbl(raw_stsd: &[u8]) -> Vec<u8> {
    let stts = write_empty_stts();
    let stsc = write_empty_stsc();
    let stsz = write_empty_stsz();
    let stco = write_empty_stco();
    write_container_box(b"stbl", &[raw_stsd, &stts, &stsc, &stsz, &stco])
}

/// `trex` declaring per-sample defaults of zero; trun carries everything.
pub(crate) fn write_trex(track_id: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(24);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&track_id.to_be_bytes());
    content.extend_from_slice(&1u32.to_be_bytes()); // default sample description index
    content.extend_from_slice(&0u32.to_be_bytes()); // default sample duration
    content.extend_from_slice(&0u32.to_be_bytes()); // default sample size
    content.extend_from_slice(&0u32.to_be_bytes()); // default sample flags
    write_box(b"trex", &content)
}

/// `mvex` container.
pub(crate) fn write_mvex(track_id: u32) -> Vec<u8> {
    let trex = write_trex(track_id);
    write_container_box(b"mvex", &[&trex])
}

fn write_identity_matrix(content: &mut Vec<u8>) {
    content.extend_from_slice(&0x00010000u32.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes());
    content.extend_from_slice(&0x00010000u32.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes());
    content.extend_from_slice(&0x40000000u32.to_be_bytes());
}

// ---------------------------------------------------------------------------
// moof boxes (movie fragment)
// ---------------------------------------------------------------------------

/// Sample flag value for sync samples.
pub(crate) const SAMPLE_FLAGS_SYNC: u32 = 0x0200_0000;

/// Sample flag value for non-sync samples (depends on others, non-sync bit).
pub(crate) const SAMPLE_FLAGS_NON_SYNC: u32 = 0x0101_0000;

/// `mfhd` (movie fragment header).
pub(crate) fn write_mfhd(sequence_number: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(8);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&sequence_number.to_be_bytes());
    write_box(b"mfhd", &content)
}

/// `tfhd` with the default-base-is-moof flag (0x020000).
pub(crate) fn write_tfhd(track_id: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(8);
    content.extend_from_slice(&fullbox_header(0, 0x020000));
    content.extend_from_slice(&track_id.to_be_bytes());
    write_box(b"tfhd", &content)
}

/// `tfdt` (track fragment decode time, version 1 for 64-bit).
pub(crate) fn write_tfdt(base_media_decode_time: u64) -> Vec<u8> {
    let mut content = Vec::with_capacity(12);
    content.extend_from_slice(&fullbox_header(1, 0));
    content.extend_from_slice(&base_media_decode_time.to_be_bytes());
    write_box(b"tfdt", &content)
}

/// A single sample's trun entry.
pub(crate) struct TrunSample {
    pub duration: u32,
    pub size: u32,
    pub flags: u32,
    pub composition_time_offset: i32,
}

/// Flags: data-offset (0x000001) + sample-duration (0x000100) +
/// sample-size (0x000200) + sample-flags (0x000400) +
/// sample-composition-time-offset (0x000800).
const TRUN_FLAGS: u32 = 0x000F01;

/// Exact serialized size of a trun box holding `sample_count` entries.
pub(crate) fn trun_size(sample_count: usize) -> usize {
    // header(8) + fullbox(4) + sample_count(4) + data_offset(4) + entries * 16
    8 + 4 + 4 + 4 + sample_count * 16
}

/// `trun` (track run), version 0, one 16-byte entry per sample.
///
/// `data_offset` is measured from the first byte of the enclosing moof to
/// the first sample byte in mdat.
pub(crate) fn write_trun(samples: &[TrunSample], data_offset: i32) -> Vec<u8> {
    let mut content = Vec::with_capacity(trun_size(samples.len()) - 8);
    content.extend_from_slice(&fullbox_header(0, TRUN_FLAGS));
    content.extend_from_slice(&(samples.len() as u32).to_be_bytes());
    content.extend_from_slice(&data_offset.to_be_bytes());
    for s in samples {
        content.extend_from_slice(&s.duration.to_be_bytes());
        content.extend_from_slice(&s.size.to_be_bytes());
        content.extend_from_slice(&s.flags.to_be_bytes());
        content.extend_from_slice(&s.composition_time_offset.to_be_bytes());
    }
    write_box(b"trun", &content)
}

/// `mdat` header for the given payload size; 16 bytes with a 64-bit
/// largesize when the payload plus normal header overflows u32.
pub(crate) fn write_mdat_header(data_size: u64) -> Vec<u8> {
    if data_size + 8 > u32::MAX as u64 {
        let mut hdr = Vec::with_capacity(16);
        hdr.extend_from_slice(&1u32.to_be_bytes());
        hdr.extend_from_slice(b"mdat");
        hdr.extend_from_slice(&(data_size + 16).to_be_bytes());
        hdr
    } else {
        let mut hdr = Vec::with_capacity(8);
        hdr.extend_from_slice(&((data_size + 8) as u32).to_be_bytes());
        hdr.extend_from_slice(b"mdat");
        hdr
    }
}
