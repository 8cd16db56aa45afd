//! Shared fixtures for integration tests.
//!
//! Builds small but structurally complete progressive MP4 files in memory:
//! ftyp, then mdat, then moov (mdat-first so chunk offsets are known before
//! the moov is assembled). Sample `n`'s payload is `size(n)` copies of the
//! byte `n & 0xFF`, which lets round-trip tests verify mdat contents.

// Each integration test binary compiles its own copy; not every helper is
// used from every binary.
#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

/// Shape of a synthetic MP4 source.
pub struct FixtureSpec {
    /// Media timescale (ticks per second).
    pub timescale: u32,
    /// stts entries as (sample_count, sample_delta).
    pub stts: Vec<(u32, u32)>,
    /// Per-sample sizes; length is the sample count.
    pub sizes: Vec<u32>,
    /// Sync sample numbers; None omits the stss box entirely.
    pub stss: Option<Vec<u32>>,
    /// ctts entries as (sample_count, offset); None omits the box.
    pub ctts: Option<Vec<(u32, i32)>>,
    /// Emit co64 instead of stco.
    pub use_co64: bool,
    /// Samples per chunk; 0 puts everything in one chunk.
    pub samples_per_chunk: u32,
    /// First SPS NAL for the avcC box.
    pub sps: Vec<u8>,
    /// Display dimensions.
    pub width: u16,
    pub height: u16,
    /// mdhd duration override; defaults to the stts tick sum.
    pub duration: Option<u64>,
}

impl Default for FixtureSpec {
    fn default() -> Self {
        // 10 one-second samples at timescale 1000: a 10 s source.
        Self {
            timescale: 1000,
            stts: vec![(10, 1000)],
            sizes: (1..=10).map(|i| i * 100).collect(),
            stss: None,
            ctts: None,
            use_co64: false,
            samples_per_chunk: 0,
            sps: vec![0x67, 0x64, 0x00, 0x1F],
            width: 1280,
            height: 720,
            duration: None,
        }
    }
}

impl FixtureSpec {
    /// Total sample count.
    pub fn sample_count(&self) -> u32 {
        self.sizes.len() as u32
    }

    /// The concatenated mdat payload this fixture carries.
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        for (i, &size) in self.sizes.iter().enumerate() {
            let n = (i + 1) as u8;
            payload.extend(std::iter::repeat(n).take(size as usize));
        }
        payload
    }

    /// Serialize the fixture to MP4 bytes.
    pub fn build(&self) -> Vec<u8> {
        let ftyp = {
            let mut c = Vec::new();
            c.extend_from_slice(b"isom");
            c.extend_from_slice(&0x200u32.to_be_bytes());
            c.extend_from_slice(b"isomiso2avc1mp41");
            write_box(b"ftyp", &c)
        };

        let payload = self.payload();
        let mdat = write_box(b"mdat", &payload);
        let payload_offset = (ftyp.len() + 8) as u64;

        let moov = self.build_moov(payload_offset);

        let mut out = ftyp;
        out.extend_from_slice(&mdat);
        out.extend_from_slice(&moov);
        out
    }

    /// Write the fixture into a temp dir and return (guard, path).
    pub fn write_to_temp(&self) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("source.mp4");
        std::fs::write(&path, self.build()).expect("write fixture");
        (dir, path)
    }

    fn build_moov(&self, payload_offset: u64) -> Vec<u8> {
        let duration = self
            .duration
            .unwrap_or_else(|| self.stts.iter().map(|&(c, d)| c as u64 * d as u64).sum());

        let mvhd = {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&[0u8; 8]); // creation + modification
            c.extend_from_slice(&self.timescale.to_be_bytes());
            c.extend_from_slice(&(duration as u32).to_be_bytes());
            c.extend_from_slice(&0x00010000u32.to_be_bytes()); // rate
            c.extend_from_slice(&0x0100u16.to_be_bytes()); // volume
            c.extend_from_slice(&[0u8; 10]);
            c.extend_from_slice(&identity_matrix());
            c.extend_from_slice(&[0u8; 24]);
            c.extend_from_slice(&2u32.to_be_bytes()); // next track id
            write_box(b"mvhd", &c)
        };

        let tkhd = {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 3));
            c.extend_from_slice(&[0u8; 8]); // creation + modification
            c.extend_from_slice(&1u32.to_be_bytes()); // track id
            c.extend_from_slice(&0u32.to_be_bytes()); // reserved
            c.extend_from_slice(&(duration as u32).to_be_bytes());
            c.extend_from_slice(&[0u8; 8]); // reserved
            c.extend_from_slice(&[0u8; 8]); // layer, alt group, volume, reserved
            c.extend_from_slice(&identity_matrix());
            c.extend_from_slice(&((self.width as u32) << 16).to_be_bytes());
            c.extend_from_slice(&((self.height as u32) << 16).to_be_bytes());
            write_box(b"tkhd", &c)
        };

        let mdhd = {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&[0u8; 8]);
            c.extend_from_slice(&self.timescale.to_be_bytes());
            c.extend_from_slice(&(duration as u32).to_be_bytes());
            c.extend_from_slice(&0x55C4u16.to_be_bytes()); // und
            c.extend_from_slice(&0u16.to_be_bytes());
            write_box(b"mdhd", &c)
        };

        let hdlr = {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&0u32.to_be_bytes());
            c.extend_from_slice(b"vide");
            c.extend_from_slice(&[0u8; 12]);
            c.extend_from_slice(b"VideoHandler\0");
            write_box(b"hdlr", &c)
        };

        let vmhd = {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 1));
            c.extend_from_slice(&[0u8; 8]);
            write_box(b"vmhd", &c)
        };

        let dinf = {
            let url = write_box(b"url ", &fullbox(0, 1));
            let mut dref = Vec::new();
            dref.extend_from_slice(&fullbox(0, 0));
            dref.extend_from_slice(&1u32.to_be_bytes());
            dref.extend_from_slice(&url);
            let dref = write_box(b"dref", &dref);
            write_box(b"dinf", &dref)
        };

        let stbl = self.build_stbl(payload_offset);
        let minf = concat_boxes(b"minf", &[&vmhd, &dinf, &stbl]);
        let mdia = concat_boxes(b"mdia", &[&mdhd, &hdlr, &minf]);
        let trak = concat_boxes(b"trak", &[&tkhd, &mdia]);
        concat_boxes(b"moov", &[&mvhd, &trak])
    }

    fn build_stbl(&self, payload_offset: u64) -> Vec<u8> {
        let stsd = self.build_stsd();

        let stts = {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&(self.stts.len() as u32).to_be_bytes());
            for &(count, delta) in &self.stts {
                c.extend_from_slice(&count.to_be_bytes());
                c.extend_from_slice(&delta.to_be_bytes());
            }
            write_box(b"stts", &c)
        };

        let count = self.sample_count();
        let spc = if self.samples_per_chunk == 0 {
            count.max(1)
        } else {
            self.samples_per_chunk
        };
        let num_chunks = count.div_ceil(spc).max(1);

        let stsc = {
            let mut entries: Vec<(u32, u32)> = vec![(1, spc)];
            let remainder = count % spc;
            if remainder != 0 && num_chunks > 1 {
                entries.push((num_chunks, remainder));
            }
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&(entries.len() as u32).to_be_bytes());
            for (first_chunk, samples) in entries {
                c.extend_from_slice(&first_chunk.to_be_bytes());
                c.extend_from_slice(&samples.to_be_bytes());
                c.extend_from_slice(&1u32.to_be_bytes());
            }
            write_box(b"stsc", &c)
        };

        let stsz = {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&0u32.to_be_bytes()); // per-sample sizes
            c.extend_from_slice(&count.to_be_bytes());
            for &size in &self.sizes {
                c.extend_from_slice(&size.to_be_bytes());
            }
            write_box(b"stsz", &c)
        };

        // Chunk offsets from cumulative sample sizes.
        let mut chunk_offsets = Vec::with_capacity(num_chunks as usize);
        let mut offset = payload_offset;
        for chunk in 0..num_chunks {
            chunk_offsets.push(offset);
            let start = (chunk * spc) as usize;
            let end = ((chunk + 1) * spc).min(count) as usize;
            offset += self.sizes[start..end].iter().map(|&s| s as u64).sum::<u64>();
        }

        let chunk_offset_box = if self.use_co64 {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&(chunk_offsets.len() as u32).to_be_bytes());
            for o in &chunk_offsets {
                c.extend_from_slice(&o.to_be_bytes());
            }
            write_box(b"co64", &c)
        } else {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&(chunk_offsets.len() as u32).to_be_bytes());
            for o in &chunk_offsets {
                c.extend_from_slice(&(*o as u32).to_be_bytes());
            }
            write_box(b"stco", &c)
        };

        let mut children: Vec<Vec<u8>> = vec![stsd, stts];

        if let Some(sync) = &self.stss {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&(sync.len() as u32).to_be_bytes());
            for s in sync {
                c.extend_from_slice(&s.to_be_bytes());
            }
            children.push(write_box(b"stss", &c));
        }

        if let Some(ctts) = &self.ctts {
            let mut c = Vec::new();
            c.extend_from_slice(&fullbox(0, 0));
            c.extend_from_slice(&(ctts.len() as u32).to_be_bytes());
            for &(count, cto) in ctts {
                c.extend_from_slice(&count.to_be_bytes());
                c.extend_from_slice(&cto.to_be_bytes());
            }
            children.push(write_box(b"ctts", &c));
        }

        children.push(stsc);
        children.push(stsz);
        children.push(chunk_offset_box);

        let refs: Vec<&[u8]> = children.iter().map(|c| c.as_slice()).collect();
        concat_box_slices(b"stbl", &refs)
    }

    fn build_stsd(&self) -> Vec<u8> {
        let avcc = {
            let mut c = vec![
                0x01, // configurationVersion
                0x64, 0x00, 0x28, // profile, compat, level
                0xFF, // lengthSizeMinusOne
                0xE1, // one SPS
            ];
            c.extend_from_slice(&(self.sps.len() as u16).to_be_bytes());
            c.extend_from_slice(&self.sps);
            c.push(0x01); // one PPS
            c.extend_from_slice(&2u16.to_be_bytes());
            c.extend_from_slice(&[0x68, 0xEE]);
            write_box(b"avcC", &c)
        };

        let avc1 = {
            let mut c = Vec::new();
            c.extend_from_slice(&[0u8; 6]);
            c.extend_from_slice(&1u16.to_be_bytes()); // data_ref_index
            c.extend_from_slice(&[0u8; 16]);
            c.extend_from_slice(&self.width.to_be_bytes());
            c.extend_from_slice(&self.height.to_be_bytes());
            c.extend_from_slice(&0x00480000u32.to_be_bytes());
            c.extend_from_slice(&0x00480000u32.to_be_bytes());
            c.extend_from_slice(&0u32.to_be_bytes());
            c.extend_from_slice(&1u16.to_be_bytes());
            c.extend_from_slice(&[0u8; 32]);
            c.extend_from_slice(&0x0018u16.to_be_bytes());
            c.extend_from_slice(&(-1i16).to_be_bytes());
            c.extend_from_slice(&avcc);
            write_box(b"avc1", &c)
        };

        let mut c = Vec::new();
        c.extend_from_slice(&fullbox(0, 0));
        c.extend_from_slice(&1u32.to_be_bytes());
        c.extend_from_slice(&avc1);
        write_box(b"stsd", &c)
    }
}

// ---------------------------------------------------------------------------
// Box helpers for fixtures and for walking generated segments
// ---------------------------------------------------------------------------

pub fn write_box(box_type: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + content.len());
    out.extend_from_slice(&((8 + content.len()) as u32).to_be_bytes());
    out.extend_from_slice(box_type);
    out.extend_from_slice(content);
    out
}

pub fn fullbox(version: u8, flags: u32) -> [u8; 4] {
    (((version as u32) << 24) | (flags & 0x00FFFFFF)).to_be_bytes()
}

fn identity_matrix() -> Vec<u8> {
    let mut m = Vec::with_capacity(36);
    for v in [0x00010000u32, 0, 0, 0, 0x00010000, 0, 0, 0, 0x40000000] {
        m.extend_from_slice(&v.to_be_bytes());
    }
    m
}

fn concat_boxes(box_type: &[u8; 4], children: &[&Vec<u8>]) -> Vec<u8> {
    let refs: Vec<&[u8]> = children.iter().map(|c| c.as_slice()).collect();
    concat_box_slices(box_type, &refs)
}

fn concat_box_slices(box_type: &[u8; 4], children: &[&[u8]]) -> Vec<u8> {
    let total: usize = children.iter().map(|c| c.len()).sum();
    let mut out = Vec::with_capacity(8 + total);
    out.extend_from_slice(&((8 + total) as u32).to_be_bytes());
    out.extend_from_slice(box_type);
    for c in children {
        out.extend_from_slice(c);
    }
    out
}

/// Read a big-endian u32 from a slice.
pub fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// Find a top-level child box in `data` and return its full slice
/// (header included).
pub fn find_box<'a>(data: &'a [u8], fourcc: &[u8; 4]) -> Option<&'a [u8]> {
    let mut pos = 0usize;
    while pos + 8 <= data.len() {
        let size = read_u32(data, pos) as usize;
        if size < 8 || pos + size > data.len() {
            return None;
        }
        if &data[pos + 4..pos + 8] == fourcc {
            return Some(&data[pos..pos + size]);
        }
        pos += size;
    }
    None
}

/// The content of a box (past its 8-byte header).
pub fn box_content<'a>(boxed: &'a [u8]) -> &'a [u8] {
    &boxed[8..]
}

/// A parsed trun entry, as the segmenter writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrunEntry {
    pub duration: u32,
    pub size: u32,
    pub flags: u32,
    pub cto: i32,
}

/// Parsed skeleton of a generated media segment.
pub struct ParsedSegment {
    pub styp_len: usize,
    pub moof_len: usize,
    pub mdat_header_len: usize,
    pub sequence_number: u32,
    pub base_decode_time: u64,
    pub data_offset: i32,
    pub entries: Vec<TrunEntry>,
    pub mdat_payload: Vec<u8>,
}

/// Pull apart a `styp/moof/mdat` segment produced by the segmenter.
pub fn parse_segment(data: &[u8]) -> ParsedSegment {
    assert_eq!(&data[4..8], b"styp", "segment must start with styp");
    let styp_len = read_u32(data, 0) as usize;

    let rest = &data[styp_len..];
    assert_eq!(&rest[4..8], b"moof", "styp must be followed by moof");
    let moof_len = read_u32(rest, 0) as usize;
    let moof = &rest[..moof_len];

    let mfhd = find_box(box_content(moof), b"mfhd").expect("mfhd");
    let sequence_number = read_u32(box_content(mfhd), 4);

    let traf = find_box(box_content(moof), b"traf").expect("traf");
    let tfdt = find_box(box_content(traf), b"tfdt").expect("tfdt");
    let base_decode_time = u64::from_be_bytes(box_content(tfdt)[4..12].try_into().unwrap());

    let trun = find_box(box_content(traf), b"trun").expect("trun");
    let trun_content = box_content(trun);
    let sample_count = read_u32(trun_content, 4) as usize;
    let data_offset = read_u32(trun_content, 8) as i32;
    let mut entries = Vec::with_capacity(sample_count);
    for i in 0..sample_count {
        let at = 12 + i * 16;
        entries.push(TrunEntry {
            duration: read_u32(trun_content, at),
            size: read_u32(trun_content, at + 4),
            flags: read_u32(trun_content, at + 8),
            cto: read_u32(trun_content, at + 12) as i32,
        });
    }

    let mdat = &rest[moof_len..];
    assert_eq!(&mdat[4..8], b"mdat", "moof must be followed by mdat");
    let mdat_header_len = if read_u32(mdat, 0) == 1 { 16 } else { 8 };
    let mdat_payload = mdat[mdat_header_len..].to_vec();

    ParsedSegment {
        styp_len,
        moof_len,
        mdat_header_len,
        sequence_number,
        base_decode_time,
        data_offset,
        entries,
        mdat_payload,
    }
}
