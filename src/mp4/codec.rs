//! Codec string derivation for manifests.
//!
//! Produces the RFC-6381 codec identifier that HLS `CODECS` attributes and
//! DASH `codecs` attributes advertise, from the raw stsd box of the video
//! track.

/// Fallback codec string when the sample entry gives us nothing better.
pub const DEFAULT_VIDEO_CODEC: &str = "avc1.640028";

/// HEVC codec string; parameter sets are not parsed.
const HEVC_CODEC: &str = "hvc1.1.6.L93.B0";

/// Derive the codec string from raw stsd bytes (box header included).
///
/// For AVC the profile/compatibility/level triplet is taken from the first
/// SPS when one is present, otherwise from the avcC header fields. HEVC gets
/// a fixed conservative string. Anything else falls back to
/// [`DEFAULT_VIDEO_CODEC`].
pub fn codec_string(stsd: &[u8]) -> String {
    match first_sample_entry(stsd) {
        Some((fourcc, entry)) => match fourcc {
            b"avc1" | b"avc3" => avc_codec_string(entry),
            b"hvc1" | b"hev1" => HEVC_CODEC.to_string(),
            _ => DEFAULT_VIDEO_CODEC.to_string(),
        },
        None => DEFAULT_VIDEO_CODEC.to_string(),
    }
}

/// Locate the first sample entry inside a raw stsd box.
///
/// Returns the entry fourcc and the entry content (after its own header).
fn first_sample_entry(stsd: &[u8]) -> Option<(&[u8; 4], &[u8])> {
    // stsd layout: box header (8) + fullbox (4) + entry_count (4) + entries.
    if stsd.len() < 16 + 8 {
        return None;
    }
    let entry_count = u32::from_be_bytes([stsd[12], stsd[13], stsd[14], stsd[15]]);
    if entry_count == 0 {
        return None;
    }
    let entry_size = u32::from_be_bytes([stsd[16], stsd[17], stsd[18], stsd[19]]) as usize;
    if entry_size < 8 || 16 + entry_size > stsd.len() {
        return None;
    }
    let fourcc: &[u8; 4] = stsd[20..24].try_into().ok()?;
    Some((fourcc, &stsd[24..16 + entry_size]))
}

/// Build an `avc1.XXXXXX` string from a visual sample entry's avcC child.
fn avc_codec_string(entry: &[u8]) -> String {
    let Some(avcc) = find_child_box(entry, b"avcC") else {
        return DEFAULT_VIDEO_CODEC.to_string();
    };

    // avcC: version, profile, compat, level, lengthSizeMinusOne, numSPS,
    // then (u16 length + bytes) per SPS.
    if avcc.len() < 6 {
        return DEFAULT_VIDEO_CODEC.to_string();
    }

    let num_sps = (avcc[5] & 0x1F) as usize;
    if num_sps > 0 && avcc.len() >= 8 {
        let sps_len = u16::from_be_bytes([avcc[6], avcc[7]]) as usize;
        if sps_len >= 4 && avcc.len() >= 8 + sps_len {
            let sps = &avcc[8..8 + sps_len];
            // Profile, compatibility and level bytes follow the NAL header.
            return format!("avc1.{:02x}{:02x}{:02x}", sps[1], sps[2], sps[3]);
        }
    }

    format!("avc1.{:02x}{:02x}{:02x}", avcc[1], avcc[2], avcc[3])
}

/// Scan a flat run of child boxes for the given fourcc.
///
/// The visual sample entry's fixed fields span 78 bytes; child boxes follow.
fn find_child_box<'a>(entry: &'a [u8], target: &[u8; 4]) -> Option<&'a [u8]> {
    let mut pos = 78usize;
    while pos + 8 <= entry.len() {
        let size = u32::from_be_bytes([entry[pos], entry[pos + 1], entry[pos + 2], entry[pos + 3]])
            as usize;
        if size < 8 || pos + size > entry.len() {
            return None;
        }
        if &entry[pos + 4..pos + 8] == target {
            return Some(&entry[pos + 8..pos + size]);
        }
        pos += size;
    }
    None
}
