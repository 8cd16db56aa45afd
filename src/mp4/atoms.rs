//! MP4 atom definitions.

use super::SampleTable;

/// Four-character atom type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomType(pub [u8; 4]);

impl AtomType {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const MOOV: Self = Self(*b"moov");
    pub const MDAT: Self = Self(*b"mdat");
    pub const MVHD: Self = Self(*b"mvhd");
    pub const TRAK: Self = Self(*b"trak");
    pub const TKHD: Self = Self(*b"tkhd");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const HDLR: Self = Self(*b"hdlr");
    pub const MINF: Self = Self(*b"minf");
    pub const STBL: Self = Self(*b"stbl");
    pub const STSD: Self = Self(*b"stsd");
    pub const STTS: Self = Self(*b"stts");
    pub const STSS: Self = Self(*b"stss");
    pub const STSC: Self = Self(*b"stsc");
    pub const STSZ: Self = Self(*b"stsz");
    pub const STCO: Self = Self(*b"stco");
    pub const CO64: Self = Self(*b"co64");
    pub const CTTS: Self = Self(*b"ctts");

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed atom header.
#[derive(Debug, Clone)]
pub struct Atom {
    /// Atom type code.
    pub atom_type: AtomType,
    /// Atom size including header.
    pub size: u64,
    /// File offset where atom data starts (after header).
    pub data_offset: u64,
    /// Size of the header (8 or 16 bytes).
    pub header_size: u8,
}

impl Atom {
    /// Get the data size (size - header).
    pub fn data_size(&self) -> u64 {
        self.size.saturating_sub(self.header_size as u64)
    }
}

/// Handler type for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerType {
    Video,
    Audio,
    Unknown([u8; 4]),
}

impl HandlerType {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        match &bytes {
            b"vide" => Self::Video,
            b"soun" => Self::Audio,
            _ => Self::Unknown(bytes),
        }
    }

    /// The raw fourcc, for copying into a rebuilt hdlr box.
    pub fn as_bytes(&self) -> [u8; 4] {
        match self {
            Self::Video => *b"vide",
            Self::Audio => *b"soun",
            Self::Unknown(bytes) => *bytes,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video)
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio)
    }
}

/// Track information extracted from a trak atom.
///
/// Width, height and volume stay in their fixed-point wire form because the
/// init segment copies them verbatim; use [`TrackInfo::width`] /
/// [`TrackInfo::height`] for pixel values.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Track ID from tkhd.
    pub track_id: u32,
    /// Handler type (video/audio).
    pub handler_type: HandlerType,
    /// Handler name from hdlr.
    pub handler_name: String,
    /// Media timescale (ticks per second).
    pub timescale: u32,
    /// Track duration in media timescale ticks.
    pub duration: u64,
    /// Packed ISO-639-2 language code from mdhd.
    pub language: u16,
    /// Width in 16.16 fixed point.
    pub width_fixed: u32,
    /// Height in 16.16 fixed point.
    pub height_fixed: u32,
    /// Volume in 8.8 fixed point.
    pub volume: u16,
    /// Layer from tkhd.
    pub layer: i16,
    /// Alternate group from tkhd.
    pub alternate_group: i16,
    /// Raw stsd box bytes, header included.
    pub stsd: Vec<u8>,
    /// Sample table with all sample lookup state.
    pub sample_table: SampleTable,
}

impl TrackInfo {
    /// Create empty track info.
    pub fn new() -> Self {
        Self {
            track_id: 0,
            handler_type: HandlerType::Unknown([0; 4]),
            handler_name: String::new(),
            timescale: 0,
            duration: 0,
            language: 0x55C4, // und
            width_fixed: 0,
            height_fixed: 0,
            volume: 0,
            layer: 0,
            alternate_group: 0,
            stsd: Vec::new(),
            sample_table: SampleTable::default(),
        }
    }

    /// Width in pixels (upper 16 bits of the fixed-point value).
    pub fn width(&self) -> u32 {
        self.width_fixed >> 16
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height_fixed >> 16
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.timescale == 0 {
            0.0
        } else {
            self.duration as f64 / self.timescale as f64
        }
    }
}

impl Default for TrackInfo {
    fn default() -> Self {
        Self::new()
    }
}
