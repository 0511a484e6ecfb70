// Format constants for KS2 files

use serde::Serialize;

/// Size of the fixed ASCII header at the start of every file.
pub const HEADER_SIZE: usize = 256;
/// Number of newline-delimited fields in the fixed header.
pub const HEADER_LINES: usize = 16;

// Parent tags
pub const PARENT_GENERAL_INFO: u8 = 1;
pub const PARENT_CHANNEL_INFO: u8 = 2;
pub const PARENT_DATA_HEADER: u8 = 16;
pub const PARENT_DATA: u8 = 17;
pub const PARENT_DATA_FOOTER: u8 = 18;

// General info children (parent 1)
pub const CHILD_COMMENT: u8 = 4;
pub const CHILD_DIGITAL_INPUTS: u8 = 44;
pub const CHILD_MEASURING_MODE: u8 = 47;

// Data header children (parent 16)
pub const CHILD_START_TIME: u8 = 3;
pub const CHILD_SAMPLE_COUNT: u8 = 30;

/// Width of the start datetime payload (`YYYYMMDDHHMMSS` plus padding).
pub const START_TIME_WIDTH: usize = 16;
pub const START_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Tag + reserved byte + type byte, i.e. everything around the length field.
pub const RECORD_FIXED_OVERHEAD: u64 = 2 + 2;

pub const DEFAULT_MEMORY_CAP: u64 = 512 * 1024 * 1024;

/// Width of the length field that follows a tag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthWidth {
    Two,
    Four,
    Eight,
}

impl LengthWidth {
    pub fn bytes(self) -> usize {
        match self {
            LengthWidth::Two => 2,
            LengthWidth::Four => 4,
            LengthWidth::Eight => 8,
        }
    }

    /// Bytes between the start of a record and its payload.
    pub fn header_overhead(self) -> u64 {
        RECORD_FIXED_OVERHEAD + self.bytes() as u64
    }
}

/// (parent, child) pairs whose length field is wider than two bytes.
pub const LENGTH_WIDTH_EXCEPTIONS: [(u8, u8, LengthWidth); 6] = [
    (PARENT_GENERAL_INFO, 62, LengthWidth::Four),
    (PARENT_GENERAL_INFO, 70, LengthWidth::Four),
    (PARENT_DATA_HEADER, 35, LengthWidth::Four),
    (PARENT_DATA, 1, LengthWidth::Four),
    (PARENT_DATA, 2, LengthWidth::Eight),
    (PARENT_DATA_FOOTER, 25, LengthWidth::Eight),
];

pub fn length_width(parent: u8, child: u8) -> LengthWidth {
    LENGTH_WIDTH_EXCEPTIONS
        .iter()
        .find(|(p, c, _)| *p == parent && *c == child)
        .map(|(_, _, width)| *width)
        .unwrap_or(LengthWidth::Two)
}

/// Children that embed a 2-byte signed type code instead of reserved + type.
pub const SHORT_EXPLICIT_TYPE_CHILDREN: [u8; 3] = [61, 62, 70];
/// Child that embeds a 4-byte signed type code.
pub const LONG_EXPLICIT_TYPE_CHILD: u8 = 63;

/// Numeric encoding of a record payload (the "RDTP" byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeCode {
    Char,
    Short,
    Long,
    Float,
    Double,
    Byte,
    UShort,
    ULong,
    Int64,
    UInt64,
    /// Code embedded directly by children 61/62/63/70.
    Explicit(i32),
    /// Dictionary byte outside 0..=9.
    Unknown(u8),
}

impl TypeCode {
    pub fn from_rdtp(val: u8) -> Self {
        match val {
            0 => TypeCode::Char,
            1 => TypeCode::Short,
            2 => TypeCode::Long,
            3 => TypeCode::Float,
            4 => TypeCode::Double,
            5 => TypeCode::Byte,
            6 => TypeCode::UShort,
            7 => TypeCode::ULong,
            8 => TypeCode::Int64,
            9 => TypeCode::UInt64,
            other => TypeCode::Unknown(other),
        }
    }

    /// Byte width of one element, `None` for codes that carry no numeric layout.
    pub fn element_size(self) -> Option<usize> {
        match self {
            TypeCode::Char | TypeCode::Byte => Some(1),
            TypeCode::Short | TypeCode::UShort => Some(2),
            TypeCode::Long | TypeCode::ULong | TypeCode::Float => Some(4),
            TypeCode::Double | TypeCode::Int64 | TypeCode::UInt64 => Some(8),
            TypeCode::Explicit(_) | TypeCode::Unknown(_) => None,
        }
    }
}
