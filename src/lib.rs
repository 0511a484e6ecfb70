// KS2 Rust Reader
// Main library entry point

pub mod core;

// Re-export main types
pub use crate::core::calibration::calibrate;
pub use crate::core::config::ReaderConfig;
pub use crate::core::constants::TypeCode;
pub use crate::core::error::{Ks2Error, Result};
pub use crate::core::export::{select_channels, summarize, write_csv, write_json, ChannelSummary};
pub use crate::core::format::{
    AcquisitionInfo, ChannelMetadata, DecodeWarning, FileHeader, GeneralInfo, Ks2File,
};
pub use crate::core::reader::{read_file, Ks2Reader};
pub use crate::core::samples::{PhysicalMatrix, RawSamples, SampleMatrix};

#[cfg(test)]
mod tests {
    #[test]
    fn test_constants() {
        use crate::core::constants::*;
        assert_eq!(HEADER_SIZE, 256);
        assert_eq!(HEADER_LINES, 16);
        assert_eq!(DEFAULT_MEMORY_CAP, 1 << 29);
    }
}
