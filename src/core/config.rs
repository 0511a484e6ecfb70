// Reader configuration

use crate::core::constants::DEFAULT_MEMORY_CAP;
use crate::core::error::{Ks2Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Largest bulk payload read in one pass; bigger ones are streamed in
    /// chunks of at most this many bytes.
    pub memory_cap_bytes: u64,
    /// 1-based data block to decode.
    pub data_block: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            memory_cap_bytes: DEFAULT_MEMORY_CAP,
            data_block: 1,
        }
    }
}

impl ReaderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.memory_cap_bytes == 0 {
            return Err(Ks2Error::Config("memory_cap_bytes must be positive".to_string()));
        }
        if self.data_block == 0 {
            return Err(Ks2Error::Config("data_block is 1-based".to_string()));
        }
        Ok(())
    }
}
