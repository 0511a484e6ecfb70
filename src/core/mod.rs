pub mod bulk;
pub mod calibration;
pub mod channel_table;
pub mod config;
pub mod constants;
pub mod cursor;
pub mod error;
pub mod export;
pub mod format;
pub mod reader;
pub mod record;
pub mod samples;

#[cfg(test)]
pub(crate) mod fixtures;
