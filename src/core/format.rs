// Data structures for KS2 format

use crate::core::constants::{HEADER_LINES, HEADER_SIZE};
use crate::core::error::{Ks2Error, Result};
use crate::core::calibration::calibrate;
use crate::core::samples::{PhysicalMatrix, SampleMatrix};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// The fixed 256-byte text header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHeader {
    pub device: String,
    pub file_version: String,
    pub project: String,
    pub recorded_channels: usize,
    pub individual_info_channels: usize,
    pub sampling_frequency: f64,
    pub sampling_frequency_unit: String,
    pub recorded_data_type: String,
    pub data_type: String,
    pub data_blocks: u64,
    pub can_ids: String,
    pub created_language: String,
    pub variable_header_size: u64,
    pub data_header_size: u64,
    pub data_footer_size: u64,
    pub variable_footer_size: u64,
}

impl FileHeader {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_SIZE {
            return Err(Ks2Error::Format(format!(
                "fixed header needs {} bytes, got {}",
                HEADER_SIZE,
                raw.len()
            )));
        }

        let lines: Vec<String> = raw[..HEADER_SIZE]
            .split(|&b| b == b'\n')
            .take(HEADER_LINES)
            .map(|line| {
                String::from_utf8_lossy(line)
                    .replace('"', "")
                    .trim_matches(|c: char| c.is_whitespace() || c == '\0')
                    .to_string()
            })
            .collect();

        if lines.len() < HEADER_LINES {
            return Err(Ks2Error::Format(format!(
                "fixed header has {} lines, expected {}",
                lines.len(),
                HEADER_LINES
            )));
        }

        Ok(FileHeader {
            device: lines[0].clone(),
            file_version: lines[1].clone(),
            project: lines[2].clone(),
            recorded_channels: parse_field(&lines, 3, "recorded channel count")?,
            individual_info_channels: parse_field(&lines, 4, "individual info channel count")?,
            sampling_frequency: parse_field(&lines, 5, "sampling frequency")?,
            sampling_frequency_unit: lines[6].clone(),
            recorded_data_type: lines[7].clone(),
            data_type: lines[8].clone(),
            data_blocks: parse_field(&lines, 9, "data block count")?,
            can_ids: lines[10].clone(),
            created_language: lines[11].clone(),
            variable_header_size: parse_field(&lines, 12, "variable header size")?,
            data_header_size: parse_field(&lines, 13, "data header size")?,
            data_footer_size: parse_field(&lines, 14, "data footer size")?,
            variable_footer_size: parse_field(&lines, 15, "variable footer size")?,
        })
    }

    /// Channels carried as CAN individual info on top of the recorded ones.
    pub fn can_channels(&self) -> usize {
        self.individual_info_channels
            .saturating_sub(self.recorded_channels)
    }
}

fn parse_field<T: std::str::FromStr>(lines: &[String], index: usize, what: &str) -> Result<T> {
    lines[index].parse().map_err(|_| {
        Ks2Error::Format(format!(
            "header line {}: invalid {} {:?}",
            index, what, lines[index]
        ))
    })
}

/// File-level items from the general info records (parent 1).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneralInfo {
    pub comment: Option<String>,
    pub digital_inputs: Option<u8>,
    pub measuring_mode: Option<u8>,
}

/// Per-channel parallel columns. A column is `None` when the file carries no
/// record for it; a present column always has one entry per channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelMetadata {
    pub channel_count: usize,
    pub index: Option<Vec<i16>>,
    pub coef_a: Option<Vec<f32>>,
    pub coef_b: Option<Vec<f32>>,
    pub unit: Option<Vec<String>>,
    pub cal_coef: Option<Vec<f32>>,
    pub offset: Option<Vec<f32>>,
    pub range: Option<Vec<String>>,
    pub lpf: Option<Vec<String>>,
    pub hpf: Option<Vec<String>>,
    pub name: Option<Vec<String>>,
}

impl ChannelMetadata {
    /// Display name for a channel, falling back to its 1-based number.
    pub fn channel_name(&self, channel: usize) -> String {
        self.name
            .as_ref()
            .and_then(|names| names.get(channel))
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("CH{}", channel + 1))
    }
}

/// Fixed metadata of the decoded data block (parent 16).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AcquisitionInfo {
    pub start_time: Option<NaiveDateTime>,
    pub sample_count: Option<u64>,
}

/// Recoverable conditions met while decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DecodeWarning {
    SampleCountMismatch { declared: u64, computed: u64 },
    MissingSampleCount { computed: u64 },
    TrailingBytes { bytes: u64 },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::SampleCountMismatch { declared, computed } => write!(
                f,
                "sample count mismatch: header declares {}, data holds {}",
                declared, computed
            ),
            DecodeWarning::MissingSampleCount { computed } => write!(
                f,
                "no declared sample count, data holds {}",
                computed
            ),
            DecodeWarning::TrailingBytes { bytes } => {
                write!(f, "{} trailing bytes do not form a whole sample", bytes)
            }
        }
    }
}

/// Everything decoded from one file in a single forward pass.
#[derive(Debug, Clone)]
pub struct Ks2File {
    pub header: FileHeader,
    pub info: GeneralInfo,
    pub channels: ChannelMetadata,
    pub acquisition: AcquisitionInfo,
    pub samples: Option<SampleMatrix>,
    pub warnings: Vec<DecodeWarning>,
}

impl Ks2File {
    pub fn channel_count(&self) -> usize {
        self.header.recorded_channels
    }

    pub fn sample_count(&self) -> usize {
        self.samples.as_ref().map(|s| s.rows()).unwrap_or(0)
    }

    /// Raw samples converted to physical units with the per-channel
    /// coefficients A and B.
    pub fn physical(&self) -> Result<PhysicalMatrix> {
        let raw = self
            .samples
            .as_ref()
            .ok_or_else(|| Ks2Error::Format("file holds no decoded sample block".to_string()))?;
        calibrate(raw, &self.channels)
    }

    /// Elapsed time in seconds of every decoded sample.
    pub fn time_values(&self) -> Vec<f64> {
        let fs = self.header.sampling_frequency;
        (0..self.sample_count())
            .map(|i| if fs > 0.0 { i as f64 / fs } else { 0.0 })
            .collect()
    }
}

impl fmt::Display for Ks2File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let datetime = self
            .acquisition
            .start_time
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(f, "KS2 data object")?;
        writeln!(
            f,
            "({}, {}, {},",
            self.header.device, self.header.project, datetime
        )?;
        write!(
            f,
            "N ch: {}, fs: {} Hz, N block: {}, N samples: {})",
            self.channel_count(),
            self.header.sampling_frequency,
            self.header.data_blocks,
            self.sample_count()
        )
    }
}
