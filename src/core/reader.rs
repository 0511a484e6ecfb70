// Main KS2 reader: fixed header plus the tagged record dispatcher

use crate::core::bulk::read_bulk_samples;
use crate::core::channel_table::{trim_padding, ChannelTableBuilder};
use crate::core::config::ReaderConfig;
use crate::core::constants::*;
use crate::core::cursor::{TagCursor, TagRecord};
use crate::core::error::{Ks2Error, Result};
use crate::core::format::*;
use crate::core::record::{is_fixed_block, is_variable_header, RecordKind};
use crate::core::samples::SampleMatrix;
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    VariableHeader,
    FixedBlock,
    Done,
}

/// Everything accumulated during the forward pass. Converted into an
/// immutable `Ks2File` once the stream ends.
struct DecodeState {
    info: GeneralInfo,
    channels: ChannelTableBuilder,
    /// Fixed metadata of the data block currently being traversed.
    pending: AcquisitionInfo,
    acquisition: AcquisitionInfo,
    samples: Option<SampleMatrix>,
    warnings: Vec<DecodeWarning>,
    blocks_seen: usize,
}

pub struct Ks2Reader<R> {
    cursor: TagCursor<R>,
    header: FileHeader,
    config: ReaderConfig,
}

impl Ks2Reader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, ReaderConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("opened {}", path.as_ref().display());
        Self::from_reader(BufReader::new(file), config)
    }
}

impl<R: Read + Seek> Ks2Reader<R> {
    pub fn from_reader(mut reader: R, config: ReaderConfig) -> Result<Self> {
        config.validate()?;

        reader.seek(SeekFrom::Start(0))?;
        let mut raw = [0u8; HEADER_SIZE];
        reader.read_exact(&mut raw).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Ks2Error::Format(format!(
                "file is shorter than the {}-byte fixed header",
                HEADER_SIZE
            )),
            _ => Ks2Error::Io(e),
        })?;
        let header = FileHeader::parse(&raw)?;

        info!(
            "header: device={:?} project={:?} channels={} (+{} CAN) fs={} blocks={}",
            header.device,
            header.project,
            header.recorded_channels,
            header.can_channels(),
            header.sampling_frequency,
            header.data_blocks
        );

        Ok(Self {
            cursor: TagCursor::new(reader),
            header,
            config,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Walk the record stream once and return the decoded file.
    pub fn decode(mut self) -> Result<Ks2File> {
        let mut offset = HEADER_SIZE as u64;
        let (parent, child) = self.cursor.peek_tag(offset)?;
        if parent != PARENT_GENERAL_INFO {
            return Err(Ks2Error::Format(format!(
                "expected general info record (parent {}) at {:#x}, found ({}, {})",
                PARENT_GENERAL_INFO, offset, parent, child
            )));
        }

        let mut state = DecodeState {
            info: GeneralInfo::default(),
            channels: ChannelTableBuilder::new(self.header.recorded_channels),
            pending: AcquisitionInfo::default(),
            acquisition: AcquisitionInfo::default(),
            samples: None,
            warnings: Vec::new(),
            blocks_seen: 0,
        };

        let mut phase = Phase::VariableHeader;
        while phase != Phase::Done {
            let (parent, child) = self.cursor.peek_tag(offset)?;
            let next = match phase {
                Phase::VariableHeader if is_variable_header(parent) => Phase::VariableHeader,
                Phase::VariableHeader | Phase::FixedBlock if is_fixed_block(parent) => {
                    Phase::FixedBlock
                }
                _ => Phase::Done,
            };
            if next != phase {
                debug!("{:?} -> {:?} at {:#x} on ({}, {})", phase, next, offset, parent, child);
            }
            phase = next;
            if phase != Phase::Done {
                let next_offset = self.dispatch(&mut state, offset, parent, child)?;
                if next_offset <= offset {
                    return Err(Ks2Error::Format(format!(
                        "record ({}, {}) at {:#x} does not advance the stream",
                        parent, child, offset
                    )));
                }
                offset = next_offset;
            }
        }

        self.finish(state)
    }

    /// Decode one record and return the offset of the next one.
    fn dispatch(&mut self, state: &mut DecodeState, offset: u64, parent: u8, child: u8) -> Result<u64> {
        let record = self.cursor.resolve(offset, parent, child)?;
        let kind = RecordKind::classify(parent, child);
        debug!(
            "record ({}, {}) at {:#x}: {} bytes, {:?} -> {:?}",
            parent, child, offset, record.byte_length, record.type_code, kind
        );

        match kind {
            RecordKind::Comment => {
                let raw = self.cursor.read_bytes(record.byte_length as usize)?;
                state.info.comment = Some(trim_padding(&raw));
            }
            RecordKind::DigitalInputs if record.byte_length > 0 => {
                state.info.digital_inputs = Some(self.cursor.read_u8()?);
            }
            RecordKind::MeasuringMode if record.byte_length > 0 => {
                state.info.measuring_mode = Some(self.cursor.read_u8()?);
            }
            RecordKind::ChannelArray(column, layout) => {
                let wanted = state.channels.channel_count() * layout.width();
                let len = (record.byte_length as usize).min(wanted);
                let payload = self.cursor.read_bytes(len)?;
                state.channels.set_column(column, layout, &payload)?;
            }
            RecordKind::StartTime => {
                let len = (record.byte_length as usize).min(START_TIME_WIDTH);
                let raw = self.cursor.read_bytes(len)?;
                let start_time = parse_start_time(&raw)?;
                debug!("start time {}", start_time);
                state.pending.start_time = Some(start_time);
            }
            RecordKind::SampleCount => {
                if record.byte_length < 8 {
                    return Err(Ks2Error::Format(format!(
                        "sample count record holds {} bytes, expected 8",
                        record.byte_length
                    )));
                }
                state.pending.sample_count = Some(self.cursor.read_u64()?);
            }
            RecordKind::BulkSamples => self.data_block(state, &record)?,
            RecordKind::DigitalInputs
            | RecordKind::MeasuringMode
            | RecordKind::Footer
            | RecordKind::Skip => {}
        }

        record.next_offset()
    }

    fn data_block(&mut self, state: &mut DecodeState, record: &TagRecord) -> Result<()> {
        state.blocks_seen += 1;
        let pending = std::mem::take(&mut state.pending);

        if state.blocks_seen != self.config.data_block {
            debug!(
                "skipping data block {} ({} bytes)",
                state.blocks_seen, record.byte_length
            );
            return Ok(());
        }

        let bulk = read_bulk_samples(
            &mut self.cursor,
            record,
            self.header.recorded_channels,
            pending.sample_count,
            self.config.memory_cap_bytes,
        )?;
        info!(
            "data block {}: {} samples x {} channels",
            state.blocks_seen,
            bulk.matrix.rows(),
            bulk.matrix.channels()
        );
        state.samples = Some(bulk.matrix);
        state.warnings.extend(bulk.warnings);
        state.acquisition = pending;
        Ok(())
    }

    fn finish(self, state: DecodeState) -> Result<Ks2File> {
        let mut acquisition = state.acquisition;
        if state.blocks_seen == 0 {
            acquisition = state.pending;
        } else if state.samples.is_none() {
            info!(
                "data block {} not present, file holds {}",
                self.config.data_block, state.blocks_seen
            );
        }

        Ok(Ks2File {
            header: self.header,
            info: state.info,
            channels: state.channels.finish()?,
            acquisition,
            samples: state.samples,
            warnings: state.warnings,
        })
    }
}

/// Parse the `YYYYMMDDHHMMSS` start time, ignoring trailing padding.
pub fn parse_start_time(raw: &[u8]) -> Result<NaiveDateTime> {
    let text = trim_padding(raw);
    let text = text.trim();
    if text.len() != 14 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Ks2Error::InvalidDatetime(text.to_string()));
    }
    NaiveDateTime::parse_from_str(text, START_TIME_FORMAT)
        .map_err(|_| Ks2Error::InvalidDatetime(text.to_string()))
}

/// Open, decode and close a file with the given configuration.
pub fn read_file<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<Ks2File> {
    Ks2Reader::open_with_config(path, config)?.decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::Ks2Builder;
    use chrono::{Datelike, Timelike};
    use std::io::Cursor;

    fn decode(bytes: Vec<u8>, config: ReaderConfig) -> Result<Ks2File> {
        Ks2Reader::from_reader(Cursor::new(bytes), config)?.decode()
    }

    #[test]
    fn test_parse_start_time() {
        let t = parse_start_time(b"20240315142509\0\0").unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2024, 3, 15));
        assert_eq!((t.hour(), t.minute(), t.second()), (14, 25, 9));
        assert!(parse_start_time(b"2024-03-15 14:25").is_err());
        assert!(parse_start_time(b"2024031514250\0\0\0").is_err());
        assert!(matches!(
            parse_start_time(b"20241315142509  "),
            Err(Ks2Error::InvalidDatetime(_))
        ));
    }

    #[test]
    fn test_four_by_three_scenario() {
        let values: Vec<f32> = (0..12).map(|i| i as f32 * 1.5 - 4.0).collect();
        let bytes = Ks2Builder::new(3)
            .coefficients(&[1.0, 1.0, 1.0], &[0.0, 0.0, 0.0])
            .start_time("20230102030405")
            .sample_count(4)
            .float_samples(&values)
            .build();

        let file = decode(bytes, ReaderConfig::default()).unwrap();
        let raw = file.samples.as_ref().unwrap();
        assert_eq!((raw.rows(), raw.channels()), (4, 3));
        for i in 0..4 {
            for j in 0..3 {
                assert_eq!(raw.get(i, j), Some(values[i * 3 + j] as f64));
            }
        }
        let physical = file.physical().unwrap();
        for i in 0..4 {
            for j in 0..3 {
                assert_eq!(physical.get(i, j), raw.get(i, j));
            }
        }
        assert!(file.warnings.is_empty());
        assert_eq!(file.acquisition.sample_count, Some(4));
        assert_eq!(
            file.acquisition.start_time.map(|t| t.year()),
            Some(2023)
        );
    }

    #[test]
    fn test_columns_match_channel_count() {
        let bytes = Ks2Builder::new(4)
            .channel_indices(&[1, 2, 3, 4])
            .coefficients(&[1.0, 2.0, 3.0, 4.0], &[0.0, -1.0, 0.5, 0.0])
            .text_column(5, 10, &["V", "mV", "kN", "C"])
            .float_column(8, &[1.0; 4])
            .float_column(12, &[0.0; 4])
            .text_column(49, 40, &["a", "b", "c", "d"])
            .text_column(51, 20, &["10V", "10V", "5V", "1V"])
            .text_column(53, 20, &["OFF"; 4])
            .text_column(54, 20, &["OFF"; 4])
            .sample_count(0)
            .build();

        let file = decode(bytes, ReaderConfig::default()).unwrap();
        let ch = &file.channels;
        assert_eq!(ch.channel_count, 4);
        assert_eq!(ch.index.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.coef_a.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.coef_b.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.unit.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.cal_coef.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.offset.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.name.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.range.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.lpf.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.hpf.as_ref().map(Vec::len), Some(4));
        assert_eq!(ch.unit.as_ref().unwrap()[2], "kN");
        assert_eq!(ch.range.as_ref().unwrap()[3], "1V");
        assert!(file.samples.is_none());
    }

    #[test]
    fn test_wrong_discriminator_is_format_error() {
        let bytes = Ks2Builder::new(2)
            .without_general_info()
            .coefficients(&[1.0, 1.0], &[0.0, 0.0])
            .build();
        let err = decode(bytes, ReaderConfig::default()).unwrap_err();
        assert!(err.is_format_error(), "{}", err);
    }

    #[test]
    fn test_empty_stream_is_format_error() {
        let bytes = Ks2Builder::new(2).without_general_info().build();
        assert!(matches!(
            decode(bytes, ReaderConfig::default()),
            Err(Ks2Error::Format(_))
        ));
    }

    #[test]
    fn test_sentinel_ends_fixed_block() {
        let bytes = Ks2Builder::new(1)
            .coefficients(&[2.0], &[1.0])
            .sample_count(3)
            .float_samples(&[1.0, 2.0, 3.0])
            .sentinel()
            .footer(&[0u8; 4])
            .build();
        let file = decode(bytes, ReaderConfig::default()).unwrap();
        assert_eq!(file.sample_count(), 3);
        assert_eq!(file.physical().unwrap().column(0), Some(vec![3.0, 5.0, 7.0]));
    }

    #[test]
    fn test_unknown_children_are_skipped() {
        let bytes = Ks2Builder::new(2)
            .raw_record(1, 99, &[0xaa; 7])
            .raw_record(2, 6, &[1, 2])
            .coefficients(&[1.0, 1.0], &[0.0, 0.0])
            .raw_record(16, 77, &[0u8; 3])
            .sample_count(1)
            .float_samples(&[8.0, 9.0])
            .build();
        let file = decode(bytes, ReaderConfig::default()).unwrap();
        assert_eq!(file.samples.unwrap().row(0), Some(vec![8.0, 9.0]));
    }

    #[test]
    fn test_general_info_items() {
        let bytes = Ks2Builder::new(1)
            .comment("rig 4, axle load")
            .raw_record(1, 44, &[2])
            .raw_record(1, 47, &[1])
            .build();
        let file = decode(bytes, ReaderConfig::default()).unwrap();
        assert_eq!(file.info.comment.as_deref(), Some("rig 4, axle load"));
        assert_eq!(file.info.digital_inputs, Some(2));
        assert_eq!(file.info.measuring_mode, Some(1));
    }

    #[test]
    fn test_multiple_fixed_blocks_select_second() {
        let bytes = Ks2Builder::new(2)
            .coefficients(&[1.0, 1.0], &[0.0, 0.0])
            .start_time("20200101000000")
            .sample_count(1)
            .float_samples(&[1.0, 2.0])
            .footer(&[0u8; 8])
            .start_time("20200101000100")
            .sample_count(2)
            .float_samples(&[3.0, 4.0, 5.0, 6.0])
            .footer(&[0u8; 8])
            .build();

        let first = decode(bytes.clone(), ReaderConfig::default()).unwrap();
        assert_eq!(first.sample_count(), 1);
        assert_eq!(first.acquisition.sample_count, Some(1));

        let config = ReaderConfig {
            data_block: 2,
            ..Default::default()
        };
        let second = decode(bytes.clone(), config).unwrap();
        assert_eq!(second.sample_count(), 2);
        assert_eq!(second.acquisition.sample_count, Some(2));
        assert_eq!(second.acquisition.start_time.map(|t| t.minute()), Some(1));
        assert_eq!(second.samples.unwrap().row(1), Some(vec![5.0, 6.0]));
        assert!(second.warnings.is_empty());

        let config = ReaderConfig {
            data_block: 3,
            ..Default::default()
        };
        let missing = decode(bytes, config).unwrap();
        assert!(missing.samples.is_none());
    }

    #[test]
    fn test_sample_count_mismatch_is_recoverable() {
        let bytes = Ks2Builder::new(2)
            .coefficients(&[1.0, 1.0], &[0.0, 0.0])
            .sample_count(5)
            .float_samples(&[1.0, 2.0, 3.0, 4.0])
            .build();
        let file = decode(bytes, ReaderConfig::default()).unwrap();
        assert_eq!(file.sample_count(), 2);
        assert_eq!(
            file.warnings,
            vec![DecodeWarning::SampleCountMismatch {
                declared: 5,
                computed: 2
            }]
        );
    }

    #[test]
    fn test_bad_start_time_aborts() {
        let bytes = Ks2Builder::new(1)
            .start_time("yesterday noon")
            .build();
        assert!(matches!(
            decode(bytes, ReaderConfig::default()),
            Err(Ks2Error::InvalidDatetime(_))
        ));
    }

    #[test]
    fn test_missing_calibration_only_fails_transform() {
        let bytes = Ks2Builder::new(1)
            .sample_count(2)
            .float_samples(&[1.0, 2.0])
            .build();
        let file = decode(bytes, ReaderConfig::default()).unwrap();
        assert_eq!(file.sample_count(), 2);
        assert!(matches!(
            file.physical(),
            Err(Ks2Error::MissingCalibration(_))
        ));
    }

    #[test]
    fn test_bulk_length_past_eof_is_format_error() {
        let bytes = Ks2Builder::new(2)
            .coefficients(&[1.0, 1.0], &[0.0, 0.0])
            .sized_record(17, 2, 5, u64::MAX / 2, &[1, 2, 3, 4])
            .build();
        let err = decode(bytes, ReaderConfig::default()).unwrap_err();
        assert!(matches!(err, Ks2Error::Format(_)), "{}", err);
    }

    #[test]
    fn test_footer_length_wrapping_offset_is_format_error() {
        let bytes = Ks2Builder::new(1)
            .sized_record(18, 25, 0, u64::MAX - 9, &[])
            .build();
        let err = decode(bytes, ReaderConfig::default()).unwrap_err();
        assert!(matches!(err, Ks2Error::Format(_)), "{}", err);
    }

    #[test]
    fn test_skipped_block_length_past_eof_ends_stream() {
        let bytes = Ks2Builder::new(1)
            .coefficients(&[1.0], &[0.0])
            .sample_count(1)
            .float_samples(&[4.0])
            .sized_record(17, 2, 3, 1 << 40, &[0u8; 4])
            .build();
        let file = decode(bytes, ReaderConfig::default()).unwrap();
        assert_eq!(file.samples.unwrap().row(0), Some(vec![4.0]));
    }

    #[test]
    fn test_truncated_header() {
        let result = Ks2Reader::from_reader(Cursor::new(vec![b' '; 40]), ReaderConfig::default());
        assert!(matches!(result, Err(Ks2Error::Format(_))));
    }
}
