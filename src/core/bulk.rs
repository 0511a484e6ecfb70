// Bulk sample reader: decodes the data record into a [sample][channel]
// matrix while holding at most one memory-capped chunk of raw bytes.

use crate::core::cursor::{TagCursor, TagRecord};
use crate::core::error::{Ks2Error, Result};
use crate::core::format::DecodeWarning;
use crate::core::samples::{RawSamples, SampleMatrix};
use std::io::{Read, Seek};
use tracing::{debug, warn};

/// How a bulk record is split into reads. Chunks always hold whole samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_samples: u64,
    pub full_chunks: u64,
    pub remainder_samples: u64,
}

impl ChunkPlan {
    pub fn new(sample_count: u64, bytes_per_sample: u64, memory_cap: u64) -> Self {
        let block_bytes = sample_count * bytes_per_sample;
        if block_bytes <= memory_cap {
            return Self {
                chunk_samples: sample_count,
                full_chunks: u64::from(sample_count > 0),
                remainder_samples: 0,
            };
        }

        let chunk_samples = (memory_cap / bytes_per_sample).max(1);
        Self {
            chunk_samples,
            full_chunks: sample_count / chunk_samples,
            remainder_samples: sample_count % chunk_samples,
        }
    }

    pub fn reads(&self) -> u64 {
        self.full_chunks + u64::from(self.remainder_samples > 0)
    }

    /// (first sample, sample count) of every read, in file order.
    pub fn chunks(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        let full = (0..self.full_chunks).map(move |i| (i * self.chunk_samples, self.chunk_samples));
        let tail = (self.remainder_samples > 0)
            .then(|| (self.full_chunks * self.chunk_samples, self.remainder_samples));
        full.chain(tail)
    }
}

pub struct BulkRead {
    pub matrix: SampleMatrix,
    pub plan: ChunkPlan,
    pub warnings: Vec<DecodeWarning>,
}

/// Read the payload of a bulk record. The cursor must sit at the payload.
pub fn read_bulk_samples<R: Read + Seek>(
    cursor: &mut TagCursor<R>,
    record: &TagRecord,
    channel_count: usize,
    declared_samples: Option<u64>,
    memory_cap: u64,
) -> Result<BulkRead> {
    if channel_count == 0 {
        return Err(Ks2Error::Format(
            "bulk data present but the header declares 0 channels".to_string(),
        ));
    }
    let element_size = record.type_code.element_size().ok_or_else(|| {
        Ks2Error::Format(format!(
            "bulk record ({}, {}) has non-numeric type code {:?}",
            record.parent, record.child, record.type_code
        ))
    })?;

    let stream_len = cursor.stream_len()?;
    match record.payload_end() {
        Some(end) if end <= stream_len => {}
        _ => {
            return Err(Ks2Error::Format(format!(
                "bulk record ({}, {}) at {:#x} declares {} bytes, stream ends at {:#x}",
                record.parent, record.child, record.offset, record.byte_length, stream_len
            )))
        }
    }

    let bytes_per_sample = channel_count
        .checked_mul(element_size)
        .map(|n| n as u64)
        .ok_or_else(|| Ks2Error::Format(format!("{} channels overflow a sample", channel_count)))?;
    let sample_count = record.byte_length / bytes_per_sample;
    let mut warnings = Vec::new();

    match declared_samples {
        Some(declared) => {
            let exact = record.byte_length as f64 / bytes_per_sample as f64;
            if exact.round() as u64 != declared {
                warn!(
                    "sample count mismatch: header declares {}, data holds {}",
                    declared, sample_count
                );
                warnings.push(DecodeWarning::SampleCountMismatch {
                    declared,
                    computed: sample_count,
                });
            }
        }
        None => {
            warn!("no declared sample count, using {}", sample_count);
            warnings.push(DecodeWarning::MissingSampleCount {
                computed: sample_count,
            });
        }
    }

    let trailing = record.byte_length % bytes_per_sample;
    if trailing > 0 {
        warn!("{} trailing bytes in bulk record ignored", trailing);
        warnings.push(DecodeWarning::TrailingBytes { bytes: trailing });
    }

    let plan = ChunkPlan::new(sample_count, bytes_per_sample, memory_cap);
    let element_count = usize::try_from(sample_count)
        .ok()
        .and_then(|n| n.checked_mul(channel_count))
        .ok_or_else(|| {
            Ks2Error::Format(format!(
                "{} samples x {} channels do not fit in memory",
                sample_count, channel_count
            ))
        })?;
    let mut values = RawSamples::zeroed(record.type_code, element_count)?;
    debug!(
        "reading {} samples x {} channels ({:?}) in {} read(s)",
        sample_count,
        channel_count,
        record.type_code,
        plan.reads()
    );

    let mut buf = vec![0u8; (plan.chunk_samples * bytes_per_sample) as usize];
    let total_reads = plan.reads();
    for (i, (first_sample, samples)) in plan.chunks().enumerate() {
        let len = (samples * bytes_per_sample) as usize;
        cursor.read_into(&mut buf[..len])?;
        values.decode_into(first_sample as usize * channel_count, &buf[..len])?;
        if total_reads > 1 {
            debug!("chunk {}/{}: {} samples", i + 1, total_reads, samples);
        }
    }

    Ok(BulkRead {
        matrix: SampleMatrix::new(values, channel_count)?,
        plan,
        warnings,
    })
}
