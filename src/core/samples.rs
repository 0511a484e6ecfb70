// Sample matrices: raw values as stored and calibrated physical values

use crate::core::constants::TypeCode;
use crate::core::error::{Ks2Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

/// Flat, row-major, channel-fastest sample storage in the file's native type.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSamples {
    Char(Vec<i8>),
    Short(Vec<i16>),
    Long(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Byte(Vec<u8>),
    UShort(Vec<u16>),
    ULong(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
}

impl RawSamples {
    /// Zero-filled storage for `len` elements of the given type.
    pub fn zeroed(type_code: TypeCode, len: usize) -> Result<Self> {
        Ok(match type_code {
            TypeCode::Char => RawSamples::Char(vec![0; len]),
            TypeCode::Short => RawSamples::Short(vec![0; len]),
            TypeCode::Long => RawSamples::Long(vec![0; len]),
            TypeCode::Float => RawSamples::Float(vec![0.0; len]),
            TypeCode::Double => RawSamples::Double(vec![0.0; len]),
            TypeCode::Byte => RawSamples::Byte(vec![0; len]),
            TypeCode::UShort => RawSamples::UShort(vec![0; len]),
            TypeCode::ULong => RawSamples::ULong(vec![0; len]),
            TypeCode::Int64 => RawSamples::Int64(vec![0; len]),
            TypeCode::UInt64 => RawSamples::UInt64(vec![0; len]),
            other => {
                return Err(Ks2Error::Format(format!(
                    "type code {:?} cannot hold sample data",
                    other
                )))
            }
        })
    }

    pub fn type_code(&self) -> TypeCode {
        match self {
            RawSamples::Char(_) => TypeCode::Char,
            RawSamples::Short(_) => TypeCode::Short,
            RawSamples::Long(_) => TypeCode::Long,
            RawSamples::Float(_) => TypeCode::Float,
            RawSamples::Double(_) => TypeCode::Double,
            RawSamples::Byte(_) => TypeCode::Byte,
            RawSamples::UShort(_) => TypeCode::UShort,
            RawSamples::ULong(_) => TypeCode::ULong,
            RawSamples::Int64(_) => TypeCode::Int64,
            RawSamples::UInt64(_) => TypeCode::UInt64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawSamples::Char(v) => v.len(),
            RawSamples::Short(v) => v.len(),
            RawSamples::Long(v) => v.len(),
            RawSamples::Float(v) => v.len(),
            RawSamples::Double(v) => v.len(),
            RawSamples::Byte(v) => v.len(),
            RawSamples::UShort(v) => v.len(),
            RawSamples::ULong(v) => v.len(),
            RawSamples::Int64(v) => v.len(),
            RawSamples::UInt64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at a flat position, widened to f64.
    pub fn get_f64(&self, pos: usize) -> Option<f64> {
        match self {
            RawSamples::Char(v) => v.get(pos).map(|&x| x as f64),
            RawSamples::Short(v) => v.get(pos).map(|&x| x as f64),
            RawSamples::Long(v) => v.get(pos).map(|&x| x as f64),
            RawSamples::Float(v) => v.get(pos).map(|&x| x as f64),
            RawSamples::Double(v) => v.get(pos).copied(),
            RawSamples::Byte(v) => v.get(pos).map(|&x| x as f64),
            RawSamples::UShort(v) => v.get(pos).map(|&x| x as f64),
            RawSamples::ULong(v) => v.get(pos).map(|&x| x as f64),
            RawSamples::Int64(v) => v.get(pos).map(|&x| x as f64),
            RawSamples::UInt64(v) => v.get(pos).map(|&x| x as f64),
        }
    }

    /// Every element in storage order, widened to f64.
    pub fn iter_f64(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            RawSamples::Char(v) => Box::new(v.iter().map(|&x| x as f64)),
            RawSamples::Short(v) => Box::new(v.iter().map(|&x| x as f64)),
            RawSamples::Long(v) => Box::new(v.iter().map(|&x| x as f64)),
            RawSamples::Float(v) => Box::new(v.iter().map(|&x| x as f64)),
            RawSamples::Double(v) => Box::new(v.iter().copied()),
            RawSamples::Byte(v) => Box::new(v.iter().map(|&x| x as f64)),
            RawSamples::UShort(v) => Box::new(v.iter().map(|&x| x as f64)),
            RawSamples::ULong(v) => Box::new(v.iter().map(|&x| x as f64)),
            RawSamples::Int64(v) => Box::new(v.iter().map(|&x| x as f64)),
            RawSamples::UInt64(v) => Box::new(v.iter().map(|&x| x as f64)),
        }
    }

    /// Decode little-endian `bytes` into the elements starting at `start`.
    /// `bytes` must hold a whole number of elements that fit in the storage.
    pub fn decode_into(&mut self, start: usize, bytes: &[u8]) -> Result<()> {
        let size = self.type_code().element_size().unwrap_or(1);
        if bytes.len() % size != 0 {
            return Err(Ks2Error::Format(format!(
                "{} bytes is not a whole number of {}-byte elements",
                bytes.len(),
                size
            )));
        }
        let count = bytes.len() / size;
        if start + count > self.len() {
            return Err(Ks2Error::Format(format!(
                "chunk of {} elements at {} overruns matrix of {}",
                count,
                start,
                self.len()
            )));
        }
        let end = start + count;

        match self {
            RawSamples::Char(v) => {
                for (dst, &src) in v[start..end].iter_mut().zip(bytes) {
                    *dst = src as i8;
                }
            }
            RawSamples::Byte(v) => v[start..end].copy_from_slice(bytes),
            RawSamples::Short(v) => LittleEndian::read_i16_into(bytes, &mut v[start..end]),
            RawSamples::Long(v) => LittleEndian::read_i32_into(bytes, &mut v[start..end]),
            RawSamples::Float(v) => LittleEndian::read_f32_into(bytes, &mut v[start..end]),
            RawSamples::Double(v) => LittleEndian::read_f64_into(bytes, &mut v[start..end]),
            RawSamples::UShort(v) => LittleEndian::read_u16_into(bytes, &mut v[start..end]),
            RawSamples::ULong(v) => LittleEndian::read_u32_into(bytes, &mut v[start..end]),
            RawSamples::Int64(v) => LittleEndian::read_i64_into(bytes, &mut v[start..end]),
            RawSamples::UInt64(v) => LittleEndian::read_u64_into(bytes, &mut v[start..end]),
        }
        Ok(())
    }
}

/// Raw sample matrix of shape `[rows][channels]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    rows: usize,
    channels: usize,
    values: RawSamples,
}

impl SampleMatrix {
    pub fn new(values: RawSamples, channels: usize) -> Result<Self> {
        if channels == 0 || values.len() % channels != 0 {
            return Err(Ks2Error::Format(format!(
                "{} values cannot be shaped into {} channels",
                values.len(),
                channels
            )));
        }
        Ok(Self {
            rows: values.len() / channels,
            channels,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn type_code(&self) -> TypeCode {
        self.values.type_code()
    }

    pub fn values(&self) -> &RawSamples {
        &self.values
    }

    pub fn get(&self, row: usize, channel: usize) -> Option<f64> {
        if row >= self.rows || channel >= self.channels {
            return None;
        }
        self.values.get_f64(row * self.channels + channel)
    }

    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        if row >= self.rows {
            return None;
        }
        (0..self.channels).map(|ch| self.get(row, ch)).collect()
    }
}

macro_rules! serialize_rows {
    ($serializer:expr, $values:expr, $channels:expr) => {{
        let mut seq = $serializer.serialize_seq(Some($values.len() / $channels))?;
        for row in $values.chunks($channels) {
            seq.serialize_element(row)?;
        }
        seq.end()
    }};
}

/// Serialized as nested rows in the native element type.
impl Serialize for SampleMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let ch = self.channels;
        match &self.values {
            RawSamples::Char(v) => serialize_rows!(serializer, v, ch),
            RawSamples::Short(v) => serialize_rows!(serializer, v, ch),
            RawSamples::Long(v) => serialize_rows!(serializer, v, ch),
            RawSamples::Float(v) => serialize_rows!(serializer, v, ch),
            RawSamples::Double(v) => serialize_rows!(serializer, v, ch),
            RawSamples::Byte(v) => serialize_rows!(serializer, v, ch),
            RawSamples::UShort(v) => serialize_rows!(serializer, v, ch),
            RawSamples::ULong(v) => serialize_rows!(serializer, v, ch),
            RawSamples::Int64(v) => serialize_rows!(serializer, v, ch),
            RawSamples::UInt64(v) => serialize_rows!(serializer, v, ch),
        }
    }
}

/// Calibrated values in physical units, same shape as the raw matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalMatrix {
    pub rows: usize,
    pub channels: usize,
    pub values: Vec<f64>,
}

impl PhysicalMatrix {
    pub fn get(&self, row: usize, channel: usize) -> Option<f64> {
        if row >= self.rows || channel >= self.channels {
            return None;
        }
        self.values.get(row * self.channels + channel).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.channels;
        Some(&self.values[start..start + self.channels])
    }

    pub fn column(&self, channel: usize) -> Option<Vec<f64>> {
        if channel >= self.channels {
            return None;
        }
        Some(
            self.values
                .iter()
                .skip(channel)
                .step_by(self.channels)
                .copied()
                .collect(),
        )
    }
}
