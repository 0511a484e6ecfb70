// Tag cursor and length/type resolver for the tagged record stream

use crate::core::constants::*;
use crate::core::error::{Ks2Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Tag pair returned once fewer than two bytes remain.
pub const END_OF_STREAM: (u8, u8) = (0, 0);

/// One resolved record header. Lives for a single dispatch step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRecord {
    pub parent: u8,
    pub child: u8,
    pub length_width: LengthWidth,
    pub byte_length: u64,
    pub type_code: TypeCode,
    /// Absolute offset of the first payload byte.
    pub payload_offset: u64,
    /// Absolute offset of the tag pair.
    pub offset: u64,
}

impl TagRecord {
    /// Offset of the record that follows this one.
    pub fn next_offset(&self) -> Result<u64> {
        self.offset
            .checked_add(self.length_width.header_overhead())
            .and_then(|end| end.checked_add(self.byte_length))
            .ok_or_else(|| {
                Ks2Error::Format(format!(
                    "record ({}, {}) at {:#x}: length {} runs past the addressable range",
                    self.parent, self.child, self.offset, self.byte_length
                ))
            })
    }

    /// Offset one past the last payload byte.
    pub fn payload_end(&self) -> Option<u64> {
        self.payload_offset.checked_add(self.byte_length)
    }
}

pub struct TagCursor<R> {
    reader: R,
}

impl<R: Read + Seek> TagCursor<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the (parent, child) pair at `offset`.
    pub fn peek_tag(&mut self, offset: u64) -> Result<(u8, u8)> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut tag = [0u8; 2];
        match self.reader.read_exact(&mut tag) {
            Ok(()) => Ok((tag[0], tag[1])),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(END_OF_STREAM),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the length field and type code of the record whose tag sits
    /// at `offset`. Leaves the reader at the first payload byte.
    pub fn resolve(&mut self, offset: u64, parent: u8, child: u8) -> Result<TagRecord> {
        self.reader.seek(SeekFrom::Start(offset + 2))?;

        let length_width = length_width(parent, child);
        let raw_length = match length_width {
            LengthWidth::Two => self.reader.read_u16::<LittleEndian>()? as u64,
            LengthWidth::Four => self.reader.read_u32::<LittleEndian>()? as u64,
            LengthWidth::Eight => self.reader.read_u64::<LittleEndian>()?,
        };
        let byte_length = raw_length.checked_sub(2).ok_or_else(|| {
            Ks2Error::Format(format!(
                "record ({}, {}) at {:#x}: length field {} is shorter than its header",
                parent, child, offset, raw_length
            ))
        })?;

        let type_code = if SHORT_EXPLICIT_TYPE_CHILDREN.contains(&child) {
            TypeCode::Explicit(self.reader.read_i16::<LittleEndian>()? as i32)
        } else if child == LONG_EXPLICIT_TYPE_CHILD {
            TypeCode::Explicit(self.reader.read_i32::<LittleEndian>()?)
        } else {
            self.reader.seek(SeekFrom::Current(1))?;
            TypeCode::from_rdtp(self.reader.read_u8()?)
        };

        let payload_offset = offset + length_width.header_overhead();
        self.reader.seek(SeekFrom::Start(payload_offset))?;

        Ok(TagRecord {
            parent,
            child,
            length_width,
            byte_length,
            type_code,
            payload_offset,
            offset,
        })
    }

    /// Read exactly `len` payload bytes from the current position.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` from the current position.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf)?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.reader.read_u8()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.reader.read_u64::<LittleEndian>()?)
    }

    /// Total stream length. The read position is left unchanged.
    pub fn stream_len(&mut self) -> Result<u64> {
        let pos = self.reader.stream_position()?;
        let len = self.reader.seek(SeekFrom::End(0))?;
        self.reader.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }
}
