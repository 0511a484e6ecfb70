// Channel table builder: accumulates per-channel columns during the
// variable-header pass and freezes them into ChannelMetadata.

use crate::core::error::{Ks2Error, Result};
use crate::core::format::ChannelMetadata;
use crate::core::record::{ChannelColumn, ColumnLayout};
use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

pub struct ChannelTableBuilder {
    table: ChannelMetadata,
}

impl ChannelTableBuilder {
    pub fn new(channel_count: usize) -> Self {
        Self {
            table: ChannelMetadata {
                channel_count,
                ..Default::default()
            },
        }
    }

    pub fn channel_count(&self) -> usize {
        self.table.channel_count
    }

    /// Decode one channel array payload and store it, replacing any earlier
    /// record for the same column.
    pub fn set_column(
        &mut self,
        column: ChannelColumn,
        layout: ColumnLayout,
        payload: &[u8],
    ) -> Result<()> {
        let n = self.table.channel_count;
        let needed = n * layout.width();
        if payload.len() < needed {
            return Err(Ks2Error::Format(format!(
                "channel column {:?} needs {} bytes for {} channels, record has {}",
                column,
                needed,
                n,
                payload.len()
            )));
        }
        let payload = &payload[..needed];

        match layout {
            ColumnLayout::I16 => {
                let mut values = vec![0i16; n];
                LittleEndian::read_i16_into(payload, &mut values);
                self.store_i16(column, values)
            }
            ColumnLayout::F32 => {
                let mut values = vec![0f32; n];
                LittleEndian::read_f32_into(payload, &mut values);
                self.store_f32(column, values)
            }
            ColumnLayout::Text(width) => {
                let values = payload.chunks(width).map(trim_padding).collect();
                self.store_text(column, values)
            }
        }
    }

    fn store_i16(&mut self, column: ChannelColumn, values: Vec<i16>) -> Result<()> {
        match column {
            ChannelColumn::Index => self.table.index = Some(values),
            other => return Err(layout_mismatch(other, "i16")),
        }
        Ok(())
    }

    fn store_f32(&mut self, column: ChannelColumn, values: Vec<f32>) -> Result<()> {
        debug!("channel column {:?}: {:?}", column, values);
        let slot = match column {
            ChannelColumn::CoefA => &mut self.table.coef_a,
            ChannelColumn::CoefB => &mut self.table.coef_b,
            ChannelColumn::CalCoef => &mut self.table.cal_coef,
            ChannelColumn::Offset => &mut self.table.offset,
            other => return Err(layout_mismatch(other, "f32")),
        };
        *slot = Some(values);
        Ok(())
    }

    fn store_text(&mut self, column: ChannelColumn, values: Vec<String>) -> Result<()> {
        debug!("channel column {:?}: {:?}", column, values);
        let slot = match column {
            ChannelColumn::Unit => &mut self.table.unit,
            ChannelColumn::Name => &mut self.table.name,
            ChannelColumn::Range => &mut self.table.range,
            ChannelColumn::Lpf => &mut self.table.lpf,
            ChannelColumn::Hpf => &mut self.table.hpf,
            other => return Err(layout_mismatch(other, "text")),
        };
        *slot = Some(values);
        Ok(())
    }

    /// Freeze the table, checking every present column has one entry per channel.
    pub fn finish(self) -> Result<ChannelMetadata> {
        let t = &self.table;
        let lengths = [
            ("index", t.index.as_ref().map(Vec::len)),
            ("coef_a", t.coef_a.as_ref().map(Vec::len)),
            ("coef_b", t.coef_b.as_ref().map(Vec::len)),
            ("unit", t.unit.as_ref().map(Vec::len)),
            ("cal_coef", t.cal_coef.as_ref().map(Vec::len)),
            ("offset", t.offset.as_ref().map(Vec::len)),
            ("range", t.range.as_ref().map(Vec::len)),
            ("lpf", t.lpf.as_ref().map(Vec::len)),
            ("hpf", t.hpf.as_ref().map(Vec::len)),
            ("name", t.name.as_ref().map(Vec::len)),
        ];
        for (column, len) in lengths {
            if let Some(len) = len {
                if len != t.channel_count {
                    return Err(Ks2Error::Format(format!(
                        "channel column {} has {} entries, expected {}",
                        column, len, t.channel_count
                    )));
                }
            }
        }
        Ok(self.table)
    }
}

fn layout_mismatch(column: ChannelColumn, layout: &str) -> Ks2Error {
    Ks2Error::Format(format!("channel column {:?} is not {} data", column, layout))
}

/// Text from a fixed-width field, right-trimmed of NUL and space padding.
pub fn trim_padding(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}
