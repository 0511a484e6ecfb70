// Export of decoded files: CSV table, JSON dump and per-channel summary

use crate::core::error::{Ks2Error, Result};
use crate::core::format::Ks2File;
use crate::core::samples::{PhysicalMatrix, SampleMatrix};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Turn 1-based channel numbers into column positions. An empty request
/// selects every channel.
pub fn select_channels(file: &Ks2File, requested: &[usize]) -> Result<Vec<usize>> {
    let available = file.channel_count();
    if requested.is_empty() {
        return Ok((0..available).collect());
    }
    requested
        .iter()
        .map(|&channel| {
            if channel == 0 || channel > available {
                Err(Ks2Error::ChannelOutOfRange { channel, available })
            } else {
                Ok(channel - 1)
            }
        })
        .collect()
}

pub fn write_csv<P: AsRef<Path>>(file: &Ks2File, output: P, channels: &[usize]) -> Result<()> {
    let writer = BufWriter::new(File::create(output.as_ref())?);
    write_csv_to(file, writer, channels)?;
    info!("Data saved as CSV: {}", output.as_ref().display());
    Ok(())
}

/// Metadata rows, a `Time,<names>` row, then one row per sample of
/// physical values for the selected columns.
pub fn write_csv_to<W: Write>(file: &Ks2File, mut writer: W, channels: &[usize]) -> Result<()> {
    let physical = file.physical()?;
    let meta = &file.channels;
    let time = file
        .acquisition
        .start_time
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default();

    write_row(&mut writer, &[format!("Device: {}", file.header.device)])?;
    write_row(&mut writer, &[format!("Project: {}", file.header.project)])?;
    write_labeled(&mut writer, "Number channels: ", [file.channel_count()])?;
    write_labeled(&mut writer, "Number samples: ", [file.sample_count()])?;
    write_labeled(&mut writer, "Frequency samples: ", [file.header.sampling_frequency])?;
    write_labeled(&mut writer, "Number blocks: ", [file.header.data_blocks])?;
    write_labeled(&mut writer, "Time: ", [time])?;
    write_labeled(&mut writer, "Units: ", pick(meta.unit.as_deref(), channels))?;
    write_labeled(&mut writer, "Ranges: ", pick(meta.range.as_deref(), channels))?;
    write_labeled(&mut writer, "Calibrations: ", pick(meta.cal_coef.as_deref(), channels))?;
    write_labeled(&mut writer, "Offsets: ", pick(meta.offset.as_deref(), channels))?;
    write_labeled(&mut writer, "LPFinfo: ", pick(meta.lpf.as_deref(), channels))?;
    write_labeled(&mut writer, "HPFinfo: ", pick(meta.hpf.as_deref(), channels))?;
    write_row(&mut writer, &["Channels: ".to_string()])?;

    let mut names = vec!["Time".to_string()];
    names.extend(channels.iter().map(|&ch| meta.channel_name(ch)));
    write_row(&mut writer, &names)?;

    for (i, t) in file.time_values().iter().enumerate() {
        let mut row = vec![t.to_string()];
        for &ch in channels {
            row.push(physical.get(i, ch).map(|v| v.to_string()).unwrap_or_default());
        }
        write_row(&mut writer, &row)?;
    }

    writer.flush()?;
    Ok(())
}

fn pick<T: ToString>(column: Option<&[T]>, channels: &[usize]) -> Vec<String> {
    match column {
        Some(values) => channels
            .iter()
            .map(|&ch| values.get(ch).map(|v| v.to_string()).unwrap_or_default())
            .collect(),
        None => Vec::new(),
    }
}

fn write_labeled<W, I, T>(writer: &mut W, label: &str, values: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = T>,
    T: ToString,
{
    let mut row = vec![label.to_string()];
    row.extend(values.into_iter().map(|v| v.to_string()));
    write_row(writer, &row)
}

fn write_row<W: Write>(writer: &mut W, fields: &[String]) -> Result<()> {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    writeln!(writer, "{}", line.join(","))?;
    Ok(())
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Key-value dump of the metadata and the raw matrix.
#[derive(Serialize)]
#[allow(non_snake_case)]
struct Ks2Dump<'a> {
    name: &'a str,
    datetime: Option<NaiveDateTime>,
    fs: f64,
    samp_n: Option<u64>,
    ch_n: usize,
    chIndex: Option<&'a [i16]>,
    ch_name: Option<&'a [String]>,
    chUnit: Option<&'a [String]>,
    range: Option<&'a [String]>,
    coef_a: Option<&'a [f32]>,
    coef_b: Option<&'a [f32]>,
    calCoef: Option<&'a [f32]>,
    meaZero: Option<&'a [f32]>,
    LPFinfo: Option<&'a [String]>,
    HPFinfo: Option<&'a [String]>,
    RAW: Option<&'a SampleMatrix>,
}

pub fn write_json<P: AsRef<Path>>(file: &Ks2File, output: P) -> Result<()> {
    let writer = BufWriter::new(File::create(output.as_ref())?);
    write_json_to(file, writer)?;
    info!("Data saved as JSON: {}", output.as_ref().display());
    Ok(())
}

pub fn write_json_to<W: Write>(file: &Ks2File, mut writer: W) -> Result<()> {
    let meta = &file.channels;
    let dump = Ks2Dump {
        name: &file.header.project,
        datetime: file.acquisition.start_time,
        fs: file.header.sampling_frequency,
        samp_n: file.acquisition.sample_count,
        ch_n: file.channel_count(),
        chIndex: meta.index.as_deref(),
        ch_name: meta.name.as_deref(),
        chUnit: meta.unit.as_deref(),
        range: meta.range.as_deref(),
        coef_a: meta.coef_a.as_deref(),
        coef_b: meta.coef_b.as_deref(),
        calCoef: meta.cal_coef.as_deref(),
        meaZero: meta.offset.as_deref(),
        LPFinfo: meta.lpf.as_deref(),
        HPFinfo: meta.hpf.as_deref(),
        RAW: file.samples.as_ref(),
    };
    serde_json::to_writer(&mut writer, &dump)?;
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub channel: usize,
    pub name: String,
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Min, max and mean of each selected column of physical values.
pub fn summarize(file: &Ks2File, physical: &PhysicalMatrix, channels: &[usize]) -> Vec<ChannelSummary> {
    channels
        .iter()
        .filter_map(|&ch| {
            let column = physical.column(ch)?;
            let min = column.iter().fold(f64::INFINITY, |a, &b| a.min(b));
            let max = column.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            let mean = if column.is_empty() {
                f64::NAN
            } else {
                column.iter().sum::<f64>() / column.len() as f64
            };
            Some(ChannelSummary {
                channel: ch + 1,
                name: file.channels.channel_name(ch),
                unit: file
                    .channels
                    .unit
                    .as_ref()
                    .and_then(|units| units.get(ch).cloned())
                    .unwrap_or_default(),
                min,
                max,
                mean,
            })
        })
        .collect()
}
