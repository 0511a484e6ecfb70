use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info, warn, Level};

mod models;
mod utils;

use crate::models::cli_options::{is_json_path, usage, CliOptions};
use crate::utils::conf_helper::{get_cached_config, init_config};
use ks2_reader::{read_file, select_channels, summarize, write_csv, write_json, Ks2File};

fn main() {
    let options = match CliOptions::parse(env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", usage());
            process::exit(1);
        }
    };

    if options.help {
        println!("{}", usage());
        return;
    }

    let Some(filename) = options.filename.clone() else {
        eprintln!("{}", usage());
        process::exit(1);
    };

    tracing_subscriber::fmt()
        .with_max_level(if options.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&options, &filename) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(options: &CliOptions, filename: &Path) -> Result<()> {
    init_config(options.config.as_deref())?;
    let config = get_cached_config();

    let file = read_file(filename, config.clone())
        .with_context(|| format!("Error loading KS2 file '{}'", filename.display()))?;
    println!("{}", file);

    let channels = select_channels(&file, &options.channels)?;

    if options.channels_ignored_by_export() {
        warn!("--channels does not apply to the JSON dump, all channels are written");
    }

    if options.wants_save() {
        let output = options
            .output
            .clone()
            .unwrap_or_else(|| default_output(filename));
        save(&file, &output, &channels)?;
    }

    if options.plot {
        print_summary(&file, &channels)?;
    }

    Ok(())
}

/// `<stem>.csv` in the working directory.
fn default_output(filename: &Path) -> PathBuf {
    let stem = filename.file_stem().unwrap_or(filename.as_os_str());
    PathBuf::from(stem).with_extension("csv")
}

fn save(file: &Ks2File, output: &Path, channels: &[usize]) -> Result<()> {
    let written = if is_json_path(output) {
        write_json(file, output)
    } else {
        write_csv(file, output, channels)
    };
    written.with_context(|| format!("Error writing '{}'", output.display()))?;

    info!("Total samples written: {}", file.sample_count());
    Ok(())
}

fn print_summary(file: &Ks2File, channels: &[usize]) -> Result<()> {
    let physical = file.physical()?;
    let duration = if file.header.sampling_frequency > 0.0 {
        file.sample_count() as f64 / file.header.sampling_frequency
    } else {
        0.0
    };

    println!();
    println!("Channel Statistics ({} samples, {:.6} s):", file.sample_count(), duration);
    for summary in summarize(file, &physical, channels) {
        println!(
            "  CH{} {} [{}]: min={:.6}, max={:.6}, mean={:.6}",
            summary.channel, summary.name, summary.unit, summary.min, summary.max, summary.mean
        );
    }
    Ok(())
}
