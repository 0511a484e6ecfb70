// Example usage of KS2 reader

use ks2_reader::{Ks2Reader, ReaderConfig, Result};
use tracing::{debug, info, Level};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Stream the sample block in 64 MiB chunks
    let config = ReaderConfig {
        memory_cap_bytes: 64 * 1024 * 1024,
        ..Default::default()
    };

    let reader = Ks2Reader::open_with_config("data/recording.ks2", config)?;
    info!(
        "{} channels at {} Hz",
        reader.header().recorded_channels,
        reader.header().sampling_frequency
    );

    let file = reader.decode()?;
    for warning in &file.warnings {
        info!("warning: {}", warning);
    }

    // List all channels
    info!("Channels:");
    for ch in 0..file.channel_count() {
        let unit = file
            .channels
            .unit
            .as_ref()
            .and_then(|units| units.get(ch))
            .map(String::as_str)
            .unwrap_or("");
        info!("  [{}] {} ({})", ch + 1, file.channels.channel_name(ch), unit);
    }

    let Some(raw) = file.samples.as_ref() else {
        info!("No sample block decoded");
        return Ok(());
    };
    info!("Raw matrix: {} x {} {:?}", raw.rows(), raw.channels(), raw.type_code());

    let physical = file.physical()?;
    if let Some(first) = physical.row(0) {
        info!("First sample: {:?}", first);
    }
    for (i, t) in file.time_values().iter().enumerate().take(5) {
        debug!("t={:.6} s -> {:?}", t, physical.row(i));
    }

    Ok(())
}
