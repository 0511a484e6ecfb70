use anyhow::{anyhow, Context, Result};
use ks2_reader::ReaderConfig;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

static CONFIG_CACHE: OnceLock<ReaderConfig> = OnceLock::new();

const DEFAULT_CONFIG_FILE: &str = "ks2.json";
pub const MEMORY_CAP_ENV: &str = "KS2_MEMORY_CAP";

pub fn init_config(path: Option<&Path>) -> Result<()> {
    let mut config = load_config(path)?;

    // === ENV PATCH ===
    apply_memory_cap_override(&mut config, std::env::var(MEMORY_CAP_ENV).ok())?;
    config.validate()?;

    info!(
        "Config initialized: memory cap {} bytes, data block {}",
        config.memory_cap_bytes, config.data_block
    );

    CONFIG_CACHE
        .set(config)
        .map_err(|_| anyhow!("Config already initialized"))?;

    Ok(())
}

/// An explicit path must exist; the default file is optional.
pub fn load_config(path: Option<&Path>) -> Result<ReaderConfig> {
    let (file_path, required) = match path {
        Some(p) => (p, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };

    if !required && !file_path.exists() {
        debug!("No {} found, using default configuration", DEFAULT_CONFIG_FILE);
        return Ok(ReaderConfig::default());
    }

    let data = fs::read_to_string(file_path)
        .with_context(|| format!("File read Error: {}", file_path.display()))?;

    serde_json::from_str(&data)
        .with_context(|| format!("JSON Parse Error: {}", file_path.display()))
}

pub fn apply_memory_cap_override(config: &mut ReaderConfig, value: Option<String>) -> Result<()> {
    if let Some(value) = value {
        config.memory_cap_bytes = value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a byte count, got {:?}", MEMORY_CAP_ENV, value))?;
    }
    Ok(())
}

pub fn get_cached_config() -> &'static ReaderConfig {
    CONFIG_CACHE.get().expect("Config not initialized")
}
