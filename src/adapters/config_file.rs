//! JSON config file adapter.
//!
//! Implements [`ConfigPort`] on top of a JSON file on disk.
//!
//! - Missing file: defaults (first run).
//! - `DESK_MAC_ADDRESS`, `DESK_ADAPTER_NAME`, `DESK_MIN_HEIGHT_MM` and
//!   `DESK_MAX_HEIGHT_MM` override file values on load.
//! - Every field is range-checked after overrides and before persisting;
//!   the device address is normalized to upper case with colon separators.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::DeskConfig;
use crate::units;

use super::utils::normalize_address;

const ENV_PREFIX: &str = "DESK_";

/// Heights beyond this are rejected before any raw conversion.
const MAX_SANE_HEIGHT_MM: i32 = 10_000;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<DeskConfig, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                warn!("config: {} is not valid: {}", self.path.display(), e);
                ConfigError::Corrupted
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("config: {} not found, using defaults", self.path.display());
                Ok(DeskConfig::default())
            }
            Err(e) => {
                warn!("config: reading {} failed: {}", self.path.display(), e);
                Err(ConfigError::IoError)
            }
        }
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<DeskConfig, ConfigError> {
        let mut cfg = self.read()?;
        apply_overrides(&mut cfg, |key| std::env::var(key).ok())?;
        let cfg = validate_config(cfg)?;
        info!(
            "config: desk '{}' at {} via {}",
            cfg.name, cfg.mac_address, cfg.adapter_name
        );
        Ok(cfg)
    }

    fn save(&self, config: &DeskConfig) -> Result<(), ConfigError> {
        let cfg = validate_config(config.clone())?;
        let json = serde_json::to_string_pretty(&cfg).map_err(|_| ConfigError::IoError)?;
        std::fs::write(&self.path, json).map_err(|e| {
            warn!("config: writing {} failed: {}", self.path.display(), e);
            ConfigError::IoError
        })?;
        info!("config: saved to {}", self.path.display());
        Ok(())
    }
}

/// Apply `DESK_*` overrides.  `lookup` resolves a variable name to its value.
pub fn apply_overrides(
    cfg: &mut DeskConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

    if let Some(v) = var("MAC_ADDRESS") {
        cfg.mac_address = v;
    }
    if let Some(v) = var("ADAPTER_NAME") {
        cfg.adapter_name = v;
    }
    if let Some(v) = var("MIN_HEIGHT_MM") {
        cfg.min_height_mm = v
            .trim()
            .parse()
            .map_err(|_| ConfigError::ValidationFailed("DESK_MIN_HEIGHT_MM must be an integer"))?;
    }
    if let Some(v) = var("MAX_HEIGHT_MM") {
        cfg.max_height_mm = v
            .trim()
            .parse()
            .map_err(|_| ConfigError::ValidationFailed("DESK_MAX_HEIGHT_MM must be an integer"))?;
    }
    Ok(())
}

/// Range-check every field and normalize the device address.
pub fn validate_config(mut cfg: DeskConfig) -> Result<DeskConfig, ConfigError> {
    if cfg.name.trim().is_empty() {
        return Err(ConfigError::ValidationFailed("name must not be empty"));
    }
    if cfg.adapter_name.trim().is_empty() {
        return Err(ConfigError::ValidationFailed("adapter_name must not be empty"));
    }
    cfg.mac_address = normalize_address(&cfg.mac_address).ok_or(ConfigError::ValidationFailed(
        "mac_address must be XX:XX:XX:XX:XX:XX, XX-XX-XX-XX-XX-XX or a UUID",
    ))?;

    if !(0..=MAX_SANE_HEIGHT_MM).contains(&cfg.min_height_mm)
        || !(0..=MAX_SANE_HEIGHT_MM).contains(&cfg.max_height_mm)
    {
        return Err(ConfigError::ValidationFailed(
            "height bounds must be 0–10000 mm",
        ));
    }
    if cfg.min_height_mm >= cfg.max_height_mm - 1 {
        return Err(ConfigError::ValidationFailed(
            "min_height_mm must be below max_height_mm - 1",
        ));
    }
    if units::to_raw(cfg.max_height_mm - 1) > i32::from(u16::MAX) {
        return Err(ConfigError::ValidationFailed(
            "max_height_mm exceeds the desk's raw range",
        ));
    }
    if !(1..=5000).contains(&cfg.poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "poll_interval_ms must be 1–5000",
        ));
    }
    if !(1..=1000).contains(&cfg.stall_ticks) {
        return Err(ConfigError::ValidationFailed("stall_ticks must be 1–1000"));
    }
    if !(100..=60_000).contains(&cfg.connect_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "connect_timeout_ms must be 100–60000",
        ));
    }
    if cfg.retry_count > 10 {
        return Err(ConfigError::ValidationFailed("retry_count must be 0–10"));
    }
    if cfg.retry_delay_ms > 60_000 {
        return Err(ConfigError::ValidationFailed(
            "retry_delay_ms must be 0–60000",
        ));
    }
    Ok(cfg)
}
