use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::scan::{ScanConfig, MAX_WINDOW, MIN_INTERVAL};
use crate::wifi::{ProvisionOptions, DEFAULT_MAC_INTERFACE};

const DEFAULT_SOURCE: &str = "stub://camera";
const DEFAULT_INTERVAL_MS: u64 = 333;
const DEFAULT_COOLDOWN_MS: u64 = 2000;
const DEFAULT_DECODER: &str = "rqrr";
const SYNTHETIC_DECODER: &str = "stub";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 15;
const MAX_COMMAND_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ScannerConfigFile {
    source: Option<String>,
    decoder: Option<String>,
    scan: Option<ScanConfigFile>,
    wifi: Option<WifiConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ScanConfigFile {
    interval_ms: Option<u64>,
    cooldown_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct WifiConfigFile {
    mac_interface: Option<String>,
    command_timeout_secs: Option<u64>,
    settle_ms: Option<u64>,
}

/// Command-line values applied after the file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<String>,
    pub decoder: Option<String>,
    pub interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub source: String,
    pub decoder: String,
    pub scan: ScanSettings,
    pub wifi: WifiSettings,
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub interval: Duration,
    pub cooldown: Duration,
}

#[derive(Debug, Clone)]
pub struct WifiSettings {
    pub mac_interface: String,
    pub command_timeout: Duration,
    pub settle: Option<Duration>,
}

impl ScannerConfig {
    /// Defaults, then the JSON file named by `QRSCAN_CONFIG`, then `QRSCAN_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_with(Overrides::default())
    }

    /// `load`, with command-line overrides applied before validation.
    ///
    /// When no decoder is named anywhere, `stub://` sources get the `stub`
    /// decoder and everything else gets `rqrr`.
    pub fn load_with(overrides: Overrides) -> Result<Self> {
        let config_path = std::env::var("QRSCAN_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.apply_overrides(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScannerConfigFile) -> Self {
        let scan = file.scan.unwrap_or_default();
        let wifi = file.wifi.unwrap_or_default();
        Self {
            source: file.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            decoder: file
                .decoder
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
            scan: ScanSettings {
                interval: Duration::from_millis(scan.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS)),
                cooldown: Duration::from_millis(scan.cooldown_ms.unwrap_or(DEFAULT_COOLDOWN_MS)),
            },
            wifi: WifiSettings {
                mac_interface: wifi
                    .mac_interface
                    .unwrap_or_else(|| DEFAULT_MAC_INTERFACE.to_string()),
                command_timeout: Duration::from_secs(
                    wifi.command_timeout_secs
                        .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
                ),
                settle: wifi.settle_ms.map(Duration::from_millis),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("QRSCAN_SOURCE") {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Ok(decoder) = std::env::var("QRSCAN_DECODER") {
            if !decoder.trim().is_empty() {
                self.decoder = decoder.trim().to_string();
            }
        }
        if let Ok(iface) = std::env::var("QRSCAN_WIFI_INTERFACE") {
            if !iface.trim().is_empty() {
                self.wifi.mac_interface = iface.trim().to_string();
            }
        }
        if let Some(ms) = env_u64("QRSCAN_INTERVAL_MS", "milliseconds")? {
            self.scan.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("QRSCAN_COOLDOWN_MS", "milliseconds")? {
            self.scan.cooldown = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64("QRSCAN_COMMAND_TIMEOUT_SECS", "seconds")? {
            self.wifi.command_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(source) = overrides.source {
            self.source = source;
        }
        if let Some(decoder) = overrides.decoder {
            self.decoder = decoder.trim().to_string();
        }
        if let Some(interval) = overrides.interval {
            self.scan.interval = interval;
        }
    }

    fn resolve_decoder(&mut self) {
        if self.decoder.is_empty() {
            self.decoder = default_decoder_for(&self.source).to_string();
        }
    }

    fn validate(&mut self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(anyhow!("source must not be empty"));
        }
        self.resolve_decoder();
        if self.source.starts_with("stub://") && self.decoder != SYNTHETIC_DECODER {
            log::warn!(
                "decoder {} cannot read synthetic frames from {}; use --decoder {}",
                self.decoder,
                self.source,
                SYNTHETIC_DECODER
            );
        }
        if self.scan.interval < MIN_INTERVAL {
            log::warn!(
                "scan interval {:?} below floor; using {:?}",
                self.scan.interval,
                MIN_INTERVAL
            );
            self.scan.interval = MIN_INTERVAL;
        }
        if self.scan.interval > MAX_WINDOW {
            return Err(anyhow!("scan interval must be at most {:?}", MAX_WINDOW));
        }
        if self.scan.cooldown.is_zero() {
            return Err(anyhow!("scan cooldown must be greater than zero"));
        }
        if self.scan.cooldown > MAX_WINDOW {
            return Err(anyhow!("scan cooldown must be at most {:?}", MAX_WINDOW));
        }
        if self.wifi.command_timeout.is_zero() {
            return Err(anyhow!("wifi command timeout must be greater than zero"));
        }
        if self.wifi.command_timeout > MAX_COMMAND_TIMEOUT {
            return Err(anyhow!(
                "wifi command timeout must be at most {:?}",
                MAX_COMMAND_TIMEOUT
            ));
        }
        if self.wifi.settle.is_some_and(|settle| settle > MAX_WINDOW) {
            return Err(anyhow!("wifi settle period must be at most {:?}", MAX_WINDOW));
        }
        if self.wifi.mac_interface.trim().is_empty() {
            return Err(anyhow!("wifi interface must not be empty"));
        }
        Ok(())
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::new(self.scan.interval, self.scan.cooldown)
    }

    pub fn provision_options(&self) -> ProvisionOptions {
        ProvisionOptions {
            mac_interface: self.wifi.mac_interface.clone(),
            settle_override: self.wifi.settle,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        let mut cfg = Self::from_file(ScannerConfigFile::default());
        cfg.resolve_decoder();
        cfg
    }
}

fn default_decoder_for(source: &str) -> &'static str {
    if source.starts_with("stub://") {
        SYNTHETIC_DECODER
    } else {
        DEFAULT_DECODER
    }
}

fn env_u64(key: &str, unit: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be an integer number of {}", key, unit)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<ScannerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
