use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Gateway config file looked up in the working directory unless
/// `IOTWIFI_GATEWAY_CONFIG` points elsewhere.
pub const DEFAULT_CONFIG_FILE: &str = "iotwifi.toml";

// ============= 网关配置 =============

/// 顶层网关配置
///
/// Every field has a default so the TOML file is optional. Environment
/// variables win over file values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Adapter manager config (JSON), `IOTWIFI_CFG`.
    pub adapter_config_path: PathBuf,
    /// Seconds to sleep before starting, `IOTWIFI_BOOT_DELAY`.
    pub boot_delay_secs: u64,
    pub call_timeout_secs: u64,
    pub command_capacity: usize,
    pub command_send_timeout_ms: u64,
    pub shutdown_drain_secs: u64,
    /// `RUST_LOG`-style filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            adapter_config_path: PathBuf::from("cfg/wificfg.json"),
            boot_delay_secs: 0,
            call_timeout_secs: 30,
            command_capacity: 1,
            command_send_timeout_ms: 1000,
            shutdown_drain_secs: 5,
            log_filter: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Loads the TOML file (if any), applies environment overrides and validates.
    pub fn load() -> Result<Self> {
        let path = std::env::var("IOTWIFI_GATEWAY_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(Error::Io(err)),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Applies `IOTWIFI_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("IOTWIFI_CFG").filter(|v| !v.is_empty()) {
            self.adapter_config_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("IOTWIFI_PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid IOTWIFI_PORT={}", val),
            }
        }
        if let Some(val) = lookup("IOTWIFI_BOOT_DELAY") {
            // 无法解析时视为 0
            self.boot_delay_secs = val.parse().unwrap_or(0);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn boot_delay(&self) -> Duration {
        Duration::from_secs(self.boot_delay_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn command_send_timeout(&self) -> Duration {
        Duration::from_millis(self.command_send_timeout_ms)
    }

    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_secs)
    }
}

// ============= 网卡配置 =============

/// Adapter manager settings, read from the JSON file at `IOTWIFI_CFG`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub interface: String,
    pub scan_wait_ms: u64,
    pub connect_timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            interface: "wlan0".to_string(),
            scan_wait_ms: 3000,
            connect_timeout_secs: 20,
            poll_interval_secs: 5,
        }
    }
}

impl AdapterConfig {
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Adapter config {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(err) => Err(Error::Io(err)),
        }
    }

    pub fn scan_wait(&self) -> Duration {
        Duration::from_millis(self.scan_wait_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
