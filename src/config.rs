use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config_file::FromConfigFile;
use serde::Deserialize;

use crate::ddp;
use crate::effects::bar::BarConfig;
use crate::error::Error;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub device: DeviceConfig,
    #[serde(default)]
    pub effect: BarConfig,
    #[serde(default)]
    pub beat: BeatConfig,
    #[serde(default)]
    pub osc: OscConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Hostname or IP address of the device
    pub ip_address: String,
    pub pixel_count: usize,
    /// Maximum rate that pixels are sent to the device
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u32,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_datalen")]
    pub max_datalen: usize,
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct BeatConfig {
    #[serde(default = "default_bpm")]
    pub bpm: f32,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct OscConfig {
    pub listen_addr: Option<SocketAddr>,
}

fn default_name() -> String {
    "ddp".to_string()
}

fn default_refresh_rate() -> u32 {
    60
}

fn default_port() -> u16 {
    ddp::PORT
}

fn default_max_datalen() -> usize {
    ddp::MAX_DATALEN
}

fn default_resolve_timeout_ms() -> u64 {
    500
}

fn default_bpm() -> f32 {
    120.0
}

impl Default for BeatConfig {
    fn default() -> Self {
        BeatConfig { bpm: default_bpm() }
    }
}

impl DeviceConfig {
    #[cfg(test)]
    pub fn new(name: &str, ip_address: &str, pixel_count: usize) -> DeviceConfig {
        DeviceConfig {
            name: name.to_string(),
            ip_address: ip_address.to_string(),
            pixel_count,
            refresh_rate: default_refresh_rate(),
            port: default_port(),
            max_datalen: default_max_datalen(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
        }
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.ip_address.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "device {}: ip_address must not be empty",
                self.name
            )));
        }
        if self.pixel_count == 0 {
            return Err(Error::Configuration(format!(
                "device {}: pixel_count must be positive",
                self.name
            )));
        }
        if self.refresh_rate == 0 {
            return Err(Error::Configuration(format!(
                "device {}: refresh_rate must be positive",
                self.name
            )));
        }
        if self.max_datalen == 0 || self.max_datalen > u16::MAX as usize {
            return Err(Error::Configuration(format!(
                "device {}: max_datalen must be within 1..={}",
                self.name,
                u16::MAX
            )));
        }
        // Offsets are 32 bit on the wire.
        if self.pixel_count.saturating_mul(3) > u32::MAX as usize {
            return Err(Error::Configuration(format!(
                "device {}: pixel_count {} does not fit in a DDP frame",
                self.name, self.pixel_count
            )));
        }
        Ok(())
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let path = path.as_ref();
        let config = Config::from_config_file(path).map_err(|err| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), err))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.device.validate()?;
        self.effect.validate()?;
        if !(self.beat.bpm > 0.0 && self.beat.bpm.is_finite()) {
            return Err(Error::Configuration(format!(
                "bpm must be positive, got {}",
                self.beat.bpm
            )));
        }
        Ok(())
    }
}
