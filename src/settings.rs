use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::buffer::DEFAULT_CAPACITY;

pub const CONFIG_PATH_ENV: &str = "SENSOR_MAP_CONFIG";
pub const BROKER_HOST_ENV: &str = "SENSOR_MAP_BROKER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    pub client_id: String,
    pub connect_timeout_secs: u64,
    /// Payloads queued between the MQTT event loop and ingestion.
    pub channel_capacity: usize,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            keep_alive_secs: 60,
            client_id: "sensor-map".into(),
            connect_timeout_secs: 10,
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LiveSettings {
    pub capacity: usize,
    pub redraw_interval_ms: u64,
    /// The log renderer reports the window once every this many frames.
    pub log_every_frames: u32,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            redraw_interval_ms: 30,
            log_every_frames: 100,
        }
    }
}

impl LiveSettings {
    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.redraw_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportSettings {
    pub width_px: u32,
    pub height_px: u32,
    pub point_radius_px: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        // 12x10 inches at 300 dpi.
        Self {
            width_px: 3600,
            height_px: 3000,
            point_radius_px: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub topic: String,
    pub live: LiveSettings,
    pub results_dir: PathBuf,
    pub report: ReportSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings::default(),
            topic: "sensors/distance".into(),
            live: LiveSettings::default(),
            results_dir: PathBuf::from("results"),
            report: ReportSettings::default(),
        }
    }
}

impl Settings {
    /// Reads a JSON settings file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults, or the file named by `SENSOR_MAP_CONFIG`, with the broker
    /// host overridable through `SENSOR_MAP_BROKER`.
    pub fn from_env() -> Result<Self> {
        let mut settings = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(host) = std::env::var(BROKER_HOST_ENV) {
            if !host.trim().is_empty() {
                settings.broker.host = host.trim().to_string();
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.is_empty() {
            bail!("topic must not be empty");
        }
        if self.live.capacity == 0 {
            bail!("live.capacity must be greater than zero");
        }
        if self.live.redraw_interval_ms == 0 {
            bail!("live.redraw_interval_ms must be greater than zero");
        }
        if self.report.width_px == 0 || self.report.height_px == 0 {
            bail!("report dimensions must be greater than zero");
        }
        if self.broker.keep_alive_secs < 5 {
            bail!("broker.keep_alive_secs must be at least 5");
        }
        if self.broker.channel_capacity == 0 {
            bail!("broker.channel_capacity must be greater than zero");
        }
        Ok(())
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.live.capacity, 500);
        assert_eq!(settings.broker.port, 1883);
        assert_eq!(settings.topic, "sensors/distance");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"broker": {"host": "10.0.0.7"}, "live": {"capacity": 50}}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.broker.host, "10.0.0.7");
        assert_eq!(settings.broker.port, 1883);
        assert_eq!(settings.live.capacity, 50);
        assert_eq!(settings.live.redraw_interval_ms, 30);
    }

    #[test]
    fn persisted_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.results_dir = PathBuf::from("elsewhere");
        settings.persist(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut settings = Settings::default();
        settings.live.capacity = 0;
        assert!(settings.validate().is_err());
    }
}
