//! Configuration file handling

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ct0045r::{transmit_interval_for_baud, SessionConfig, DEFAULT_BAUD};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub line: LineConfig,
    pub session: SessionSection,
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the config file path for this platform
    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wctablet").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load config from the platform path, or create a default if it doesn't exist.
    /// Returns the path of a newly created file.
    pub fn load_or_create() -> Result<(Self, Option<PathBuf>), Box<dyn Error>> {
        let path = Self::path().ok_or("could not determine config directory")?;
        let (config, created) = Self::load_or_create_at(&path)?;
        Ok((config, created.then_some(path)))
    }

    /// Load config from `path`, writing the defaults there first if it doesn't exist.
    /// The flag is set when the file was created.
    pub fn load_or_create_at(path: &Path) -> Result<(Self, bool), Box<dyn Error>> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }
        let config = Config::default();
        config.save_with_header(path)?;
        Ok((config, true))
    }

    /// Load config from an explicit path, which must exist
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save config with header comments for new files
    pub fn save_with_header(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = r#"# wctablet configuration file
# durations accept humantime values such as "1ms" or "250us"

"#;
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }

    /// Time between drain ticks: the explicit override, else one byte at the line speed
    pub fn transmit_interval(&self) -> Duration {
        self.line
            .transmit_interval
            .unwrap_or_else(|| transmit_interval_for_baud(self.line.baud))
    }

    /// Parameters for a new tablet session
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            output_capacity: self.session.output_capacity,
            transmit_interval: self.transmit_interval(),
            ignore_idle_filler: self.session.ignore_idle_filler,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Emulated line speed, used to pace output
    pub baud: u32,
    /// Bytes the line accepts per tick
    pub burst: usize,
    /// Fixed tick interval, overriding the one derived from `baud`
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub transmit_interval: Option<Duration>,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            burst: 1,
            transmit_interval: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Output buffer size in bytes
    pub output_capacity: usize,
    /// Ignore `@` bytes sent by the host on an idle line
    pub ignore_idle_filler: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            output_capacity: defaults.output_capacity,
            ignore_idle_filler: defaults.ignore_idle_filler,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter used when RUST_LOG is unset, e.g. "info" or "ct0045r=trace"
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [line]
            baud = 1200

            [session]
            output_capacity = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.line.baud, 1200);
        assert_eq!(config.line.burst, 1);
        assert_eq!(config.session.output_capacity, 1024);
        assert!(config.session.ignore_idle_filler);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.transmit_interval(), transmit_interval_for_baud(1200));
    }

    #[test]
    fn interval_override() {
        let config: Config = toml::from_str(
            r#"
            [line]
            transmit_interval = "20ms"
            "#,
        )
        .unwrap();
        assert_eq!(config.session_config().transmit_interval, Duration::from_millis(20));
    }

    #[test]
    fn written_file_loads_back() {
        let dir = std::env::temp_dir().join(format!("wctablet-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = Config::default();
        config.line.burst = 4;
        config.line.transmit_interval = Some(Duration::from_micros(250));
        config.save_with_header(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file_is_created_once() {
        let dir = std::env::temp_dir().join(format!("wctablet-create-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");

        let (created, fresh) = Config::load_or_create_at(&path).unwrap();
        assert!(fresh);
        assert!(path.exists());
        assert_eq!(created, Config::default());

        let (loaded, fresh) = Config::load_or_create_at(&path).unwrap();
        assert!(!fresh);
        assert_eq!(loaded, created);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn default_session_matches_device_defaults() {
        assert_eq!(Config::default().session_config(), SessionConfig::default());
    }
}
