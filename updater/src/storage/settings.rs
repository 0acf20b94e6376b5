//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::UpdateError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Environment variable overriding the settings file location
pub const SETTINGS_ENV_VAR: &str = "SYSUPDATE_SETTINGS";

/// Default reboot countdown in seconds
pub const DEFAULT_COUNTDOWN_SECS: u64 = 10;

/// Updater settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON logs on stderr
    #[serde(default)]
    pub log_json: bool,

    /// Directory for a plain-text log file
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Reboot countdown used when `--countdown` is absent or invalid
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u64,

    /// Connectivity probe configuration
    #[serde(default)]
    pub connectivity: ConnectivitySettings,

    /// Advisory health thresholds
    #[serde(default)]
    pub health: HealthSettings,

    /// Ask before continuing when the host is not a Raspberry Pi
    #[serde(default)]
    pub expect_raspberry_pi: bool,
}

fn default_countdown_secs() -> u64 {
    DEFAULT_COUNTDOWN_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            log_json: false,
            log_dir: None,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            connectivity: ConnectivitySettings::default(),
            health: HealthSettings::default(),
            expect_raspberry_pi: false,
        }
    }
}

impl Settings {
    /// Default settings file for this platform
    pub fn default_file() -> File {
        if let Some(path) = std::env::var_os(SETTINGS_ENV_VAR) {
            return File::new(path);
        }

        #[cfg(target_os = "linux")]
        let path = PathBuf::from("/etc/sysupdate/settings.json");

        #[cfg(not(target_os = "linux"))]
        let path = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sysupdate")
            .join("settings.json");

        File::new(path)
    }

    /// Load settings; a missing file yields the defaults
    pub async fn load(file: &File) -> Result<Self, UpdateError> {
        match file.read_optional().await? {
            Some(contents) => Ok(serde_json::from_str(&contents)?),
            None => Ok(Self::default()),
        }
    }
}

/// Connectivity probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivitySettings {
    /// Skip the probe entirely
    #[serde(default)]
    pub disabled: bool,

    /// Host to connect to
    #[serde(default = "default_connectivity_host")]
    pub host: String,

    /// TCP port to connect to
    #[serde(default = "default_connectivity_port")]
    pub port: u16,

    /// Connect timeout in seconds
    #[serde(default = "default_connectivity_timeout")]
    pub timeout_secs: u64,
}

fn default_connectivity_host() -> String {
    "deb.debian.org".to_string()
}

fn default_connectivity_port() -> u16 {
    80
}

fn default_connectivity_timeout() -> u64 {
    5
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            disabled: false,
            host: default_connectivity_host(),
            port: default_connectivity_port(),
            timeout_secs: default_connectivity_timeout(),
        }
    }
}

/// Thresholds for the advisory temperature and disk checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Warn when the SoC temperature exceeds this value
    #[serde(default = "default_temperature_warn")]
    pub temperature_warn_celsius: f32,

    /// Warn when root filesystem usage exceeds this percentage
    #[serde(default = "default_disk_warn")]
    pub disk_warn_percent: f32,
}

fn default_temperature_warn() -> f32 {
    70.0
}

fn default_disk_warn() -> f32 {
    90.0
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            temperature_warn_celsius: default_temperature_warn(),
            disk_warn_percent: default_disk_warn(),
        }
    }
}
