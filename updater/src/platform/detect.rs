//! Platform detection
//!
//! The classification functions are pure; only [`detect_host`] touches the
//! filesystem.

use std::collections::HashMap;

use tracing::debug;

use crate::platform::paths::HostPaths;

/// Operating system family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsFamily {
    Debian,
    Ubuntu,
    Windows,
    Unsupported(String),
}

/// Everything the update sequence needs to know about the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProfile {
    pub os: OsFamily,

    /// Device tree identifies a Raspberry Pi board
    pub raspberry_pi: bool,

    /// Human readable OS name
    pub pretty_name: String,

    /// Board model, when the device tree provides one
    pub model: Option<String>,
}

impl HostProfile {
    pub fn uses_apt(&self) -> bool {
        matches!(self.os, OsFamily::Debian | OsFamily::Ubuntu)
    }

    pub fn supports_firmware_update(&self) -> bool {
        self.raspberry_pi && self.uses_apt()
    }

    pub fn supports_release_upgrade(&self) -> bool {
        self.os == OsFamily::Ubuntu
    }

    /// Treat an unsupported host as a generic Debian derivative
    pub fn as_generic_debian(&self) -> Self {
        Self {
            os: OsFamily::Debian,
            ..self.clone()
        }
    }
}

/// Parse `KEY=value` lines of an os-release file
pub fn parse_os_release(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Classify an os-release descriptor
pub fn classify_os(os_release: &HashMap<String, String>) -> OsFamily {
    let id = os_release.get("ID").map(|s| s.to_lowercase()).unwrap_or_default();
    let id_like: Vec<String> = os_release
        .get("ID_LIKE")
        .map(|s| s.split_whitespace().map(str::to_lowercase).collect())
        .unwrap_or_default();

    match id.as_str() {
        "ubuntu" => OsFamily::Ubuntu,
        "debian" | "raspbian" => OsFamily::Debian,
        _ if id_like.iter().any(|like| like == "ubuntu" || like == "debian") => OsFamily::Debian,
        "" => OsFamily::Unsupported("unknown".to_string()),
        other => OsFamily::Unsupported(other.to_string()),
    }
}

/// Whether a device tree model string names a Raspberry Pi board
pub fn is_raspberry_pi_model(model: &str) -> bool {
    model.to_lowercase().contains("raspberry pi")
}

/// Build a profile from descriptor contents
pub fn classify(os_release: Option<&str>, model: Option<&str>) -> HostProfile {
    let fields = os_release.map(parse_os_release).unwrap_or_default();
    let os = classify_os(&fields);
    let model = model
        .map(|m| m.trim_matches('\0').trim().to_string())
        .filter(|m| !m.is_empty());
    let pretty_name = fields
        .get("PRETTY_NAME")
        .or_else(|| fields.get("NAME"))
        .cloned()
        .unwrap_or_else(|| "Unknown OS".to_string());

    HostProfile {
        os,
        raspberry_pi: model.as_deref().map(is_raspberry_pi_model).unwrap_or(false),
        pretty_name,
        model,
    }
}

/// Detect the running host
pub async fn detect_host(paths: &HostPaths) -> HostProfile {
    if cfg!(windows) {
        return HostProfile {
            os: OsFamily::Windows,
            raspberry_pi: false,
            pretty_name: sysinfo::System::long_os_version().unwrap_or_else(|| "Windows".to_string()),
            model: None,
        };
    }

    let os_release = paths.os_release().read_optional().await.ok().flatten();
    let model = paths.device_model().read_optional().await.ok().flatten();
    let profile = classify(os_release.as_deref(), model.as_deref());
    debug!("Detected host: {:?}", profile);
    profile
}
