//! Reboot decision

use tracing::debug;

use crate::app::options::RunConfiguration;
use crate::platform::detect::{HostProfile, OsFamily};
use crate::platform::paths::HostPaths;
use crate::updates::command::CommandRunner;

/// Registry key present while Windows Update waits for a restart
pub const WINDOWS_REBOOT_KEY: &str =
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\WindowsUpdate\Auto Update\RebootRequired";

/// Why a reboot is needed. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootReason {
    PackageUpdate,
    FirmwareUpdate,
    None,
}

/// Outcome of probing the reboot markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebootDecision {
    pub required: bool,
    pub reason: RebootReason,
}

impl RebootDecision {
    /// Combine marker probes; a firmware marker takes precedence as the reason
    pub fn from_markers(package_marker: bool, firmware_marker: bool) -> Self {
        let reason = if firmware_marker {
            RebootReason::FirmwareUpdate
        } else if package_marker {
            RebootReason::PackageUpdate
        } else {
            RebootReason::None
        };
        Self {
            required: package_marker || firmware_marker,
            reason,
        }
    }
}

/// What to do about a reboot decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootAction {
    /// Nothing to do
    NotRequired,

    /// Count down and reboot without asking
    Proceed,

    /// Ask the operator first
    AskOperator,
}

/// Pure mapping from decision and configuration to action
pub fn plan(decision: &RebootDecision, config: &RunConfiguration) -> RebootAction {
    if !decision.required {
        RebootAction::NotRequired
    } else if config.reboot_preapproved() {
        RebootAction::Proceed
    } else {
        RebootAction::AskOperator
    }
}

/// Probe the reboot markers for this host
pub async fn probe_reboot(
    profile: &HostProfile,
    paths: &HostPaths,
    runner: &dyn CommandRunner,
) -> RebootDecision {
    if profile.os == OsFamily::Windows {
        let args = vec!["query".to_string(), WINDOWS_REBOOT_KEY.to_string()];
        let pending = matches!(runner.probe("reg", &args).await, Ok(status) if status.is_success());
        debug!("Windows reboot key present: {}", pending);
        return RebootDecision::from_markers(pending, false);
    }

    let package_marker = paths.reboot_required().exists().await;
    let mut firmware_marker = false;
    if profile.supports_firmware_update() {
        for marker in paths.eeprom_pending() {
            if marker.exists().await {
                debug!("Firmware marker found: {:?}", marker.path());
                firmware_marker = true;
                break;
            }
        }
    }

    let decision = RebootDecision::from_markers(package_marker, firmware_marker);
    debug!("Reboot decision: {:?}", decision);
    decision
}

/// Packages listed as requiring the restart, deduplicated in order
pub async fn reboot_packages(paths: &HostPaths) -> Vec<String> {
    let contents = match paths.reboot_required_pkgs().read_optional().await {
        Ok(Some(contents)) => contents,
        _ => return Vec::new(),
    };

    let mut packages: Vec<String> = Vec::new();
    for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !packages.iter().any(|p| p == line) {
            packages.push(line.to_string());
        }
    }
    packages
}
