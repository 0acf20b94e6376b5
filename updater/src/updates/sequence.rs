//! Platform update sequences

use tracing::info;

use crate::app::options::RunConfiguration;
use crate::errors::UpdateError;
use crate::platform::detect::{HostProfile, OsFamily};
use crate::updates::command::CommandRunner;
use crate::updates::step::{run_step, StepOutcome, UpdateStep};

/// apt, snap and flatpak steps shared by every Debian-family host
pub fn apt_steps(config: &RunConfiguration) -> Vec<UpdateStep> {
    let yes = config.assume_yes;
    vec![
        UpdateStep::required("Refreshing package lists", "apt-get", &["update"]),
        UpdateStep::required("Upgrading packages", "apt-get", &["upgrade"]).arg_if(yes, "-y"),
        UpdateStep::required("Applying full upgrade", "apt-get", &["dist-upgrade"]).arg_if(yes, "-y"),
        UpdateStep::required("Refreshing snaps", "snap", &["refresh"]).when_installed(),
        UpdateStep::required("Updating flatpaks", "flatpak", &["update"])
            .arg_if(yes, "-y")
            .when_installed(),
        UpdateStep::required("Removing unused packages", "apt-get", &["autoremove"]).arg_if(yes, "-y"),
        UpdateStep::required("Cleaning package cache", "apt-get", &["autoclean"]),
    ]
}

/// Raspberry Pi firmware and bootloader EEPROM refresh.
///
/// `rpi-update` asks before installing unless `SKIP_WARNING=1` is set.
pub fn firmware_steps(config: &RunConfiguration) -> Vec<UpdateStep> {
    let firmware = if config.assume_yes {
        UpdateStep::best_effort("Updating firmware", "env", &["SKIP_WARNING=1", "rpi-update"])
    } else {
        UpdateStep::best_effort("Updating firmware", "rpi-update", &[])
    };

    vec![
        firmware.requires("rpi-update"),
        UpdateStep::best_effort("Updating bootloader EEPROM", "rpi-eeprom-update", &["-a"]).when_installed(),
    ]
}

/// winget steps for Windows hosts
pub fn winget_steps(config: &RunConfiguration) -> Vec<UpdateStep> {
    vec![
        UpdateStep::required("Refreshing winget sources", "winget", &["source", "update"]),
        UpdateStep::required(
            "Upgrading packages",
            "winget",
            &[
                "upgrade",
                "--all",
                "--accept-source-agreements",
                "--accept-package-agreements",
            ],
        )
        .arg_if(config.assume_yes, "--disable-interactivity"),
    ]
}

/// Full, ordered update sequence for the host
pub fn build_sequence(profile: &HostProfile, config: &RunConfiguration) -> Vec<UpdateStep> {
    match profile.os {
        OsFamily::Windows => winget_steps(config),
        OsFamily::Debian | OsFamily::Ubuntu => {
            let mut steps = apt_steps(config);
            if profile.supports_firmware_update() {
                steps.extend(firmware_steps(config));
            }
            steps
        }
        OsFamily::Unsupported(_) => Vec::new(),
    }
}

/// Counters for a completed sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed_best_effort: usize,
}

/// Run steps in order, stopping at the first required failure
pub async fn run_sequence(
    steps: &[UpdateStep],
    runner: &dyn CommandRunner,
) -> Result<SequenceReport, UpdateError> {
    let mut report = SequenceReport::default();
    for step in steps {
        match run_step(step, runner).await? {
            StepOutcome::Succeeded => report.succeeded += 1,
            StepOutcome::Skipped => report.skipped += 1,
            StepOutcome::Failed(_) => report.failed_best_effort += 1,
        }
    }
    info!(
        "Update sequence finished: {} succeeded, {} skipped, {} best-effort failures",
        report.succeeded, report.skipped, report.failed_best_effort
    );
    Ok(report)
}

/// Checks for a newer Ubuntu release; exit code 0 means one is available
pub fn release_check_step() -> UpdateStep {
    UpdateStep::best_effort("Checking for a new release", "do-release-upgrade", &["-c"])
}

/// Upgrades to the next Ubuntu release
pub fn release_upgrade_step(config: &RunConfiguration) -> UpdateStep {
    let step = UpdateStep::required("Upgrading distribution release", "do-release-upgrade", &[]);
    if config.assume_yes {
        step.arg_if(true, "-f").arg_if(true, "DistUpgradeViewNonInteractive")
    } else {
        step
    }
}

/// Command that restarts the host
pub fn reboot_step(profile: &HostProfile) -> UpdateStep {
    match profile.os {
        OsFamily::Windows => UpdateStep::required("Rebooting", "shutdown", &["/r", "/t", "0"]),
        _ => UpdateStep::required("Rebooting", "shutdown", &["-r", "now"]),
    }
}
