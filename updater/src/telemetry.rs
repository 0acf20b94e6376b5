//! System summary and advisory health probes
//!
//! Nothing here influences control flow; findings are printed and logged.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

use crate::platform::detect::HostProfile;
use crate::platform::paths::HostPaths;
use crate::status;
use crate::storage::settings::HealthSettings;
use crate::utils::{format_bytes, format_uptime};

/// Host summary printed at the start of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSummary {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
    pub uptime_secs: u64,
    pub memory_used: u64,
    pub memory_total: u64,
    pub cpu_count: usize,
}

/// Collect the host summary
pub fn collect_summary(profile: &HostProfile) -> SystemSummary {
    let mut sys = System::new_all();
    sys.refresh_memory();

    SystemSummary {
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        os: profile.pretty_name.clone(),
        kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
        uptime_secs: System::uptime(),
        memory_used: sys.used_memory(),
        memory_total: sys.total_memory(),
        cpu_count: sys.cpus().len(),
    }
}

/// Print the host summary
pub fn print_summary(summary: &SystemSummary, profile: &HostProfile) {
    status::info(&format!("Host:    {}", summary.hostname));
    status::info(&format!("OS:      {}", summary.os));
    if let Some(model) = &profile.model {
        status::info(&format!("Model:   {}", model));
    }
    status::info(&format!("Kernel:  {}", summary.kernel));
    status::info(&format!("Uptime:  {}", format_uptime(summary.uptime_secs)));
    status::info(&format!(
        "Memory:  {} / {}",
        format_bytes(summary.memory_used),
        format_bytes(summary.memory_total)
    ));
    status::info(&format!("CPUs:    {}", summary.cpu_count));
}

/// Results of the advisory probes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// SoC temperature in degrees Celsius
    pub temperature_celsius: Option<f32>,

    /// Root filesystem usage percentage
    pub disk_percent: Option<f32>,

    /// A previous firmware backup exists
    pub firmware_backup: bool,
}

impl HealthReport {
    /// Warnings for values above the configured thresholds
    pub fn warnings(&self, thresholds: &HealthSettings) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(temp) = self.temperature_celsius {
            if temp > thresholds.temperature_warn_celsius {
                warnings.push(format!(
                    "CPU temperature is {:.1}°C (above {:.0}°C)",
                    temp, thresholds.temperature_warn_celsius
                ));
            }
        }
        if let Some(disk) = self.disk_percent {
            if disk > thresholds.disk_warn_percent {
                warnings.push(format!(
                    "Root filesystem is {:.0}% full (above {:.0}%)",
                    disk, thresholds.disk_warn_percent
                ));
            }
        }
        warnings
    }
}

/// Parse a thermal zone reading (millidegrees Celsius)
pub fn parse_thermal_reading(contents: &str) -> Option<f32> {
    contents
        .trim()
        .parse::<i64>()
        .ok()
        .map(|millis| millis as f32 / 1000.0)
}

/// Usage percentage of the filesystem mounted at `mount_point`
pub fn disk_usage_percent(mount_point: &Path) -> Option<f32> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .find(|disk| disk.mount_point() == mount_point)
        .filter(|disk| disk.total_space() > 0)
        .map(|disk| {
            let used = disk.total_space().saturating_sub(disk.available_space());
            (used as f32 / disk.total_space() as f32) * 100.0
        })
}

/// Run the probes
pub async fn check_health(paths: &HostPaths) -> HealthReport {
    let temperature_celsius = match paths.thermal_zone().read_optional().await {
        Ok(Some(contents)) => parse_thermal_reading(&contents),
        _ => None,
    };

    let root = if cfg!(windows) { Path::new("C:\\") } else { Path::new("/") };

    HealthReport {
        temperature_celsius,
        disk_percent: disk_usage_percent(root),
        firmware_backup: paths.firmware_backup().exists().await,
    }
}

/// Print a health report
pub fn print_health(report: &HealthReport, thresholds: &HealthSettings, paths: &HostPaths) {
    if let Some(temp) = report.temperature_celsius {
        status::info(&format!("CPU temperature: {:.1}°C", temp));
    }
    if let Some(disk) = report.disk_percent {
        status::info(&format!("Root filesystem usage: {:.0}%", disk));
    }
    if report.firmware_backup {
        status::info(&format!(
            "Previous firmware backup present at {}",
            paths.firmware_backup().path().display()
        ));
    }

    let warnings = report.warnings(thresholds);
    if warnings.is_empty() {
        status::success("Health checks passed");
    }
    for warning in warnings {
        tracing::warn!("{}", warning);
        status::warn(&warning);
    }
}
