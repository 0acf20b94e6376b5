//! Filesystem locations probed on the host

use std::path::PathBuf;

use crate::filesys::file::File;

/// Read-only probe locations, relative to a root directory
#[derive(Debug, Clone)]
pub struct HostPaths {
    /// Root of the probed filesystem (`/` outside of tests)
    pub root: PathBuf,
}

impl HostPaths {
    /// Probe paths under the given root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file(&self, relative: &str) -> File {
        File::new(self.root.join(relative))
    }

    /// Marker created by apt hooks when an installed update needs a restart
    pub fn reboot_required(&self) -> File {
        self.file("var/run/reboot-required")
    }

    /// Packages that requested the restart, one per line
    pub fn reboot_required_pkgs(&self) -> File {
        self.file("var/run/reboot-required.pkgs")
    }

    /// Device tree model string
    pub fn device_model(&self) -> File {
        self.file("proc/device-tree/model")
    }

    /// os-release descriptor
    pub fn os_release(&self) -> File {
        self.file("etc/os-release")
    }

    /// SoC temperature in millidegrees Celsius
    pub fn thermal_zone(&self) -> File {
        self.file("sys/class/thermal/thermal_zone0/temp")
    }

    /// EEPROM images staged by `rpi-eeprom-update`, applied on next boot
    pub fn eeprom_pending(&self) -> Vec<File> {
        vec![
            self.file("boot/firmware/pieeprom.upd"),
            self.file("boot/pieeprom.upd"),
        ]
    }

    /// Backup left behind by a previous firmware update
    pub fn firmware_backup(&self) -> File {
        self.file("boot.bak")
    }
}

impl Default for HostPaths {
    fn default() -> Self {
        Self::new("/")
    }
}
