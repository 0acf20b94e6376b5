//! Checks performed before any package is touched

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::errors::UpdateError;
use crate::storage::settings::ConnectivitySettings;

/// Whether the process runs with administrative privileges
#[cfg(unix)]
pub fn is_privileged() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Whether the process runs with administrative privileges
///
/// winget elevates per package, so any user may start a run.
#[cfg(not(unix))]
pub fn is_privileged() -> bool {
    true
}

/// Fail unless running as root
pub fn require_privileges(privileged: bool) -> Result<(), UpdateError> {
    if privileged {
        Ok(())
    } else {
        Err(UpdateError::Precondition(
            "this tool must be run as root (try: sudo sysupdate)".to_string(),
        ))
    }
}

/// Verify the package mirrors are reachable with a TCP connect probe
pub async fn check_connectivity(settings: &ConnectivitySettings) -> Result<(), UpdateError> {
    if settings.disabled {
        debug!("Connectivity check disabled");
        return Ok(());
    }

    let target = format!("{}:{}", settings.host, settings.port);
    let timeout = Duration::from_secs(settings.timeout_secs.max(1));
    debug!("Probing {} (timeout {:?})", target, timeout);

    match tokio::time::timeout(timeout, TcpStream::connect(&target)).await {
        Ok(Ok(_)) => {
            info!("Network reachable: {}", target);
            Ok(())
        }
        Ok(Err(e)) => Err(UpdateError::Precondition(format!(
            "no network connectivity ({}: {})",
            target, e
        ))),
        Err(_) => Err(UpdateError::Precondition(format!(
            "no network connectivity ({} timed out after {:?})",
            target, timeout
        ))),
    }
}
