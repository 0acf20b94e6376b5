//! sysupdate - Entry Point
//!
//! Updates system packages and reboots the host when an update requires it.

use std::env;
use std::process::ExitCode;

use sysupdate::app::options::{parse_args, usage, ParseOutcome};
use sysupdate::app::run::{Orchestrator, RunOutcome};
use sysupdate::errors::{UpdateError, EXIT_INTERRUPTED};
use sysupdate::logs::{init_logging, LogOptions};
use sysupdate::status;
use sysupdate::storage::settings::Settings;
use sysupdate::utils::version_info;

use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args
        .first()
        .and_then(|path| std::path::Path::new(path).file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "sysupdate".to_string());

    // Settings provide defaults, command-line flags override them
    let settings_file = Settings::default_file();
    let (settings, settings_error) = match Settings::load(&settings_file).await {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    let (config, warnings) = match parse_args(args.iter().skip(1), settings.countdown_secs) {
        ParseOutcome::Help => {
            print!("{}", usage(&program));
            return ExitCode::SUCCESS;
        }
        ParseOutcome::Version => {
            match serde_json::to_string_pretty(&version_info()) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to encode version info: {e}"),
            }
            return ExitCode::SUCCESS;
        }
        ParseOutcome::Run { config, warnings } => (config, warnings),
    };

    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        json_format: settings.log_json,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Some(e) = settings_error {
        warn!("Ignoring settings file {:?}: {}", settings_file.path(), e);
        status::warn(&format!(
            "Ignoring settings file {}: {}",
            settings_file.path().display(),
            e
        ));
    }
    for warning in &warnings {
        warn!("{}", warning);
        status::warn(&warning.to_string());
    }

    let mut orchestrator = Orchestrator::new(config, settings);
    let result = orchestrator.run_until(await_shutdown_signal()).await;

    match result {
        Ok(outcome) => {
            info!("Run finished: {:?}", outcome);
            if outcome == RunOutcome::UpToDate {
                status::success("System is up to date");
            }
            ExitCode::SUCCESS
        }
        Err(UpdateError::Interrupted) => {
            println!();
            warn!("Interrupted by signal");
            status::warn("Interrupted, no reboot will be performed");
            ExitCode::from(EXIT_INTERRUPTED as u8)
        }
        Err(e) => {
            error!("Update run failed: {}", e);
            status::error(&e.to_string());
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                error!("Unable to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, aborting...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, aborting...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Ctrl+C received, aborting...");
    }
}
