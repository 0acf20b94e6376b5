//! Main update run

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::options::RunConfiguration;
use crate::app::prompt::{Prompter, TerminalPrompter};
use crate::errors::UpdateError;
use crate::platform::detect::{detect_host, HostProfile, OsFamily};
use crate::platform::paths::HostPaths;
use crate::platform::preflight::{check_connectivity, is_privileged, require_privileges};
use crate::reboot::countdown::{Countdown, CountdownDisplay, TerminalDisplay};
use crate::reboot::decision::{plan, probe_reboot, reboot_packages, RebootAction, RebootReason};
use crate::status;
use crate::storage::settings::Settings;
use crate::telemetry;
use crate::updates::command::{CommandRunner, DryRunRunner, SystemRunner};
use crate::updates::sequence::{
    build_sequence, reboot_step, release_check_step, release_upgrade_step, run_sequence,
};
use crate::updates::step::run_step;

/// How a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Updates applied, no reboot needed
    UpToDate,

    /// Updates applied and the reboot command was issued
    Rebooted,

    /// A reboot is needed but the operator postponed it
    RebootPostponed,

    /// The operator stopped the run on non-Raspberry Pi hardware
    DeclinedHardware,
}

/// Drives one update run from preflight to reboot
pub struct Orchestrator {
    config: RunConfiguration,
    settings: Settings,
    paths: HostPaths,
    runner: Arc<dyn CommandRunner>,
    prompter: Box<dyn Prompter>,
    display: Box<dyn CountdownDisplay>,
    countdown_tick: Duration,
    privileged: bool,
}

impl Orchestrator {
    /// Orchestrator wired to the real host
    pub fn new(config: RunConfiguration, settings: Settings) -> Self {
        let runner: Arc<dyn CommandRunner> = if config.dry_run {
            Arc::new(DryRunRunner::default())
        } else {
            Arc::new(SystemRunner)
        };

        Self {
            config,
            settings,
            paths: HostPaths::default(),
            runner,
            prompter: Box::new(TerminalPrompter::default()),
            display: Box::new(TerminalDisplay),
            countdown_tick: Duration::from_secs(1),
            privileged: is_privileged(),
        }
    }

    pub fn with_paths(mut self, paths: HostPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_display(mut self, display: Box<dyn CountdownDisplay>) -> Self {
        self.display = display;
        self
    }

    pub fn with_countdown_tick(mut self, tick: Duration) -> Self {
        self.countdown_tick = tick;
        self
    }

    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Execute the run, abandoning it when `interrupt` resolves first.
    ///
    /// An abandoned run never reaches the reboot command.
    pub async fn run_until(
        &mut self,
        interrupt: impl Future<Output = ()>,
    ) -> Result<RunOutcome, UpdateError> {
        tokio::select! {
            result = self.run() => result,
            _ = interrupt => {
                warn!("Run interrupted");
                Err(UpdateError::Interrupted)
            }
        }
    }

    /// Execute the run
    pub async fn run(&mut self) -> Result<RunOutcome, UpdateError> {
        info!("Starting update run with {:?}", self.config);

        status::section("Preflight");
        if self.config.dry_run {
            status::warn("Dry run: commands are printed, not executed");
        } else {
            require_privileges(self.privileged)?;
        }
        check_connectivity(&self.settings.connectivity).await?;
        status::success("Network reachable");

        let profile = match self.confirm_platform(detect_host(&self.paths).await).await? {
            Some(profile) => profile,
            None => return Ok(RunOutcome::DeclinedHardware),
        };

        status::section("System");
        let summary = telemetry::collect_summary(&profile);
        telemetry::print_summary(&summary, &profile);

        status::section("Updating packages");
        let steps = build_sequence(&profile, &self.config);
        let sequence = run_sequence(&steps, self.runner.as_ref()).await?;
        status::success(&format!(
            "{} step(s) completed, {} skipped, {} best-effort failure(s)",
            sequence.succeeded, sequence.skipped, sequence.failed_best_effort
        ));

        if profile.supports_release_upgrade() {
            status::section("Release upgrade");
            self.release_upgrade().await?;
        }

        status::section("Health");
        let report = telemetry::check_health(&self.paths).await;
        telemetry::print_health(&report, &self.settings.health, &self.paths);

        status::section("Reboot");
        self.reboot_if_required(&profile).await
    }

    /// Platform checks; `None` when the operator stopped on non-Pi hardware
    async fn confirm_platform(&mut self, profile: HostProfile) -> Result<Option<HostProfile>, UpdateError> {
        status::info(&format!("Detected {}", profile.pretty_name));

        let profile = if let OsFamily::Unsupported(name) = &profile.os {
            status::warn(&format!("Unsupported platform '{}'", name));
            if !self.config.assume_yes {
                let answer = self
                    .prompter
                    .confirm("Continue with the generic apt-based update sequence?")
                    .await?;
                if !answer.is_yes() {
                    return Err(UpdateError::Declined(format!("unsupported platform '{}'", name)));
                }
            }
            profile.as_generic_debian()
        } else {
            profile
        };

        if self.settings.expect_raspberry_pi && profile.os != OsFamily::Windows && !profile.raspberry_pi {
            status::warn("This device does not identify as a Raspberry Pi");
            if !self.config.assume_yes {
                let answer = self.prompter.confirm("Continue anyway?").await?;
                if !answer.is_yes() {
                    status::info("Stopped at operator request");
                    return Ok(None);
                }
            }
        }

        Ok(Some(profile))
    }

    async fn release_upgrade(&mut self) -> Result<(), UpdateError> {
        let check = release_check_step();
        if !self.runner.is_available(&check.program) {
            status::info(&format!("{} not installed, skipping release check", check.program));
            return Ok(());
        }

        status::info(&format!("{} ({})", check.label, check.command_line()));
        match self.runner.probe(&check.program, &check.args).await {
            Ok(result) if result.is_success() => {}
            Ok(_) => {
                status::success("No new release available");
                return Ok(());
            }
            Err(e) => {
                warn!("Release check could not run: {}", e);
                status::warn(&format!("Release check could not run ({}), continuing", e));
                return Ok(());
            }
        }

        status::info("A new distribution release is available");
        let proceed = if self.config.force_release_upgrade {
            true
        } else if self.config.assume_yes {
            status::info("Pass --release-upgrade to upgrade unattended");
            false
        } else {
            self.prompter.confirm("Upgrade to the new release now?").await?.is_yes()
        };

        if proceed {
            run_step(&release_upgrade_step(&self.config), self.runner.as_ref()).await?;
        } else {
            status::info("Release upgrade skipped");
        }
        Ok(())
    }

    async fn reboot_if_required(&mut self, profile: &HostProfile) -> Result<RunOutcome, UpdateError> {
        let decision = probe_reboot(profile, &self.paths, self.runner.as_ref()).await;

        let action = plan(&decision, &self.config);
        if action == RebootAction::NotRequired {
            status::success("No reboot required");
            return Ok(RunOutcome::UpToDate);
        }

        match decision.reason {
            RebootReason::FirmwareUpdate => status::warn("A reboot is required to apply a firmware update"),
            _ => status::warn("A reboot is required to finish installing updates"),
        }
        let packages = reboot_packages(&self.paths).await;
        if !packages.is_empty() {
            status::info(&format!("Requested by: {}", packages.join(", ")));
        }

        if action == RebootAction::AskOperator {
            let answer = self.prompter.confirm("Reboot now?").await?;
            if !answer.is_yes() {
                status::warn("Reboot postponed. Please reboot manually to complete the updates.");
                return Ok(RunOutcome::RebootPostponed);
            }
        }

        Countdown::new(self.config.countdown_seconds)
            .with_tick(self.countdown_tick)
            .run(self.display.as_mut())
            .await;

        run_step(&reboot_step(profile), self.runner.as_ref()).await?;
        Ok(RunOutcome::Rebooted)
    }
}
