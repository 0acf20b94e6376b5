//! End-to-end run tests with substituted commands and operator

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use sysupdate::app::options::RunConfiguration;
use sysupdate::app::prompt::{Confirmation, Prompter};
use sysupdate::app::run::{Orchestrator, RunOutcome};
use sysupdate::errors::UpdateError;
use sysupdate::platform::paths::HostPaths;
use sysupdate::reboot::countdown::{CountdownDisplay, CountdownState};
use sysupdate::storage::settings::{ConnectivitySettings, Settings};
use sysupdate::updates::command::{CommandRunner, CommandStatus};

const DEBIAN: &str = "PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\nID=debian\n";
const UBUNTU: &str = "PRETTY_NAME=\"Ubuntu 24.04 LTS\"\nID=ubuntu\nID_LIKE=debian\n";
const RASPBIAN: &str = "PRETTY_NAME=\"Raspbian GNU/Linux 12 (bookworm)\"\nID=raspbian\nID_LIKE=debian\n";
const PI_MODEL: &str = "Raspberry Pi 4 Model B Rev 1.5\0";

#[derive(Default)]
struct FakeRunner {
    calls: Mutex<Vec<String>>,
    probes: Mutex<Vec<String>>,
    exit_codes: HashMap<String, i32>,
    probe_codes: HashMap<String, i32>,
    missing: Vec<String>,
}

impl FakeRunner {
    fn failing(mut self, command_line: &str, code: i32) -> Self {
        self.exit_codes.insert(command_line.to_string(), code);
        self
    }

    fn probe_result(mut self, command_line: &str, code: i32) -> Self {
        self.probe_codes.insert(command_line.to_string(), code);
        self
    }

    fn without(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn rebooted(&self) -> bool {
        self.calls().iter().any(|c| c.starts_with("shutdown"))
    }
}

fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandStatus, UpdateError> {
        let line = command_line(program, args);
        self.calls.lock().unwrap().push(line.clone());
        Ok(CommandStatus {
            code: Some(self.exit_codes.get(&line).copied().unwrap_or(0)),
        })
    }

    async fn probe(&self, program: &str, args: &[String]) -> Result<CommandStatus, UpdateError> {
        let line = command_line(program, args);
        self.probes.lock().unwrap().push(line.clone());
        Ok(CommandStatus {
            code: Some(self.probe_codes.get(&line).copied().unwrap_or(1)),
        })
    }

    fn is_available(&self, program: &str) -> bool {
        !self.missing.iter().any(|m| m == program)
    }
}

struct ScriptedPrompter {
    answers: VecDeque<&'static str>,
    questions: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&mut self, question: &str) -> Result<Confirmation, UpdateError> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(Confirmation::parse(self.answers.pop_front().unwrap_or("")))
    }
}

struct RecordingDisplay {
    shown: Arc<Mutex<Vec<u64>>>,
}

impl CountdownDisplay for RecordingDisplay {
    fn show(&mut self, state: &CountdownState) {
        self.shown.lock().unwrap().push(state.seconds_remaining());
    }

    fn finish(&mut self) {}
}

/// Records updates and signals once a given second is shown
struct SignallingDisplay {
    shown: Arc<Mutex<Vec<u64>>>,
    signal_at: u64,
    reached: Arc<Notify>,
}

impl CountdownDisplay for SignallingDisplay {
    fn show(&mut self, state: &CountdownState) {
        self.shown.lock().unwrap().push(state.seconds_remaining());
        if state.seconds_remaining() == self.signal_at {
            self.reached.notify_one();
        }
    }

    fn finish(&mut self) {}
}

struct Host {
    _dir: TempDir,
    paths: HostPaths,
}

impl Host {
    fn new(os_release: &str, model: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = HostPaths::new(dir.path());
        write(paths.os_release().path(), os_release);
        if let Some(model) = model {
            write(paths.device_model().path(), model);
        }
        Self { _dir: dir, paths }
    }

    fn with_reboot_marker(self) -> Self {
        write(self.paths.reboot_required().path(), "*** System restart required ***\n");
        write(self.paths.reboot_required_pkgs().path(), "linux-image-amd64\n");
        self
    }

    fn with_eeprom_pending(self) -> Self {
        write(self.paths.eeprom_pending()[0].path(), "");
        self
    }
}

fn write(path: &std::path::Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn offline_settings() -> Settings {
    Settings {
        connectivity: ConnectivitySettings {
            disabled: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

struct Harness {
    orchestrator: Orchestrator,
    runner: Arc<FakeRunner>,
    questions: Arc<Mutex<Vec<String>>>,
    shown: Arc<Mutex<Vec<u64>>>,
}

fn harness(
    host: &Host,
    config: RunConfiguration,
    settings: Settings,
    runner: FakeRunner,
    answers: &[&'static str],
) -> Harness {
    let runner = Arc::new(runner);
    let questions = Arc::new(Mutex::new(Vec::new()));
    let shown = Arc::new(Mutex::new(Vec::new()));

    let orchestrator = Orchestrator::new(config, settings)
        .with_paths(host.paths.clone())
        .with_runner(runner.clone())
        .with_prompter(Box::new(ScriptedPrompter {
            answers: answers.iter().copied().collect(),
            questions: questions.clone(),
        }))
        .with_display(Box::new(RecordingDisplay {
            shown: shown.clone(),
        }))
        .with_countdown_tick(Duration::ZERO)
        .with_privileged(true);

    Harness {
        orchestrator,
        runner,
        questions,
        shown,
    }
}

#[tokio::test]
async fn test_no_marker_means_no_prompt_and_no_reboot() {
    let host = Host::new(DEBIAN, None);
    let mut h = harness(&host, RunConfiguration::default(), offline_settings(), FakeRunner::default(), &[]);

    let outcome = h.orchestrator.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::UpToDate);
    assert!(h.questions.lock().unwrap().is_empty());
    assert!(!h.runner.rebooted());
    assert_eq!(
        h.runner.calls(),
        vec![
            "apt-get update",
            "apt-get upgrade",
            "apt-get dist-upgrade",
            "snap refresh",
            "flatpak update",
            "apt-get autoremove",
            "apt-get autoclean",
        ]
    );
}

#[tokio::test]
async fn test_assume_yes_reboots_without_prompt() {
    let host = Host::new(DEBIAN, None).with_reboot_marker();
    let config = RunConfiguration {
        assume_yes: true,
        countdown_seconds: 3,
        ..Default::default()
    };
    let mut h = harness(&host, config, offline_settings(), FakeRunner::default(), &[]);

    let outcome = h.orchestrator.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Rebooted);
    assert!(h.questions.lock().unwrap().is_empty());
    assert_eq!(*h.shown.lock().unwrap(), vec![3, 2, 1]);
    assert_eq!(h.runner.calls().last().unwrap(), "shutdown -r now");
    assert!(h.runner.calls().contains(&"apt-get upgrade -y".to_string()));
}

#[tokio::test]
async fn test_auto_reboot_skips_prompt() {
    let host = Host::new(DEBIAN, None).with_reboot_marker();
    let config = RunConfiguration {
        auto_reboot: true,
        countdown_seconds: 0,
        ..Default::default()
    };
    let mut h = harness(&host, config, offline_settings(), FakeRunner::default(), &[]);

    assert_eq!(h.orchestrator.run().await.unwrap(), RunOutcome::Rebooted);
    assert!(h.questions.lock().unwrap().is_empty());
    assert!(h.shown.lock().unwrap().is_empty());
    assert!(h.runner.rebooted());
}

#[tokio::test]
async fn test_declined_reboot_exits_cleanly() {
    for answer in ["", "n", "later"] {
        let host = Host::new(DEBIAN, None).with_reboot_marker();
        let mut h = harness(
            &host,
            RunConfiguration::default(),
            offline_settings(),
            FakeRunner::default(),
            &[answer],
        );

        let outcome = h.orchestrator.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::RebootPostponed);
        assert_eq!(*h.questions.lock().unwrap(), vec!["Reboot now?".to_string()]);
        assert!(h.shown.lock().unwrap().is_empty());
        assert!(!h.runner.rebooted());
    }
}

#[tokio::test]
async fn test_confirmed_reboot() {
    let host = Host::new(DEBIAN, None).with_reboot_marker();
    let config = RunConfiguration {
        countdown_seconds: 2,
        ..Default::default()
    };
    let mut h = harness(&host, config, offline_settings(), FakeRunner::default(), &["Y"]);

    assert_eq!(h.orchestrator.run().await.unwrap(), RunOutcome::Rebooted);
    assert_eq!(*h.shown.lock().unwrap(), vec![2, 1]);
    assert!(h.runner.rebooted());
}

#[tokio::test]
async fn test_required_step_failure_aborts() {
    let host = Host::new(DEBIAN, None).with_reboot_marker();
    let config = RunConfiguration {
        assume_yes: true,
        ..Default::default()
    };
    let runner = FakeRunner::default().failing("apt-get upgrade -y", 100);
    let mut h = harness(&host, config, offline_settings(), runner, &[]);

    let err = h.orchestrator.run().await.unwrap_err();

    assert!(matches!(err, UpdateError::StepFailed { code: Some(100), .. }));
    assert_eq!(err.exit_code(), 100);
    assert_eq!(h.runner.calls(), vec!["apt-get update", "apt-get upgrade -y"]);
    assert!(!h.runner.rebooted());
}

#[tokio::test]
async fn test_missing_snap_and_flatpak_are_skipped() {
    let host = Host::new(DEBIAN, None);
    let runner = FakeRunner::default().without("snap").without("flatpak");
    let mut h = harness(&host, RunConfiguration::default(), offline_settings(), runner, &[]);

    h.orchestrator.run().await.unwrap();

    let calls = h.runner.calls();
    assert!(!calls.iter().any(|c| c.starts_with("snap") || c.starts_with("flatpak")));
    assert_eq!(calls.len(), 5);
}

#[tokio::test]
async fn test_raspberry_pi_firmware_is_best_effort() {
    let host = Host::new(RASPBIAN, Some(PI_MODEL)).with_eeprom_pending();
    let config = RunConfiguration {
        auto_reboot: true,
        countdown_seconds: 1,
        ..Default::default()
    };
    let runner = FakeRunner::default().failing("rpi-eeprom-update -a", 1);
    let mut h = harness(&host, config, offline_settings(), runner, &[]);

    let outcome = h.orchestrator.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Rebooted);
    let calls = h.runner.calls();
    let firmware = calls.iter().position(|c| c == "rpi-update").unwrap();
    let eeprom = calls.iter().position(|c| c == "rpi-eeprom-update -a").unwrap();
    assert!(firmware < eeprom);
    assert_eq!(calls.last().unwrap(), "shutdown -r now");
}

#[tokio::test]
async fn test_unprivileged_run_stops_before_any_command() {
    let host = Host::new(DEBIAN, None);
    let mut h = harness(&host, RunConfiguration::default(), offline_settings(), FakeRunner::default(), &[]);
    h.orchestrator = h.orchestrator.with_privileged(false);

    let err = h.orchestrator.run().await.unwrap_err();

    assert!(matches!(err, UpdateError::Precondition(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(h.runner.calls().is_empty());
}

#[tokio::test]
async fn test_dry_run_skips_privilege_check() {
    let host = Host::new(DEBIAN, None);
    let config = RunConfiguration {
        dry_run: true,
        ..Default::default()
    };
    let mut h = harness(&host, config, offline_settings(), FakeRunner::default(), &[]);
    h.orchestrator = h.orchestrator.with_privileged(false);

    assert_eq!(h.orchestrator.run().await.unwrap(), RunOutcome::UpToDate);
}

#[tokio::test]
async fn test_unsupported_platform_declined_is_an_error() {
    let host = Host::new("ID=fedora\n", None);
    let mut h = harness(&host, RunConfiguration::default(), offline_settings(), FakeRunner::default(), &["n"]);

    let err = h.orchestrator.run().await.unwrap_err();

    assert!(matches!(err, UpdateError::Declined(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(h.runner.calls().is_empty());
}

#[tokio::test]
async fn test_unsupported_platform_accepted_runs_apt() {
    let host = Host::new("ID=fedora\n", None);
    let mut h = harness(&host, RunConfiguration::default(), offline_settings(), FakeRunner::default(), &["y"]);

    assert_eq!(h.orchestrator.run().await.unwrap(), RunOutcome::UpToDate);
    assert_eq!(h.runner.calls()[0], "apt-get update");
}

#[tokio::test]
async fn test_non_pi_hardware_declined_exits_cleanly() {
    let host = Host::new(DEBIAN, Some("Generic x86 board"));
    let settings = Settings {
        expect_raspberry_pi: true,
        ..offline_settings()
    };
    let mut h = harness(&host, RunConfiguration::default(), settings, FakeRunner::default(), &[""]);

    assert_eq!(h.orchestrator.run().await.unwrap(), RunOutcome::DeclinedHardware);
    assert!(h.runner.calls().is_empty());
}

#[tokio::test]
async fn test_forced_release_upgrade() {
    let host = Host::new(UBUNTU, None);
    let config = RunConfiguration {
        force_release_upgrade: true,
        ..Default::default()
    };
    let runner = FakeRunner::default().probe_result("do-release-upgrade -c", 0);
    let mut h = harness(&host, config, offline_settings(), runner, &[]);

    assert_eq!(h.orchestrator.run().await.unwrap(), RunOutcome::UpToDate);
    assert!(h.questions.lock().unwrap().is_empty());
    assert_eq!(h.runner.calls().last().unwrap(), "do-release-upgrade");
}

#[tokio::test]
async fn test_release_upgrade_not_implied_by_yes() {
    let host = Host::new(UBUNTU, None);
    let config = RunConfiguration {
        assume_yes: true,
        ..Default::default()
    };
    let runner = FakeRunner::default().probe_result("do-release-upgrade -c", 0);
    let mut h = harness(&host, config, offline_settings(), runner, &[]);

    h.orchestrator.run().await.unwrap();

    assert!(!h.runner.calls().iter().any(|c| c.starts_with("do-release-upgrade")));
}

#[tokio::test]
async fn test_no_new_release_is_not_a_failure() {
    let host = Host::new(UBUNTU, None);
    let mut h = harness(&host, RunConfiguration::default(), offline_settings(), FakeRunner::default(), &[]);

    assert_eq!(h.orchestrator.run().await.unwrap(), RunOutcome::UpToDate);
    assert!(h.questions.lock().unwrap().is_empty());
    assert_eq!(*h.runner.probes.lock().unwrap(), vec!["do-release-upgrade -c"]);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_during_countdown_prevents_reboot() {
    let host = Host::new(DEBIAN, None).with_reboot_marker();
    let config = RunConfiguration {
        assume_yes: true,
        countdown_seconds: 5,
        ..Default::default()
    };
    let mut h = harness(&host, config, offline_settings(), FakeRunner::default(), &[]);

    let shown = Arc::new(Mutex::new(Vec::new()));
    let reached = Arc::new(Notify::new());
    h.orchestrator = h
        .orchestrator
        .with_display(Box::new(SignallingDisplay {
            shown: shown.clone(),
            signal_at: 3,
            reached: reached.clone(),
        }))
        .with_countdown_tick(Duration::from_secs(1));

    let interrupt = async move { reached.notified().await };
    let err = h.orchestrator.run_until(interrupt).await.unwrap_err();

    assert!(matches!(err, UpdateError::Interrupted));
    assert_eq!(err.exit_code(), 130);
    assert_eq!(*shown.lock().unwrap(), vec![5, 4, 3]);
    assert!(h.runner.calls().contains(&"apt-get autoclean".to_string()));
    assert!(!h.runner.rebooted());
}

#[tokio::test]
async fn test_run_until_completes_without_interrupt() {
    let host = Host::new(DEBIAN, None);
    let mut h = harness(&host, RunConfiguration::default(), offline_settings(), FakeRunner::default(), &[]);

    let outcome = h.orchestrator.run_until(std::future::pending()).await.unwrap();
    assert_eq!(outcome, RunOutcome::UpToDate);
}
