//! Command-line options

use std::fmt;

use crate::storage::settings::DEFAULT_COUNTDOWN_SECS;

/// Immutable configuration for a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    /// Answer yes to package manager prompts and to the reboot question
    pub assume_yes: bool,

    /// Reboot without asking when a reboot is required
    pub auto_reboot: bool,

    /// Seconds shown on the reboot countdown
    pub countdown_seconds: u64,

    /// Perform an available distribution release upgrade without asking
    pub force_release_upgrade: bool,

    /// Print commands instead of executing them
    pub dry_run: bool,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            assume_yes: false,
            auto_reboot: false,
            countdown_seconds: DEFAULT_COUNTDOWN_SECS,
            force_release_upgrade: false,
            dry_run: false,
        }
    }
}

impl RunConfiguration {
    /// Whether a required reboot may proceed without asking the operator
    pub fn reboot_preapproved(&self) -> bool {
        self.auto_reboot || self.assume_yes
    }
}

/// Result of parsing the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Proceed with the given configuration
    Run {
        config: RunConfiguration,
        warnings: Vec<ParseWarning>,
    },

    /// `--help` was requested
    Help,

    /// `--version` was requested
    Version,
}

/// Recoverable problems found while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// Unrecognised token, ignored
    UnknownOption(String),

    /// `--countdown` without a following value
    MissingCountdown { flag: String, fallback: u64 },

    /// Countdown value that is not a non-negative integer
    InvalidCountdown { value: String, fallback: u64 },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::UnknownOption(token) => write!(f, "Unknown option '{}' ignored", token),
            ParseWarning::MissingCountdown { flag, fallback } => {
                write!(f, "{} requires a value, using {} seconds", flag, fallback)
            }
            ParseWarning::InvalidCountdown { value, fallback } => write!(
                f,
                "Invalid countdown '{}' (expected a non-negative integer), using {} seconds",
                value, fallback
            ),
        }
    }
}

/// Parse command-line tokens (without the program name).
///
/// `default_countdown` is used when no countdown is given and when the given
/// value is not a non-negative integer.
pub fn parse_args<I, S>(tokens: I, default_countdown: u64) -> ParseOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut config = RunConfiguration {
        countdown_seconds: default_countdown,
        ..Default::default()
    };
    let mut warnings = Vec::new();
    let mut countdown_raw: Option<String> = None;

    let mut tokens = tokens.into_iter().map(|t| t.as_ref().to_string());
    while let Some(token) = tokens.next() {
        // Handle --key=value format
        let (flag, inline_value) = match token.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (token.clone(), None),
        };

        match flag.as_str() {
            "-h" | "--help" => return ParseOutcome::Help,
            "-V" | "--version" => return ParseOutcome::Version,
            "-y" | "--yes" => config.assume_yes = true,
            "--auto" | "--auto-reboot" => config.auto_reboot = true,
            "--release-upgrade" => config.force_release_upgrade = true,
            "--dry-run" => config.dry_run = true,
            "--countdown" | "--reboot-delay" => {
                match inline_value.or_else(|| tokens.next()) {
                    Some(value) => countdown_raw = Some(value),
                    None => {
                        countdown_raw = None;
                        warnings.push(ParseWarning::MissingCountdown {
                            flag: flag.clone(),
                            fallback: default_countdown,
                        });
                    }
                }
            }
            _ => warnings.push(ParseWarning::UnknownOption(token)),
        }
    }

    if let Some(raw) = countdown_raw {
        match raw.trim().parse::<u64>() {
            Ok(seconds) => config.countdown_seconds = seconds,
            Err(_) => warnings.push(ParseWarning::InvalidCountdown {
                value: raw,
                fallback: default_countdown,
            }),
        }
    }

    ParseOutcome::Run { config, warnings }
}

/// Usage text for `--help`
pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [OPTIONS]

Update system packages and reboot when the update requires it.

Options:
  -y, --yes                 Answer yes to package manager and reboot prompts
      --auto, --auto-reboot Reboot automatically when a reboot is required
      --countdown N         Seconds to count down before rebooting (default {DEFAULT_COUNTDOWN_SECS})
      --reboot-delay N      Alias for --countdown
      --release-upgrade     Upgrade to a new distribution release when one is available (Ubuntu)
      --dry-run             Print the commands that would run without running them
  -V, --version             Print version information
  -h, --help                Print this help
"
    )
}
