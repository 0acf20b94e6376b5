//! A single update step

use tracing::{info, warn};

use crate::errors::UpdateError;
use crate::status;
use crate::updates::command::CommandRunner;

/// What a failure of the step means for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Failure aborts the run
    Required,

    /// Failure is logged and the run continues
    BestEffort,
}

/// External command in the update sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStep {
    /// Status line shown while the step runs
    pub label: String,

    pub program: String,

    pub args: Vec<String>,

    pub policy: StepPolicy,

    /// Skip the step unless this program is on `PATH`
    pub requires: Option<String>,
}

impl UpdateStep {
    fn new(label: &str, program: &str, args: &[&str], policy: StepPolicy) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            policy,
            requires: None,
        }
    }

    pub fn required(label: &str, program: &str, args: &[&str]) -> Self {
        Self::new(label, program, args, StepPolicy::Required)
    }

    pub fn best_effort(label: &str, program: &str, args: &[&str]) -> Self {
        Self::new(label, program, args, StepPolicy::BestEffort)
    }

    /// Only run when the step's own program is installed
    pub fn when_installed(mut self) -> Self {
        self.requires = Some(self.program.clone());
        self
    }

    /// Only run when `program` is installed
    pub fn requires(mut self, program: &str) -> Self {
        self.requires = Some(program.to_string());
        self
    }

    /// Append an argument when `condition` holds
    pub fn arg_if(mut self, condition: bool, arg: &str) -> Self {
        if condition {
            self.args.push(arg.to_string());
        }
        self
    }

    /// Command line for display
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// How a step ended, when it did not abort the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,

    /// Required program not installed
    Skipped,

    /// Best-effort step failed with the given exit code
    Failed(Option<i32>),
}

/// Run one step, applying its failure policy
pub async fn run_step(step: &UpdateStep, runner: &dyn CommandRunner) -> Result<StepOutcome, UpdateError> {
    if let Some(program) = &step.requires {
        if !runner.is_available(program) {
            status::info(&format!("{}: {} not installed, skipping", step.label, program));
            return Ok(StepOutcome::Skipped);
        }
    }

    status::info(&format!("{} ({})", step.label, step.command_line()));
    info!(step = %step.label, "Running {}", step.command_line());

    let result = runner.run(&step.program, &step.args).await;
    match (result, step.policy) {
        (Ok(exit), _) if exit.is_success() => {
            status::success(&step.label);
            Ok(StepOutcome::Succeeded)
        }
        (Ok(exit), StepPolicy::Required) => Err(UpdateError::StepFailed {
            step: step.label.clone(),
            code: exit.code,
        }),
        (Err(e), StepPolicy::Required) => Err(e),
        (Ok(exit), StepPolicy::BestEffort) => {
            warn!(step = %step.label, code = ?exit.code, "Best-effort step failed");
            status::warn(&format!(
                "{} failed (exit code {}), continuing",
                step.label,
                exit.code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string())
            ));
            Ok(StepOutcome::Failed(exit.code))
        }
        (Err(e), StepPolicy::BestEffort) => {
            warn!(step = %step.label, "Best-effort step could not run: {}", e);
            status::warn(&format!("{} could not run ({}), continuing", step.label, e));
            Ok(StepOutcome::Failed(None))
        }
    }
}
