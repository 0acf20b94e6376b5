//! Reboot countdown
//!
//! Counts from `seconds` down to 1, refreshing a single terminal line once per
//! tick. Cancellation is handled by dropping the future: the caller races
//! [`Countdown::run`] against the termination signal and never reboots when
//! the signal wins.

use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use tracing::debug;

/// Severity band shown for the remaining time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorBand {
    /// More than 5 seconds left
    Normal,

    /// 4 or 5 seconds left
    Warning,

    /// 3 seconds or less
    Critical,
}

impl ColorBand {
    /// Band for the given number of remaining seconds
    pub fn for_remaining(seconds: u64) -> Self {
        match seconds {
            0..=3 => ColorBand::Critical,
            4..=5 => ColorBand::Warning,
            _ => ColorBand::Normal,
        }
    }
}

/// Countdown progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownState {
    seconds_remaining: u64,
    color_band: ColorBand,
}

impl CountdownState {
    pub fn new(seconds: u64) -> Self {
        Self {
            seconds_remaining: seconds,
            color_band: ColorBand::for_remaining(seconds),
        }
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.seconds_remaining
    }

    pub fn color_band(&self) -> ColorBand {
        self.color_band
    }

    pub fn is_finished(&self) -> bool {
        self.seconds_remaining == 0
    }

    /// Advance by one second; stays at zero once finished
    pub fn tick(&mut self) {
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        self.color_band = ColorBand::for_remaining(self.seconds_remaining);
    }
}

/// Renders countdown updates
pub trait CountdownDisplay: Send {
    /// Show the current state (called once per remaining second)
    fn show(&mut self, state: &CountdownState);

    /// Called once the countdown reached zero
    fn finish(&mut self);
}

/// Single-line, in-place terminal rendering
#[derive(Debug, Default)]
pub struct TerminalDisplay;

impl CountdownDisplay for TerminalDisplay {
    fn show(&mut self, state: &CountdownState) {
        let seconds = state.seconds_remaining().to_string();
        let seconds = match state.color_band() {
            ColorBand::Normal => seconds.green(),
            ColorBand::Warning => seconds.yellow(),
            ColorBand::Critical => seconds.red().bold(),
        };
        print!(
            "\r{} Rebooting in {:>3} second(s)... press Ctrl+C to cancel ",
            "[BOOT]".red().bold(),
            seconds
        );
        if let Err(e) = std::io::stdout().flush() {
            debug!("Failed to flush countdown line: {}", e);
        }
    }

    fn finish(&mut self) {
        println!("\r{} Rebooting now{}", "[BOOT]".red().bold(), " ".repeat(40));
    }
}

/// Timed countdown
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    seconds: u64,
    tick: Duration,
}

impl Countdown {
    /// Countdown with a one-second tick
    pub fn new(seconds: u64) -> Self {
        Self {
            seconds,
            tick: Duration::from_secs(1),
        }
    }

    /// Override the tick length
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run to completion, emitting exactly `seconds` updates
    pub async fn run(&self, display: &mut dyn CountdownDisplay) {
        let mut state = CountdownState::new(self.seconds);
        while !state.is_finished() {
            display.show(&state);
            tokio::time::sleep(self.tick).await;
            state.tick();
        }
        display.finish();
    }
}
