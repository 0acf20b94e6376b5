//! Operator confirmation prompts

use std::io::{BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use colored::Colorize;
use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::UpdateError;

/// Parsed answer to a yes/no question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Unrecognized,
}

impl Confirmation {
    /// Parse an operator response. Only `y`/`Y` confirm.
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "y" | "Y" => Confirmation::Yes,
            "n" | "N" => Confirmation::No,
            _ => Confirmation::Unrecognized,
        }
    }

    /// `Unrecognized` is treated as a refusal
    pub fn is_yes(self) -> bool {
        matches!(self, Confirmation::Yes)
    }
}

/// Source of operator answers
#[async_trait]
pub trait Prompter: Send {
    /// Ask a yes/no question; the default answer is no
    async fn confirm(&mut self, question: &str) -> Result<Confirmation, UpdateError>;
}

type SharedInput = Arc<Mutex<Box<dyn BufRead + Send>>>;

/// Prompter reading answers from the terminal.
///
/// Lines are read on a dedicated thread so an abandoned prompt never holds
/// up runtime shutdown.
pub struct TerminalPrompter {
    input: SharedInput,
}

impl TerminalPrompter {
    /// Read answers from an arbitrary line source
    pub fn with_input(input: impl BufRead + Send + 'static) -> Self {
        Self {
            input: Arc::new(Mutex::new(Box::new(input))),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::with_input(BufReader::new(std::io::stdin()))
    }
}

fn read_answer(input: &SharedInput) -> std::io::Result<Option<String>> {
    let mut guard = input
        .lock()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let mut line = String::new();
    match guard.read_line(&mut line)? {
        0 => Ok(None),
        _ => Ok(Some(line)),
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn confirm(&mut self, question: &str) -> Result<Confirmation, UpdateError> {
        print!("{} {} [y/N] ", "[ ?? ]".magenta().bold(), question);
        std::io::stdout().flush()?;

        let (tx, rx) = oneshot::channel();
        let input = self.input.clone();
        std::thread::Builder::new()
            .name("prompt-reader".to_string())
            .spawn(move || {
                if tx.send(read_answer(&input)).is_err() {
                    debug!("Prompt abandoned before an answer was read");
                }
            })?;

        let answer = rx
            .await
            .map_err(|e| UpdateError::PromptError(e.to_string()))?
            .map_err(|e| UpdateError::PromptError(e.to_string()))?;

        match answer {
            Some(line) => Ok(Confirmation::parse(&line)),
            // EOF counts as the default answer
            None => {
                println!();
                Ok(Confirmation::Unrecognized)
            }
        }
    }
}
