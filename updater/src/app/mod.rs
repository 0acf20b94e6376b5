//! Application layer: argument parsing, operator prompts and the run sequence

pub mod options;
pub mod prompt;
pub mod run;
