//! Package update sequence

pub mod command;
pub mod sequence;
pub mod step;
