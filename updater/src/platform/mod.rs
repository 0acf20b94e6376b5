//! Host detection, probed paths and preflight checks

pub mod detect;
pub mod paths;
pub mod preflight;
