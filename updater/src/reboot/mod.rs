//! Reboot decision and countdown

pub mod countdown;
pub mod decision;
