//! sysupdate library
//!
//! Package update and reboot orchestration for Debian, Ubuntu, Raspberry Pi
//! and Windows hosts.

pub mod app;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod platform;
pub mod reboot;
pub mod status;
pub mod storage;
pub mod telemetry;
pub mod updates;
pub mod utils;
