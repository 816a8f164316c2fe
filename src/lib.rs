//! Workspace continuity: periodic checkpoints of the running applications
//! and their restoration after a restart, sleep or crash.

pub mod checkpoint;
pub mod commands;
pub mod config;
pub mod error;
pub mod fs;
pub mod launcher;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod platform;
pub mod process;
pub mod startup;
pub mod storage;

pub use error::{Error, Result};
