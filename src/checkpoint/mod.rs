//! Checkpoint orchestration: creation, listing, restoration, maintenance.

mod maintenance;
mod manager;

pub use maintenance::{MaintenanceReport, COMPRESSION_AGE, DISK_USAGE_WARN_PERCENT};
pub use manager::{format_checkpoint_name, CheckpointManager};
