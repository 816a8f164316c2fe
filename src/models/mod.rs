pub mod checkpoint;
pub mod launch;
pub mod process;

pub use checkpoint::{
    checkpoint_id_for, Checkpoint, CheckpointList, CheckpointMetadata, CHECKPOINT_ID_FORMAT,
};
pub use launch::{LaunchResult, LaunchSummary, RestoreOutcome};
pub use process::{sort_by_memory_desc, ProcessRecord, WindowState};
