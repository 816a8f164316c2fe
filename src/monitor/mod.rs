//! Liveness tracking, state classification, usage learning and the
//! background daemon.

pub mod crash;
pub mod daemon;
pub mod heartbeat;
pub mod pattern;
pub mod state;

pub use crash::CrashTracker;
pub use daemon::{CheckpointOutcome, CycleReport, MonitorIntervals, ShutdownSignal, SkipReason, SystemMonitor};
pub use heartbeat::{Heartbeat, HeartbeatReading, HeartbeatStore};
pub use pattern::{OptimizationMetrics, UserActivity, WorkPattern};
pub use state::{ActionReport, HandledState, StartupAction, SystemState, SystemStateDetector};
