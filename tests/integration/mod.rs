//! End-to-end checkpoint, restoration and start-up flows driven through
//! stub platform collaborators.

pub mod checkpoint_lifecycle;
pub mod helpers;
pub mod state_detection;
