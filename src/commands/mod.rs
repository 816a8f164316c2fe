pub mod autostart;
pub mod checkpoint;
pub mod common;
pub mod install;
pub mod list;
pub mod maintain;
pub mod pause;
pub mod restore;
pub mod start;
pub mod status;
