pub mod atomic;
pub mod data_dir;
pub mod locking;

pub use atomic::{write_atomic, WriteMode};
pub use data_dir::DataDir;
pub use locking::{locked_read, locked_write, InstanceLock};
