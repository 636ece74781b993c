//! Resume capability for download runs
//!
//! Provides the completed-window manifest with atomic writes and file locking.

pub mod checkpoint;
pub mod lock;
pub mod state;

pub use checkpoint::WindowCheckpoint;
pub use lock::RunLock;
pub use state::{ResumeError, ResumeManifest};
