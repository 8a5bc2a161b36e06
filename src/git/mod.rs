//! Git backend module
//!
//! Everything the tool knows about the repository flows through here:
//! - `GitBackend` runs the system `git` binary and captures its output
//! - `GitLog` models the commits stacked on top of the remote trunk
//! - `RollbackManager` snapshots and restores branch state so multi-step
//!   command sequences behave transactionally

pub mod backend;
pub mod log;
pub mod rollback;

pub use backend::{GitBackend, GitExit};
pub use log::GitLog;
pub use rollback::RollbackManager;
