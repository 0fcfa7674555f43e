//! Command implementations for replica-cli

pub mod init;
pub mod merge;
pub mod status;
pub mod sync;

pub use init::run_init;
pub use merge::run_merge;
pub use status::run_status;
pub use sync::run_sync;
