//! CLI command implementations

pub mod config;
pub mod inject;
pub mod install;
pub mod lock;
pub mod serve;

pub use config::execute as config;
pub use inject::execute as inject;
pub use install::execute as install;
pub use lock::execute as lock;
pub use serve::execute as serve;
