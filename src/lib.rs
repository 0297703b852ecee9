//! Pydepot - Shared Python Package Cache
//!
//! Locks project requirements, installs distributions into an
//! interpreter-versioned shared cache on network storage, and dispatches
//! queued install jobs for serverless workers.

pub mod acquire;
pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod install;
pub mod interpreter;
pub mod lockfile;
pub mod package;
pub mod paths;
pub mod queue;
pub mod requirements;
pub mod resolver;
pub mod ui;

pub use error::{DepotError, DepotResult};
