//! UI module for CLI progress output
//!
//! Spinners and progress bars render via `cliclack`/`indicatif` in an
//! interactive terminal, with plain-text fallback in CI and pipelines.

mod context;
mod progress;

pub use context::UiContext;
pub use progress::{InstallProgress, TaskSpinner};
