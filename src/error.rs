//! Error types for pydepot
//!
//! All modules use `DepotResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pydepot operations
pub type DepotResult<T> = Result<T, DepotError>;

/// All errors that can occur in pydepot
#[derive(Error, Debug)]
pub enum DepotError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Interpreter errors
    #[error("Invalid interpreter version '{0}'. Expected MAJOR.MINOR, e.g. 3.12")]
    InterpreterVersion(String),

    // Lockfile errors
    #[error("Failed to read lockfile {path}: {reason}")]
    LockfileRead { path: String, reason: String },

    #[error("Failed to parse lockfile {path}: {reason}")]
    LockfileParse { path: String, reason: String },

    #[error("Duplicate package '{0}' in lockfile")]
    DuplicatePackage(String),

    // Requirement / resolver errors
    #[error("Invalid requirement '{line}': {reason}")]
    RequirementInvalid { line: String, reason: String },

    #[error("Requirement '{name}' is not pinned ({constraint}). The bundled resolver only accepts exact '==' pins")]
    UnpinnedRequirement { name: String, constraint: String },

    #[error("Resolver returned unsupported operation '{kind}' for {package}. This pipeline only materializes fresh installs")]
    UnsupportedOperation { kind: String, package: String },

    // Acquisition errors
    #[error("Failed to acquire {package}: {reason}")]
    Acquire { package: String, reason: String },

    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Digest mismatch for {url}: expected {expected}, got {actual}")]
    DigestMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("No distribution of {package} is compatible with {tag}")]
    NoCompatibleDist { package: String, tag: String },

    // Archive errors
    #[error("Unsupported archive format: {0}. Only .tar.gz distributions are read directly; plug an external dist reader for other formats")]
    UnsupportedArchive(PathBuf),

    #[error("Failed to read archive {path}: {reason}")]
    ArchiveRead { path: PathBuf, reason: String },

    #[error("Archive entry '{0}' escapes the extraction root")]
    ArchivePathEscape(String),

    // Install errors
    #[error("Install of {package} failed: {reason}")]
    Install { package: String, reason: String },

    // Queue errors
    #[error("Queue error: {context}: {reason}")]
    Queue { context: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl DepotError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create an acquisition error
    pub fn acquire(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Acquire {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// Create a queue error with context
    pub fn queue(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Queue {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnpinnedRequirement { .. } => {
                Some("Pin every requirement to an exact version, e.g. numpy==1.26.4")
            }
            Self::UnsupportedArchive(_) => {
                Some("Supported distribution formats are .tar.gz and .whl")
            }
            Self::InterpreterVersion(_) => Some("Set [python] version in config, e.g. \"3.12\""),
            _ => None,
        }
    }
}
