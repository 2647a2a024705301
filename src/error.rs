//! Error handling for sjl.
use std::path::PathBuf;

use thiserror::Error;

/// Fatal pre-launch failures raised while resolving the launcher configuration.
///
/// None of these leave a child process behind: resolution always finishes
/// before the first command is spawned.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The working directory (default or overridden) does not exist.
    #[error("Working directory {} does not exist", .0.display())]
    MissingWorkingDirectory(PathBuf),

    /// No config file candidate exists, or the explicitly named one is missing.
    #[error("Unable to determine config file location in {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The config file name does not end in `.properties`, `.yml` or `.yaml`.
    #[error("Config file name {} has wrong extension", .0.display())]
    UnsupportedExtension(PathBuf),

    /// The lib folder does not exist.
    #[error("Lib folder {} does not exist", .0.display())]
    MissingLibFolder(PathBuf),

    /// The temp folder does not exist and auto-creation is disabled.
    #[error("Temp folder {} does not exist", .0.display())]
    MissingTempFolder(PathBuf),

    /// No file in the lib folder matches the launcher jar pattern.
    #[error("Unable to find launcher jar in lib folder {}", .0.display())]
    LauncherJarNotFound(PathBuf),

    /// The config file could not be parsed.
    #[error("Invalid configuration in {}: {reason}", path.display())]
    InvalidConfig {
        /// The offending file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// Filesystem error while reading config or preparing folders.
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the supervise loop and the stop/status operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Re-resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The command could not be spawned at all.
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The stop command exited with a non-zero status.
    #[error("Stop command exited with status {0}")]
    StopFailed(i32),

    /// Error for PID file.
    #[error("PID file error: {0}")]
    PidFile(#[from] PidFileError),

    /// Signal handlers could not be installed.
    #[error("Failed to install signal handler: {0}")]
    Signal(String),

    /// Error for poisoned lock.
    #[error("Lock is poisoned: {0}")]
    LockPoisoned(String),
}

/// Implement the `From` trait to convert a `std::sync::PoisonError` into a `SupervisorError`.
impl<T> From<std::sync::PoisonError<T>> for SupervisorError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        SupervisorError::LockPoisoned(err.to_string())
    }
}

/// Error type for PID file operations.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// Error reading or writing the PID file.
    #[error("Failed to access PID file: {0}")]
    Io(#[from] std::io::Error),

    /// The PID file does not hold a decimal process id.
    #[error("Failed to parse PID file: {0}")]
    Parse(#[from] std::num::ParseIntError),
}

/// Errors raised while installing, removing or hosting the OS service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One of the service identity fields is empty in the config.
    #[error("service {0} is not defined in config")]
    MissingIdentity(&'static str),

    /// `-start-type` outside of 2..=4.
    #[error("service start type must be a number between 2 and 4, got '{0}'")]
    InvalidStartType(String),

    /// A flag was given without its value.
    #[error("no value specified after {0}")]
    MissingValue(&'static str),

    /// Unrecognised install parameter.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// Service verbs are only available on Windows.
    #[error("'{0}' is only supported when running as a Windows service")]
    Unsupported(String),

    /// Configuration failed to resolve before the service could be used.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The supervisor failed while hosted by the service manager.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// Locating the launcher executable failed.
    #[error("Failed to locate launcher executable: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the service control manager.
    #[cfg(windows)]
    #[error("service control manager error: {0}")]
    Os(#[from] windows_service::Error),
}
