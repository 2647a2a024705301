//! sjl is a native launcher for Java applications. It locates the launcher
//! jar and Java runtime from a shared config file, runs the application in
//! the foreground, and relaunches it when the application asks for a restart,
//! applying any staged file operations in between. On Windows the same
//! supervisor can be installed and hosted as a service.

/// CLI interface.
pub mod cli;

/// Command line construction.
pub mod command;

/// Configuration management.
pub mod config;

/// Constants shared across modules.
pub mod constants;

/// Error handling.
pub mod error;

/// Restart manifest processing.
pub mod manifest;

/// PID file management.
pub mod pidfile;

/// Launcher state resolution.
pub mod resolver;

/// Hosting adapters.
pub mod service;

/// Termination signal handling.
pub mod signals;

/// Supervise loop.
pub mod supervisor;

/// Windows service control manager integration.
#[cfg(windows)]
pub mod windows;
