//! Constants and configuration values for the sjl launcher.
//!
//! This module centralizes the file names, environment variable names and
//! protocol values shared between the resolver, the supervisor and the
//! launched Java application.

use std::time::Duration;

// ============================================================================
// Environment Overrides
// ============================================================================

/// Overrides the directory the launcher resolves everything against.
pub const ENV_WORKING_DIRECTORY: &str = "sjl.workingDirectory";

/// Points the launcher at an explicit config file.
pub const ENV_CONFIG_FILE: &str = "sjl.configFile";

/// Overrides the folder scanned for the launcher jar.
pub const ENV_LIB_FOLDER: &str = "sjl.libFolder";

/// Overrides the folder holding the pid file and the restart manifest.
pub const ENV_TEMP_FOLDER: &str = "sjl.tempFolder";

/// Launcher specific Java home, checked before `JAVA_HOME`.
pub const ENV_JAVA_HOME: &str = "sjl.javaHome";

/// Conventional Java home variable.
pub const ENV_SYSTEM_JAVA_HOME: &str = "JAVA_HOME";

// ============================================================================
// File System Constants
// ============================================================================

/// Config file candidates relative to the working directory, in precedence order.
pub const CONFIG_CANDIDATES: [&str; 6] = [
    "config.yml",
    "config.yaml",
    "config/config.yml",
    "config/config.yaml",
    "config.properties",
    "config/config.properties",
];

/// Lib folder used when neither the environment nor the config names one.
pub const DEFAULT_LIB_FOLDER: &str = "lib";

/// Temp folder used when neither the environment nor the config names one.
pub const DEFAULT_TEMP_FOLDER: &str = "temp";

/// Name of the pid file stored in the temp folder.
/// Contains the decimal process id of the supervisor.
pub const PID_FILE_NAME: &str = "sjl.pid";

/// Name of the restart manifest the application leaves in the temp folder.
pub const MANIFEST_FILE_NAME: &str = "restart.dat";

/// Whole-name pattern of the launcher jar inside the lib folder.
pub const LAUNCHER_JAR_PATTERN: &str = r"^launcher[-.0-9]*\.jar$";

/// Java executable relative to a Java home.
#[cfg(windows)]
pub const JAVA_EXECUTABLE: &str = r"bin\java.exe";

/// Java executable relative to a Java home.
#[cfg(not(windows))]
pub const JAVA_EXECUTABLE: &str = "bin/java";

/// Executable used when no Java home is configured.
pub const JAVA_ON_PATH: &str = "java";

// ============================================================================
// Launch Protocol
// ============================================================================

/// Entry class of the launcher jar.
pub const BOOT_CLASS: &str = "com.vga.sjl.SjlBoot";

/// Exit status the application uses to ask for "apply manifest, then relaunch".
pub const RESTART_EXIT_CODE: i32 = 2;

/// YAML `jvmOptions` value meaning "flag without a value".
pub const NULL_SENTINEL: &str = "NULL";

/// Exit status reported for launcher-side failures.
pub const LAUNCHER_FAILURE_EXIT_CODE: i32 = 1;

// ============================================================================
// Process Management Timing
// ============================================================================

/// Interval between liveness probes while waiting for a stopped supervisor.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait hint reported to the service control manager while stopping.
pub const STOP_WAIT_HINT: Duration = Duration::from_secs(30);
