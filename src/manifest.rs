//! Restart manifest processing.
//!
//! Before asking for a restart the application may leave a `restart.dat` in
//! the temp folder: a YAML sequence of filesystem operations to perform while
//! it is not running (typically swapping in upgraded jars). Every operation is
//! best-effort; nothing here may prevent the relaunch.
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use tracing::{debug, info, warn};

/// One staged operation from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum RestartOperation {
    /// Replace `to` with `from`.
    Move {
        /// Source path.
        from: PathBuf,
        /// Destination path, removed first when present.
        to: PathBuf,
    },
    /// Remove a file or directory tree.
    Delete {
        /// Path to remove.
        file: PathBuf,
    },
    /// Pause before the next operation.
    Sleep {
        /// Pause length in seconds.
        #[serde(deserialize_with = "seconds")]
        duration: u64,
    },
}

impl fmt::Display for RestartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move { from, to } => {
                write!(f, "move {} -> {}", from.display(), to.display())
            }
            Self::Delete { file } => write!(f, "delete {}", file.display()),
            Self::Sleep { duration } => write!(f, "sleep {duration}s"),
        }
    }
}

/// The application writes every manifest value as a string, so accept both
/// `duration: 5` and `duration: "5"`.
fn seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Outcome counters of one manifest pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ManifestReport {
    /// Operations that changed something.
    pub applied: usize,
    /// Operations that had nothing to do (missing source or target).
    pub skipped: usize,
    /// Operations that failed or could not be parsed.
    pub failed: usize,
}

enum Outcome {
    Applied,
    Skipped,
}

/// Removes `path` whether it is a file or a directory tree.
fn remove_path(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn apply(operation: &RestartOperation) -> io::Result<Outcome> {
    match operation {
        RestartOperation::Move { from, to } => {
            if !from.exists() {
                return Ok(Outcome::Skipped);
            }
            if to.exists() {
                remove_path(to)?;
            }
            fs::rename(from, to)?;
            Ok(Outcome::Applied)
        }
        RestartOperation::Delete { file } => {
            if !file.exists() {
                return Ok(Outcome::Skipped);
            }
            remove_path(file)?;
            Ok(Outcome::Applied)
        }
        RestartOperation::Sleep { duration } => {
            thread::sleep(Duration::from_secs(*duration));
            Ok(Outcome::Applied)
        }
    }
}

/// Parses manifest text into entries; malformed entries come back as errors
/// in their slot so the remaining ones still run.
pub fn parse_manifest(
    content: &str,
) -> Result<Vec<Result<RestartOperation, serde_yaml::Error>>, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<Value> = serde_yaml::from_str(content)?;
    Ok(entries.into_iter().map(serde_yaml::from_value).collect())
}

/// Executes the manifest at `path` in file order, then deletes it.
///
/// A missing manifest is a no-op. Individual failures are logged and skipped.
pub fn process_manifest(path: &Path) -> ManifestReport {
    let mut report = ManifestReport::default();

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("No restart manifest at {:?}", path);
            return report;
        }
        Err(err) => {
            warn!("Failed to read restart manifest {:?}: {err}", path);
            report.failed += 1;
            discard(path);
            return report;
        }
    };

    info!("Processing restart manifest {:?}", path);
    match parse_manifest(&content) {
        Ok(entries) => {
            for entry in entries {
                let operation = match entry {
                    Ok(operation) => operation,
                    Err(err) => {
                        warn!("Skipping malformed manifest entry: {err}");
                        report.failed += 1;
                        continue;
                    }
                };

                match apply(&operation) {
                    Ok(Outcome::Applied) => {
                        debug!("Applied {operation}");
                        report.applied += 1;
                    }
                    Ok(Outcome::Skipped) => {
                        debug!("Nothing to do for {operation}");
                        report.skipped += 1;
                    }
                    Err(err) => {
                        warn!("Failed to {operation}: {err}");
                        report.failed += 1;
                    }
                }
            }
        }
        Err(err) => {
            warn!("Ignoring unreadable restart manifest {:?}: {err}", path);
            report.failed += 1;
        }
    }

    discard(path);
    info!(
        "Restart manifest done: {} applied, {} skipped, {} failed",
        report.applied, report.skipped, report.failed
    );
    report
}

fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!("Failed to remove restart manifest {:?}: {err}", path);
    }
}
