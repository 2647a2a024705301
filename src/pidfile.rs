//! Pid file handling and process liveness probing.
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::error::PidFileError;

/// Plain-text pid file holding the supervisor's decimal process id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Wraps the pid file at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the PID file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file currently exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes `pid` as decimal text, replacing any previous content.
    pub fn write(&self, pid: u32) -> Result<(), PidFileError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, pid.to_string())?;
        Ok(())
    }

    /// Reads the recorded pid; `None` when the file is absent.
    pub fn read(&self) -> Result<Option<u32>, PidFileError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents.trim().parse::<u32>()?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the file. A missing file is not an error.
    pub fn remove(&self) -> Result<(), PidFileError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Owns a written pid file and removes it when dropped.
///
/// The supervise loop keeps one guard alive across restarts, so the file only
/// disappears once the loop ends.
#[derive(Debug)]
pub struct PidFileGuard {
    file: PidFile,
}

impl PidFileGuard {
    /// Records the current process id in `file`.
    pub fn acquire(file: PidFile) -> Result<Self, PidFileError> {
        file.write(std::process::id())?;
        debug!("Wrote pid {} to {:?}", std::process::id(), file.path());
        Ok(Self { file })
    }

    /// The guarded file.
    pub fn file(&self) -> &PidFile {
        &self.file
    }

    /// Moves the record to `target` when the pid file location changed.
    pub fn relocate(self, target: PidFile) -> Result<Self, PidFileError> {
        if target == self.file {
            return Ok(self);
        }
        // Acquire first so the old guard only drops once the new file exists.
        let moved = Self::acquire(target)?;
        drop(self);
        Ok(moved)
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        if let Err(err) = self.file.remove() {
            warn!("Failed to remove pid file {:?}: {err}", self.file.path());
        }
    }
}

/// Reports whether a process with `pid` currently exists.
///
/// This is a one-shot check, not a wait: a recycled pid reads as alive.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::{errno::Errno, sys::signal, unistd::Pid};

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Reports whether a process with `pid` currently exists.
///
/// This is a one-shot check, not a wait: a recycled pid reads as alive.
#[cfg(not(unix))]
pub fn is_process_alive(pid: u32) -> bool {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).is_some()
}
