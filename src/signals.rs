//! Termination signal handling for the foreground supervisor.
//!
//! On SIGINT or SIGTERM the application is asked to stop through its stop
//! command and the launcher exits with the signal number.
use std::{process, sync::Arc};

use tracing::{error, info};

use crate::{error::SupervisorError, supervisor::Supervisor};

fn shutdown(supervisor: &Supervisor, code: i32) -> ! {
    info!("Interrupt signal ({code}) received, stopping application");
    supervisor.begin_exit();
    supervisor.request_stop();
    if let Err(err) = supervisor.stop() {
        error!("Unable to stop application: {err}");
    }
    process::exit(code);
}

/// Installs the watcher for `supervisor`. Call once per process.
#[cfg(unix)]
pub fn install(supervisor: Arc<Supervisor>) -> Result<(), SupervisorError> {
    use signal_hook::{
        consts::{SIGINT, SIGTERM},
        iterator::Signals,
    };

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|err| SupervisorError::Signal(err.to_string()))?;

    std::thread::Builder::new()
        .name("sjl-signals".into())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                shutdown(&supervisor, signal);
            }
        })
        .map_err(|err| SupervisorError::Signal(err.to_string()))?;

    Ok(())
}

/// Installs the watcher for `supervisor`. Call once per process.
#[cfg(not(unix))]
pub fn install(supervisor: Arc<Supervisor>) -> Result<(), SupervisorError> {
    // Console Ctrl+C / Ctrl+Break; SIGINT is 2 on every platform we target.
    ctrlc::set_handler(move || {
        shutdown(&supervisor, 2);
    })
    .map_err(|err| SupervisorError::Signal(err.to_string()))
}
