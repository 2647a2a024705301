//! Hosting adapters for the supervisor.
//!
//! [`ServiceHost`] is the capability pair every host drives: the headless
//! CLI through [`Foreground`], the Windows service control manager through
//! [`ServiceWorker`].
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use strum_macros::{AsRefStr, EnumString};
use tracing::{error, info, warn};

use crate::{
    config::LauncherConfig,
    constants::LAUNCHER_FAILURE_EXIT_CODE,
    error::ServiceError,
    signals,
    supervisor::Supervisor,
};

/// Start/stop capabilities a host drives.
pub trait ServiceHost {
    /// Begins supervising the application.
    fn on_start(&self) -> Result<(), ServiceError>;

    /// Stops the application.
    fn on_stop(&self) -> Result<(), ServiceError>;

    /// Blocks until supervision is over and returns the exit code.
    fn wait(&self) -> i32;
}

/// Single-use completion latch; any number of threads may wait on it.
#[derive(Debug, Default)]
pub struct Completion {
    code: Mutex<Option<i32>>,
    ready: Condvar,
}

impl Completion {
    /// Records `code` and wakes every waiter. Later calls are ignored.
    pub fn complete(&self, code: i32) {
        let mut slot = self.code.lock().unwrap_or_else(|err| err.into_inner());
        if slot.is_none() {
            *slot = Some(code);
            self.ready.notify_all();
        }
    }

    /// The recorded code, if any.
    pub fn get(&self) -> Option<i32> {
        *self.code.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Blocks until [`Completion::complete`] was called.
    pub fn wait(&self) -> i32 {
        let mut slot = self.code.lock().unwrap_or_else(|err| err.into_inner());
        loop {
            if let Some(code) = *slot {
                return code;
            }
            slot = self.ready.wait(slot).unwrap_or_else(|err| err.into_inner());
        }
    }
}

/// Runs the supervise loop on the calling thread with signal handling.
pub struct Foreground {
    supervisor: Arc<Supervisor>,
    done: Completion,
}

impl Foreground {
    /// Wraps `supervisor` for headless use.
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self {
            supervisor,
            done: Completion::default(),
        }
    }
}

impl ServiceHost for Foreground {
    fn on_start(&self) -> Result<(), ServiceError> {
        signals::install(Arc::clone(&self.supervisor))?;
        let code = self.supervisor.run()?;
        self.done.complete(code);
        Ok(())
    }

    fn on_stop(&self) -> Result<(), ServiceError> {
        self.supervisor.stop()?;
        Ok(())
    }

    fn wait(&self) -> i32 {
        self.done.wait()
    }
}

/// Runs the supervise loop on a worker thread, for service managers whose
/// callbacks must return promptly.
pub struct ServiceWorker {
    supervisor: Arc<Supervisor>,
    done: Arc<Completion>,
    started: AtomicBool,
}

impl ServiceWorker {
    /// Wraps `supervisor` for service use.
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self {
            supervisor,
            done: Arc::new(Completion::default()),
            started: AtomicBool::new(false),
        }
    }
}

impl ServiceHost for ServiceWorker {
    fn on_start(&self) -> Result<(), ServiceError> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Service worker already started");
            return Ok(());
        }

        let supervisor = Arc::clone(&self.supervisor);
        let done = Arc::clone(&self.done);
        let spawned = thread::Builder::new()
            .name("sjl-worker".into())
            .spawn(move || {
                let code = match panic::catch_unwind(AssertUnwindSafe(|| supervisor.run())) {
                    Ok(Ok(code)) => code,
                    Ok(Err(err)) => {
                        error!("Supervisor failed: {err}");
                        LAUNCHER_FAILURE_EXIT_CODE
                    }
                    Err(_) => {
                        error!("Supervisor worker panicked");
                        LAUNCHER_FAILURE_EXIT_CODE
                    }
                };
                done.complete(code);
            });

        if let Err(err) = spawned {
            self.started.store(false, Ordering::SeqCst);
            return Err(err.into());
        }
        info!("Service worker started");
        Ok(())
    }

    fn on_stop(&self) -> Result<(), ServiceError> {
        self.supervisor.request_stop();
        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.supervisor.stop()?;
        let code = self.done.wait();
        info!("Service worker finished with status {code}");
        Ok(())
    }

    fn wait(&self) -> i32 {
        if !self.started.load(Ordering::SeqCst) {
            return self.done.get().unwrap_or(0);
        }
        self.done.wait()
    }
}

/// Name, display name and description the service registers under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    /// Key name in the service database.
    pub name: String,
    /// Name shown by service tools.
    pub display_name: String,
    /// Free-form description.
    pub description: String,
}

impl ServiceIdentity {
    /// Takes the identity from `config`; every field must be set.
    pub fn from_config(config: &LauncherConfig) -> Result<Self, ServiceError> {
        let required = |value: &str, field: &'static str| {
            if value.trim().is_empty() {
                Err(ServiceError::MissingIdentity(field))
            } else {
                Ok(value.to_string())
            }
        };

        Ok(Self {
            name: required(&config.service_name, "name")?,
            display_name: required(&config.service_display_name, "display name")?,
            description: required(&config.service_description, "description")?,
        })
    }
}

/// When the service manager starts the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, AsRefStr)]
pub enum StartType {
    /// Started during system startup.
    #[strum(serialize = "2")]
    Auto = 2,
    /// Started on request.
    #[default]
    #[strum(serialize = "3")]
    Demand = 3,
    /// Cannot be started until enabled.
    #[strum(serialize = "4")]
    Disabled = 4,
}

/// Parsed `install` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Startup behavior.
    pub start_type: StartType,
    /// Account the service runs as; the local system account when unset.
    pub account: Option<String>,
    /// Password of `account`.
    pub password: Option<String>,
}

impl InstallOptions {
    /// Parses `-start-type N`, `-account NAME` and `-password PWD`.
    ///
    /// Flag names are case-insensitive. Arguments not starting with `-` are
    /// ignored.
    pub fn parse(args: &[String]) -> Result<Self, ServiceError> {
        let mut options = Self::default();
        let mut args = args.iter();

        while let Some(arg) = args.next() {
            if !arg.starts_with('-') {
                warn!("Ignoring install argument {arg:?}");
                continue;
            }

            match arg.to_ascii_lowercase().as_str() {
                "-start-type" => {
                    let value = args.next().ok_or(ServiceError::MissingValue("-start-type"))?;
                    options.start_type = value
                        .parse()
                        .map_err(|_| ServiceError::InvalidStartType(value.clone()))?;
                }
                "-account" => {
                    let value = args.next().ok_or(ServiceError::MissingValue("-account"))?;
                    options.account = Some(value.clone());
                }
                "-password" => {
                    let value = args.next().ok_or(ServiceError::MissingValue("-password"))?;
                    options.password = Some(value.clone());
                }
                _ => return Err(ServiceError::UnknownParameter(arg.clone())),
            }
        }

        Ok(options)
    }
}
