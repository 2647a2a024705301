//! Supervise loop, restart protocol and the stop/status operations.
use std::{
    io,
    path::Path,
    process::ExitStatus,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use tracing::{debug, info, warn};

use crate::{
    command::LaunchCommand,
    constants::{RESTART_EXIT_CODE, STOP_POLL_INTERVAL},
    error::{PidFileError, SupervisorError},
    manifest::process_manifest,
    pidfile::{PidFileGuard, is_process_alive},
    resolver::{LauncherState, Resolver},
};

/// Runs a command to completion and reports its exit status.
pub trait CommandRunner: Send + Sync {
    /// Blocks until `command` exits.
    fn run(&self, command: &LaunchCommand) -> io::Result<i32>;
}

/// Runs commands as real child processes sharing the supervisor's stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &LaunchCommand) -> io::Result<i32> {
        let status = command.to_command().status()?;
        Ok(exit_code(status))
    }
}

/// Maps an exit status to a single integer; signal deaths become `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// How one run of the start command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The application asked for a manifest pass and a relaunch.
    RestartRequested,
    /// The application is done; the code becomes the launcher's exit code.
    Terminal(i32),
}

impl CycleOutcome {
    /// Classifies an exit code.
    pub fn from_exit_code(code: i32) -> Self {
        if code == RESTART_EXIT_CODE {
            Self::RestartRequested
        } else {
            Self::Terminal(code)
        }
    }
}

/// Supervises exactly one Java application.
///
/// Owns the current [`LauncherState`]; the state is swapped (never mutated)
/// after each restart so concurrent readers such as the signal watcher always
/// see a complete cycle.
pub struct Supervisor {
    resolver: Resolver,
    runner: Arc<dyn CommandRunner>,
    state: RwLock<Arc<LauncherState>>,
    stop_requested: AtomicBool,
    exiting: AtomicBool,
}

impl Supervisor {
    /// Resolves the initial state and builds a supervisor.
    pub fn new(
        resolver: Resolver,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, SupervisorError> {
        let state = resolver.resolve()?;
        Ok(Self {
            resolver,
            runner,
            state: RwLock::new(Arc::new(state)),
            stop_requested: AtomicBool::new(false),
            exiting: AtomicBool::new(false),
        })
    }

    /// The state of the current cycle.
    pub fn state(&self) -> Result<Arc<LauncherState>, SupervisorError> {
        Ok(Arc::clone(&*self.state.read()?))
    }

    /// Makes the next exit of the application terminal, whatever its status.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Whether [`Supervisor::request_stop`] was called.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Marks that another thread is about to terminate the process.
    pub fn begin_exit(&self) {
        self.exiting.store(true, Ordering::SeqCst);
    }

    fn invoke(&self, command: &LaunchCommand) -> Result<i32, SupervisorError> {
        debug!("Running {} command: {}", command.mode, command);
        self.runner
            .run(command)
            .map_err(|source| SupervisorError::Spawn {
                command: command.to_string(),
                source,
            })
    }

    /// Runs the supervise loop until the application exits for good.
    ///
    /// The pid file exists for the whole loop, including across restarts, and
    /// is removed on every way out of it.
    pub fn run(&self) -> Result<i32, SupervisorError> {
        let mut guard = PidFileGuard::acquire(self.state()?.pid_file.clone())?;

        loop {
            if self.stop_requested() {
                info!("Stop requested before launch; not starting application");
                return Ok(0);
            }

            let state = self.state()?;
            info!("Starting application: {}", state.start);
            let code = self.invoke(&state.start)?;

            if self.exiting.load(Ordering::SeqCst) {
                // The signal watcher owns shutdown from here and exits the process.
                loop {
                    thread::park();
                }
            }

            match CycleOutcome::from_exit_code(code) {
                CycleOutcome::RestartRequested if !self.stop_requested() => {
                    info!("Application requested a restart");
                    let next = self.restart(&state, guard.file().path())?;
                    guard = guard.relocate(next.pid_file.clone())?;
                }
                CycleOutcome::RestartRequested => {
                    // A stop turns the restart status into a clean exit.
                    info!("Application asked for a restart while stopping; not relaunching");
                    drop(guard);
                    return Ok(0);
                }
                CycleOutcome::Terminal(_) => {
                    info!("Application exited with status {code}");
                    drop(guard);
                    return Ok(code);
                }
            }
        }
    }

    /// Applies the manifest and installs a freshly resolved state.
    fn restart(
        &self,
        previous: &LauncherState,
        pid_path: &Path,
    ) -> Result<Arc<LauncherState>, SupervisorError> {
        let report = process_manifest(&previous.manifest_file);
        debug!("Manifest report: {report:?}");

        let next = Arc::new(self.resolver.resolve()?);
        if next.pid_file.path() != pid_path {
            info!(
                "Pid file moves from {:?} to {:?}",
                pid_path,
                next.pid_file.path()
            );
        }
        *self.state.write()? = Arc::clone(&next);
        Ok(next)
    }

    /// Asks the application to stop and waits for the recorded supervisor to go away.
    pub fn stop(&self) -> Result<(), SupervisorError> {
        let state = self.state()?;
        info!("Stopping application: {}", state.stop);

        let code = self.invoke(&state.stop)?;
        if code != 0 {
            return Err(SupervisorError::StopFailed(code));
        }

        match state.pid_file.read() {
            Ok(Some(pid)) => {
                if pid == std::process::id() {
                    debug!("Pid file names this process; not waiting on it");
                } else {
                    wait_for_exit(pid);
                }
                state.pid_file.remove()?;
            }
            Ok(None) => debug!("No pid file at {:?}", state.pid_file.path()),
            Err(PidFileError::Parse(err)) => {
                warn!(
                    "Ignoring unreadable pid file {:?}: {err}",
                    state.pid_file.path()
                );
                state.pid_file.remove()?;
            }
            Err(err) => return Err(err.into()),
        }

        Ok(())
    }

    /// Runs the status command and returns its exit status.
    pub fn status(&self) -> Result<i32, SupervisorError> {
        let state = self.state()?;
        self.invoke(&state.status)
    }
}

fn wait_for_exit(pid: u32) {
    if !is_process_alive(pid) {
        return;
    }
    info!("Waiting for supervisor process {pid} to exit");
    while is_process_alive(pid) {
        thread::sleep(STOP_POLL_INTERVAL);
    }
}
