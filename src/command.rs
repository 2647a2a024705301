//! Construction of the start, stop and status command lines.
use std::{
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

use strum_macros::Display;

use crate::constants::BOOT_CLASS;

/// Which entry point of the launcher jar a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Run the application in the foreground of the supervisor.
    Start,
    /// Ask the running application to shut down.
    Stop,
    /// Query whether the application is running.
    Status,
}

impl Mode {
    /// Trailing token the boot class dispatches on.
    pub fn token(&self) -> &'static str {
        match self {
            Mode::Start => "-background",
            Mode::Stop => "stop",
            Mode::Status => "status",
        }
    }
}

/// A fully resolved command: executable, ordered arguments and working directory.
///
/// Kept structured so no shell quoting is involved when it runs; [`fmt::Display`]
/// renders the equivalent shell line for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Entry point this command targets.
    pub mode: Mode,
    /// Java executable.
    pub program: PathBuf,
    /// Arguments in invocation order.
    pub args: Vec<String>,
    /// Directory the command runs in.
    pub working_dir: PathBuf,
}

impl LaunchCommand {
    /// Converts into a [`std::process::Command`] ready to spawn.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(&self.working_dir);
        command
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cd \"{}\" && \"{}\"",
            self.working_dir.display(),
            self.program.display()
        )?;

        let mut args = self.args.iter();
        while let Some(arg) = args.next() {
            if arg == "-cp"
                && let Some(classpath) = args.next()
            {
                write!(f, " -cp \"{classpath}\"")?;
                continue;
            }
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Builds one command line.
///
/// Layout: `<java> -cp <jar> <common…> <mode args…> <boot class> <mode token>`.
pub fn build(
    working_dir: &Path,
    java: &Path,
    launcher_jar: &Path,
    common_args: &[String],
    mode_args: &[String],
    mode: Mode,
) -> LaunchCommand {
    let mut args = Vec::with_capacity(common_args.len() + mode_args.len() + 4);
    args.push("-cp".to_string());
    args.push(launcher_jar.to_string_lossy().into_owned());
    args.extend(common_args.iter().cloned());
    args.extend(mode_args.iter().cloned());
    args.push(BOOT_CLASS.to_string());
    args.push(mode.token().to_string());

    LaunchCommand {
        mode,
        program: java.to_path_buf(),
        args,
        working_dir: working_dir.to_path_buf(),
    }
}
