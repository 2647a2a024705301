//! Command-line interface for sjl.
use std::{ffi::OsString, str::FromStr};

use clap::{Parser, error::ErrorKind};
use tracing::level_filters::LevelFilter;

/// Log level accepted by `--log-level`: a name ("info", "debug", ...) or a
/// number from 0 (off) to 5 (trace).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// Directive suitable for an `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        let level = match trimmed.to_ascii_lowercase().as_str() {
            "0" | "off" => LevelFilter::OFF,
            "1" | "error" | "err" => LevelFilter::ERROR,
            "2" | "warn" | "warning" => LevelFilter::WARN,
            "3" | "info" => LevelFilter::INFO,
            "4" | "debug" => LevelFilter::DEBUG,
            "5" | "trace" => LevelFilter::TRACE,
            _ => return Err(format!("invalid log level '{trimmed}' (expected a name or 0-5)")),
        };
        Ok(LogLevelArg(level))
    }
}

/// Native launcher and supervisor for a Java application.
#[derive(Parser, Debug)]
#[command(name = "sjl", version)]
#[command(
    about = "Launches and supervises a Java application",
    long_about = "Launches and supervises a Java application.\n\n\
                  Actions: stop, restart, status, test \
                  (Windows adds install [-start-type 2..4] [-account NAME] [-password PWD], uninstall, serve).\n\
                  With no action the application runs in the foreground."
)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Action to perform; supervise when omitted.
    #[arg(value_name = "ACTION")]
    pub action: Option<String>,

    /// Action arguments (install flags).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub rest: Vec<String>,

    /// Parse error that was swallowed in favour of supervising.
    #[arg(skip)]
    pub rejected: Option<String>,
}

/// What the launcher was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run the application in the foreground.
    Supervise,
    /// Stop a running instance.
    Stop,
    /// Stop a running instance, then supervise.
    Restart,
    /// Report the application's status through its exit code.
    Status,
    /// Resolve and print the commands without running anything.
    Test,
    /// Register the Windows service.
    Install(Vec<String>),
    /// Remove the Windows service.
    Uninstall,
    /// Entry point used by the service control manager.
    Serve,
}

impl Cli {
    /// Maps the positional verb to an [`Action`]. Verbs are case-insensitive;
    /// anything unrecognised means supervise. Only `install` takes arguments,
    /// any other verb followed by more arguments supervises as well.
    pub fn action(&self) -> Action {
        let Some(verb) = self.action.as_deref() else {
            return Action::Supervise;
        };
        let verb = verb.to_ascii_lowercase();
        if !self.rest.is_empty() && verb != "install" {
            return Action::Supervise;
        }

        match verb.as_str() {
            "stop" => Action::Stop,
            "restart" => Action::Restart,
            "status" => Action::Status,
            "test" => Action::Test,
            "install" if cfg!(windows) => Action::Install(self.rest.clone()),
            "uninstall" if cfg!(windows) => Action::Uninstall,
            "serve" if cfg!(windows) => Action::Serve,
            _ => Action::Supervise,
        }
    }
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    parse_from(std::env::args_os())
}

/// Parses `args` like [`parse_args`]. Help and version requests print and
/// exit; any other parse error yields a bare `Cli` that supervises, with the
/// error kept in `rejected` so it can be logged once logging is up.
pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => err.exit(),
            _ => Cli {
                log_level: None,
                action: None,
                rest: Vec::new(),
                rejected: Some(err.kind().to_string()),
            },
        },
    }
}
