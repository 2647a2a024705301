//! Resolution of the launcher state: working directory, config file, folders,
//! launcher jar, Java executable and the three command lines.
//!
//! Every overridable value goes through the same ordered chain of [`Source`]s
//! (environment, then config file, then a built-in default) so precedence is
//! expressed in one place per field.
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    command::{self, LaunchCommand, Mode},
    config::{LauncherConfig, load_config, resolve_against},
    constants::{
        CONFIG_CANDIDATES, DEFAULT_LIB_FOLDER, DEFAULT_TEMP_FOLDER, ENV_CONFIG_FILE,
        ENV_JAVA_HOME, ENV_LIB_FOLDER, ENV_SYSTEM_JAVA_HOME, ENV_TEMP_FOLDER,
        ENV_WORKING_DIRECTORY, JAVA_EXECUTABLE, JAVA_ON_PATH, LAUNCHER_JAR_PATTERN,
        MANIFEST_FILE_NAME, PID_FILE_NAME,
    },
    error::ResolveError,
    pidfile::PidFile,
};

/// Snapshot of the environment variables the launcher reads.
#[derive(Debug, Default, Clone)]
pub struct Env {
    vars: HashMap<String, String>,
}

impl Env {
    /// Captures the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(key, value)| {
                    Some((key.into_string().ok()?, value.into_string().ok()?))
                })
                .collect(),
        }
    }

    /// Builds an environment from explicit pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Returns the value of `name`; empty values count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// One candidate origin for a setting.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Environment variable with this name.
    Env(&'static str),
    /// Value read from the config file.
    File(&'a str),
    /// Built-in fallback.
    Default(&'static str),
}

/// Returns the first non-empty value from `sources`, in order.
pub fn first_value<'a>(
    env: &'a Env,
    field: &str,
    sources: &[Source<'a>],
) -> Option<&'a str> {
    for source in sources {
        let value = match source {
            Source::Env(name) => env.get(name),
            Source::File(value) => Some(*value).filter(|value| !value.is_empty()),
            Source::Default(value) => Some(*value),
        };
        if let Some(value) = value {
            debug!("Resolved {field} = {value:?} from {source:?}");
            return Some(value);
        }
    }
    None
}

/// Everything one supervise cycle needs, rebuilt after every restart.
#[derive(Debug, Clone)]
pub struct LauncherState {
    /// Directory the commands run in.
    pub working_dir: PathBuf,
    /// The config file that was read.
    pub config_file: PathBuf,
    /// Parsed launcher settings.
    pub config: LauncherConfig,
    /// Selected launcher jar.
    pub launcher_jar: PathBuf,
    /// Folder holding the pid file and the manifest.
    pub temp_dir: PathBuf,
    /// Supervisor pid file.
    pub pid_file: PidFile,
    /// Restart manifest written by the application.
    pub manifest_file: PathBuf,
    /// Runs the application.
    pub start: LaunchCommand,
    /// Asks the application to stop.
    pub stop: LaunchCommand,
    /// Queries the application.
    pub status: LaunchCommand,
}

/// Resolves [`LauncherState`] from a base directory and an environment snapshot.
#[derive(Debug, Clone)]
pub struct Resolver {
    base_dir: PathBuf,
    env: Env,
    auto_create_temp: bool,
}

impl Resolver {
    /// Creates a resolver rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, env: Env) -> Self {
        Self {
            base_dir: base_dir.into(),
            env,
            auto_create_temp: true,
        }
    }

    /// Controls whether a missing temp folder is created.
    pub fn auto_create_temp(mut self, enabled: bool) -> Self {
        self.auto_create_temp = enabled;
        self
    }

    /// Runs a full resolution cycle.
    pub fn resolve(&self) -> Result<LauncherState, ResolveError> {
        let working_dir = self.working_dir()?;
        let config_file = self.config_file(&working_dir)?;
        info!("Using config file {:?}", config_file);
        let config = load_config(&config_file)?;

        let lib_dir = self.lib_dir(&working_dir, &config)?;
        let temp_dir = self.temp_dir(&working_dir, &config)?;
        let launcher_jar = find_launcher_jar(&lib_dir)?;
        let java = self.java_executable(&working_dir, &config);

        let build = |mode_args: &[String], mode: Mode| {
            command::build(
                &working_dir,
                &java,
                &launcher_jar,
                &config.common_args,
                mode_args,
                mode,
            )
        };
        let start = build(&config.start_args, Mode::Start);
        let stop = build(&config.stop_args, Mode::Stop);
        let status = build(&config.status_args, Mode::Status);

        Ok(LauncherState {
            pid_file: PidFile::new(temp_dir.join(PID_FILE_NAME)),
            manifest_file: temp_dir.join(MANIFEST_FILE_NAME),
            working_dir,
            config_file,
            config,
            launcher_jar,
            temp_dir,
            start,
            stop,
            status,
        })
    }

    fn working_dir(&self) -> Result<PathBuf, ResolveError> {
        let dir = match self.env.get(ENV_WORKING_DIRECTORY) {
            Some(value) => resolve_against(&self.base_dir, value),
            None => self.base_dir.clone(),
        };
        if !dir.is_dir() {
            return Err(ResolveError::MissingWorkingDirectory(dir));
        }
        Ok(dir)
    }

    fn config_file(&self, working_dir: &Path) -> Result<PathBuf, ResolveError> {
        let path = match self.env.get(ENV_CONFIG_FILE) {
            Some(value) => resolve_against(working_dir, value),
            None => CONFIG_CANDIDATES
                .iter()
                .map(|candidate| working_dir.join(candidate))
                .find(|path| path.is_file())
                .ok_or_else(|| ResolveError::ConfigNotFound(working_dir.to_path_buf()))?,
        };

        let supported = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("properties" | "yml" | "yaml")
        );
        if !supported {
            return Err(ResolveError::UnsupportedExtension(path));
        }
        if !path.is_file() {
            return Err(ResolveError::ConfigNotFound(path));
        }
        Ok(path)
    }

    fn lib_dir(
        &self,
        working_dir: &Path,
        config: &LauncherConfig,
    ) -> Result<PathBuf, ResolveError> {
        let value = first_value(
            &self.env,
            "libFolder",
            &[
                Source::Env(ENV_LIB_FOLDER),
                Source::File(&config.lib_folder),
                Source::Default(DEFAULT_LIB_FOLDER),
            ],
        )
        .unwrap_or(DEFAULT_LIB_FOLDER);

        let dir = resolve_against(working_dir, value);
        if !dir.is_dir() {
            return Err(ResolveError::MissingLibFolder(dir));
        }
        Ok(dir)
    }

    fn temp_dir(
        &self,
        working_dir: &Path,
        config: &LauncherConfig,
    ) -> Result<PathBuf, ResolveError> {
        let value = first_value(
            &self.env,
            "tempFolder",
            &[
                Source::Env(ENV_TEMP_FOLDER),
                Source::File(&config.temp_folder),
                Source::Default(DEFAULT_TEMP_FOLDER),
            ],
        )
        .unwrap_or(DEFAULT_TEMP_FOLDER);

        let dir = resolve_against(working_dir, value);
        if !dir.is_dir() {
            if !self.auto_create_temp {
                return Err(ResolveError::MissingTempFolder(dir));
            }
            info!("Creating temp folder {:?}", dir);
            fs::create_dir_all(&dir).map_err(|source| ResolveError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(dir)
    }

    fn java_executable(&self, working_dir: &Path, config: &LauncherConfig) -> PathBuf {
        let java_home = first_value(
            &self.env,
            "javaHome",
            &[
                Source::Env(ENV_JAVA_HOME),
                Source::Env(ENV_SYSTEM_JAVA_HOME),
                Source::File(&config.java_home),
            ],
        );

        match java_home {
            Some(home) => resolve_against(working_dir, home).join(JAVA_EXECUTABLE),
            None => PathBuf::from(JAVA_ON_PATH),
        }
    }
}

/// Picks the launcher jar from `lib_dir`.
///
/// Directory order is platform dependent, so matches are sorted by name and
/// the first one wins.
pub fn find_launcher_jar(lib_dir: &Path) -> Result<PathBuf, ResolveError> {
    let pattern = Regex::new(LAUNCHER_JAR_PATTERN).expect("launcher jar pattern is valid");
    let entries = fs::read_dir(lib_dir).map_err(|source| ResolveError::Io {
        path: lib_dir.to_path_buf(),
        source,
    })?;

    let mut matches: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|ty| ty.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| pattern.is_match(name))
        .collect();
    matches.sort();

    if matches.len() > 1 {
        warn!(
            "Multiple launcher jars in {:?}: {:?}; using {}",
            lib_dir, matches, matches[0]
        );
    }

    matches
        .into_iter()
        .next()
        .map(|name| lib_dir.join(name))
        .ok_or_else(|| ResolveError::LauncherJarNotFound(lib_dir.to_path_buf()))
}
