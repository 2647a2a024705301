//! Configuration management for sjl.
//!
//! The launcher shares its config file with the application it launches: only
//! the `sjl` section (YAML) or the `sjl.*` keys (properties) are read here,
//! everything else belongs to the application.
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use strum_macros::{AsRefStr, EnumString};
use tracing::debug;

use crate::{constants::NULL_SENTINEL, error::ResolveError};

/// Launcher settings read from the config file.
///
/// Empty strings mean "unset"; argument lists keep file order because they
/// become command-line tokens in that order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Arguments shared by the start, stop and status commands.
    pub common_args: Vec<String>,
    /// Arguments only passed to the start command.
    pub start_args: Vec<String>,
    /// Arguments only passed to the stop command.
    pub stop_args: Vec<String>,
    /// Arguments only passed to the status command.
    pub status_args: Vec<String>,
    /// Folder holding the launcher jar.
    pub lib_folder: String,
    /// Folder holding the pid file and the restart manifest.
    pub temp_folder: String,
    /// Java installation to use.
    pub java_home: String,
    /// Windows service name.
    pub service_name: String,
    /// Windows service display name.
    pub service_display_name: String,
    /// Windows service description.
    pub service_description: String,
}

/// Supported config file formats, keyed by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ConfigFormat {
    /// Java `key=value` properties.
    Properties,
    /// YAML with an `sjl` root section.
    #[strum(serialize = "yml", serialize = "yaml")]
    Yaml,
}

impl ConfigFormat {
    /// Detects the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

/// Reads and parses a config file.
pub fn load_config(path: &Path) -> Result<LauncherConfig, ResolveError> {
    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| ResolveError::UnsupportedExtension(path.to_path_buf()))?;

    let content = fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Parsing {} config {:?}", format.as_ref(), path);
    let parsed = match format {
        ConfigFormat::Properties => parse_properties(&content),
        ConfigFormat::Yaml => parse_yaml(&content),
    };

    parsed.map_err(|reason| ResolveError::InvalidConfig {
        path: path.to_path_buf(),
        reason,
    })
}

/// Splits a properties document into `(key, value)` pairs in file order.
fn read_properties(content: &str) -> Result<Vec<(String, String)>, String> {
    let mut entries = Vec::new();
    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim_start();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                entries.push((key.trim().to_string(), value.trim_start().to_string()));
            }
            _ => return Err(format!("Invalid line {}: {}", index + 1, raw_line)),
        }
    }
    Ok(entries)
}

/// Parses the `sjl.*` keys of a Java properties document.
pub fn parse_properties(content: &str) -> Result<LauncherConfig, String> {
    let mut config = LauncherConfig::default();

    for (key, value) in read_properties(content)? {
        if key.contains("sjl.javaHome") {
            config.java_home = value;
        } else if key.contains("sjl.libFolder") {
            config.lib_folder = value;
        } else if key.contains("sjl.tempFolder") {
            config.temp_folder = value;
        } else if key.contains("sjl.jvmOptions") {
            config.common_args.push(format!("-{value}"));
        } else if key.contains("sjl.arguments.common") {
            config.common_args.push(value);
        } else if key.contains("sjl.arguments.start") {
            config.start_args.push(value);
        } else if key.contains("sjl.arguments.stop") {
            config.stop_args.push(value);
        } else if key.contains("sjl.arguments.status") {
            config.status_args.push(value);
        } else if key.contains("sjl.service.name") {
            config.service_name = value;
        } else if key.contains("sjl.service.displayName") {
            config.service_display_name = value;
        } else if key.contains("sjl.service.description") {
            config.service_description = value;
        }
    }

    Ok(config)
}

#[derive(Debug, Default, Deserialize)]
struct YamlDocument {
    #[serde(default)]
    sjl: Option<YamlSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YamlSection {
    lib_folder: Option<Value>,
    temp_folder: Option<Value>,
    java_home: Option<Value>,
    service: Option<YamlService>,
    jvm_options: Option<Mapping>,
    arguments: Option<YamlArguments>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YamlService {
    name: Option<Value>,
    display_name: Option<Value>,
    description: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlArguments {
    #[serde(default)]
    start: Vec<Value>,
    #[serde(default)]
    common: Vec<Value>,
    #[serde(default)]
    stop: Vec<Value>,
    #[serde(default)]
    status: Vec<Value>,
}

/// Renders a YAML scalar the way it was written. Nulls and collections render empty.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => String::new(),
    }
}

fn optional_text(value: Option<&Value>) -> String {
    value.map(scalar_text).unwrap_or_default()
}

fn is_null_sentinel(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text == NULL_SENTINEL,
        _ => false,
    }
}

/// Parses the `sjl` section of a YAML document.
pub fn parse_yaml(content: &str) -> Result<LauncherConfig, String> {
    if content.trim().is_empty() {
        return Ok(LauncherConfig::default());
    }

    let document: YamlDocument =
        serde_yaml::from_str(content).map_err(|err| err.to_string())?;
    let Some(section) = document.sjl else {
        return Ok(LauncherConfig::default());
    };

    let mut config = LauncherConfig {
        lib_folder: optional_text(section.lib_folder.as_ref()),
        temp_folder: optional_text(section.temp_folder.as_ref()),
        java_home: optional_text(section.java_home.as_ref()),
        ..LauncherConfig::default()
    };

    if let Some(service) = section.service {
        config.service_name = optional_text(service.name.as_ref());
        config.service_display_name = optional_text(service.display_name.as_ref());
        config.service_description = optional_text(service.description.as_ref());
    }

    if let Some(options) = section.jvm_options {
        for (key, value) in &options {
            let key = scalar_text(key);
            if is_null_sentinel(value) {
                config.common_args.push(format!("-{key}"));
            } else {
                config
                    .common_args
                    .push(format!("-{key}={}", scalar_text(value)));
            }
        }
    }

    if let Some(arguments) = section.arguments {
        config.start_args.extend(arguments.start.iter().map(scalar_text));
        config.common_args.extend(arguments.common.iter().map(scalar_text));
        config.stop_args.extend(arguments.stop.iter().map(scalar_text));
        config.status_args.extend(arguments.status.iter().map(scalar_text));
    }

    Ok(config)
}

/// Joins `value` onto `base` unless it is already absolute.
pub fn resolve_against(base: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
