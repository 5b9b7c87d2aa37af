//! Configuration document and directory layout
//!
//! The configuration lives next to the history in the store directory,
//! `~/.config/dojo/config.json`.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config/Store: `$XDG_CONFIG_HOME/dojo/` (~/.config/dojo/)
//! - State/Logs: `$XDG_STATE_HOME/dojo/` (~/.local/state/dojo/)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Environment variable that overrides the workspace root.
pub const ROOT_ENV: &str = "DOJO_ROOT";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// User configuration.
///
/// Keys this crate does not know about are kept in [`Config::extra`] and
/// written back untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Explain quick actions before running them
    #[serde(default)]
    pub learning_mode: bool,

    /// Layout schema version
    #[serde(default = "default_version")]
    pub version: String,

    /// Presentation theme name
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Minimum similarity for fuzzy search results
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Open the browser when a dev server starts
    #[serde(default = "default_true")]
    pub auto_open_browser: bool,

    /// Editor launcher command
    #[serde(default = "default_editor")]
    pub editor: String,

    /// Workspace root override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            learning_mode: false,
            version: default_version(),
            theme: default_theme(),
            fuzzy_threshold: default_fuzzy_threshold(),
            auto_open_browser: true,
            editor: default_editor(),
            workspace_root: None,
            logging: LoggingConfig::default(),
            extra: Map::new(),
        }
    }
}

fn default_version() -> String {
    "v2".to_string()
}

fn default_theme() -> String {
    "snowzies".to_string()
}

fn default_fuzzy_threshold() -> f64 {
    0.6
}

fn default_true() -> bool {
    true
}

fn default_editor() -> String {
    "code".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Set one option from its command-line text form.
    ///
    /// Known options are type-checked and left unchanged on a bad value.
    /// Unknown options are stored as JSON when `raw` parses as JSON,
    /// otherwise as a plain string.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        match key {
            "learning_mode" => self.learning_mode = parse_bool(key, raw)?,
            "auto_open_browser" => self.auto_open_browser = parse_bool(key, raw)?,
            "fuzzy_threshold" => {
                let value: f64 = raw.trim().parse().map_err(|_| {
                    Error::Config(format!("{} must be a number, got '{}'", key, raw))
                })?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(Error::Config(format!(
                        "{} must be between 0 and 1, got {}",
                        key, value
                    )));
                }
                self.fuzzy_threshold = value;
            }
            "version" => self.version = raw.to_string(),
            "theme" => self.theme = raw.to_string(),
            "editor" => self.editor = raw.to_string(),
            "workspace_root" => self.workspace_root = Some(PathBuf::from(raw)),
            "logging" => {
                return Err(Error::Config(
                    "set logging.level or logging.max_files instead".to_string(),
                ))
            }
            "logging.level" => self.logging.level = raw.to_string(),
            "logging.max_files" => {
                self.logging.max_files = raw.trim().parse().map_err(|_| {
                    Error::Config(format!("{} must be a whole number, got '{}'", key, raw))
                })?;
            }
            _ => {
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.into()));
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Render the whole document as a flat list of `(key, value)` pairs.
    pub fn entries(&self) -> Vec<(String, String)> {
        let doc = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => return Vec::new(),
        };

        let mut entries = Vec::new();
        for (key, value) in doc {
            match value {
                Value::Object(inner) => {
                    for (sub, value) in inner {
                        entries.push((format!("{}.{}", key, sub), display_value(&value)));
                    }
                }
                other => entries.push((key, display_value(&other))),
            }
        }
        entries.sort();
        entries
    }

    /// Resolve the managed workspace directory.
    ///
    /// `$DOJO_ROOT` wins over the `workspace_root` option, which wins over
    /// `~/dojo`.
    pub fn workspace_root(&self) -> PathBuf {
        if let Some(root) = std::env::var_os(ROOT_ENV) {
            return PathBuf::from(root);
        }
        self.workspace_root
            .clone()
            .unwrap_or_else(|| home_dir().join("dojo"))
    }

    /// Returns the store directory path
    ///
    /// `$XDG_CONFIG_HOME/dojo/` (~/.config/dojo/)
    pub fn store_dir() -> PathBuf {
        xdg_config_home().join("dojo")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/dojo/` (~/.local/state/dojo/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("dojo")
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} must be true or false, got '{}'",
            key, raw
        ))),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
