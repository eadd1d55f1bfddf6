//! Configuration file parsing and structures.
//!
//! wizhome reads a single TOML file. Every section is optional; `[home]` seeds
//! the home context at startup, since nothing is persisted between runs.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use toml::Spanned;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use super::diagnostics::format_diagnostics;
use super::diagnostics::Diagnostic;
use crate::engine::Device;
use crate::engine::DeviceKind;
use crate::engine::DeviceState;
use crate::engine::Home;
use crate::engine::Person;
use crate::engine::Rule;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub home: HomeConfig,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"wizhome::interpret" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Build the tracing filter for this config.
    pub fn filter(&self) -> Targets {
        Targets::new()
            .with_default(self.level)
            .with_targets(self.overrides.iter().map(|(t, l)| (t.clone(), *l)))
    }
}

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8565
}

/// HTTP API configuration
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Chat completion endpoint configuration
///
/// The API key itself never lives in the config file; only the name of the
/// environment variable holding it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Initial contents of the home
#[derive(Debug, Default, Deserialize)]
pub struct HomeConfig {
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    #[serde(default)]
    pub people: Vec<PersonConfig>,

    /// Rule descriptions
    #[serde(default)]
    pub rules: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    pub name: Spanned<String>,
    pub kind: DeviceKind,

    /// Initial state of an on/off device (default: off)
    pub on: Option<Spanned<bool>>,

    /// Initial value of a sensor (default: unknown)
    pub value: Option<Spanned<String>>,
}

#[derive(Debug, Deserialize)]
pub struct PersonConfig {
    pub name: Spanned<String>,
    #[serde(default)]
    pub bio: String,
}

impl DeviceConfig {
    fn initial_state(&self) -> DeviceState {
        match self.kind {
            DeviceKind::OnOff => DeviceState::OnOff {
                on: self.on.as_ref().is_some_and(|on| *on.get_ref()),
            },
            DeviceKind::Sensor => DeviceState::Sensor {
                value: self.value.as_ref().map(|v| v.get_ref().clone()),
            },
        }
    }
}

impl HomeConfig {
    /// Build the initial home context.
    pub fn to_home(&self) -> Home {
        Home {
            devices: self
                .devices
                .iter()
                .map(|d| Device::new(d.name.get_ref().clone(), d.initial_state()))
                .collect(),
            people: self
                .people
                .iter()
                .map(|p| Person::new(p.name.get_ref().clone(), p.bio.clone()))
                .collect(),
            rules: self.rules.iter().map(Rule::new).collect(),
            address: self.address.clone(),
            events: Vec::new(),
        }
    }

    /// Check the seeded home, returning every problem found.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut seen: HashMap<String, std::ops::Range<usize>> = HashMap::new();

        for (i, device) in self.devices.iter().enumerate() {
            let path = format!("home.devices[{}]", i);
            let name = device.name.get_ref();

            if name.is_empty() {
                diagnostics.push(Diagnostic {
                    field_path: format!("{}.name", path),
                    message: "device name must not be empty".to_string(),
                    span: device.name.span(),
                    label: "empty name".to_string(),
                    related: None,
                });
            } else if let Some(first) = seen.get(&name.to_lowercase()) {
                // Replies refer to devices by name, so a second device with
                // the same name could never be updated.
                diagnostics.push(Diagnostic {
                    field_path: format!("{}.name", path),
                    message: format!("duplicate device name '{}'", name),
                    span: device.name.span(),
                    label: "names are compared ignoring case".to_string(),
                    related: Some(first.clone()),
                });
            } else {
                seen.insert(name.to_lowercase(), device.name.span());
            }

            if let (DeviceKind::Sensor, Some(on)) = (device.kind, &device.on) {
                diagnostics.push(Diagnostic {
                    field_path: format!("{}.on", path),
                    message: "`on` is only valid for on_off devices".to_string(),
                    span: on.span(),
                    label: "sensor devices take `value`".to_string(),
                    related: None,
                });
            }

            if let (DeviceKind::OnOff, Some(value)) = (device.kind, &device.value) {
                diagnostics.push(Diagnostic {
                    field_path: format!("{}.value", path),
                    message: "`value` is only valid for sensor devices".to_string(),
                    span: value.span(),
                    label: "on_off devices take `on`".to_string(),
                    related: None,
                });
            }
        }

        let mut people = HashSet::new();
        for (i, person) in self.people.iter().enumerate() {
            let name = person.name.get_ref();
            if name.is_empty() {
                diagnostics.push(Diagnostic {
                    field_path: format!("home.people[{}].name", i),
                    message: "person name must not be empty".to_string(),
                    span: person.name.span(),
                    label: "empty name".to_string(),
                    related: None,
                });
            } else if !people.insert(name.clone()) {
                tracing::warn!("Person '{}' is listed more than once", name);
            }
        }

        diagnostics
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        Self::from_source(&path.display().to_string(), &contents)
    }

    /// Parse and validate configuration text; `file_id` names it in errors.
    pub fn from_source(file_id: &str, contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;

        let diagnostics = config.home.validate();
        if !diagnostics.is_empty() {
            return Err(ConfigError::Invalid {
                count: diagnostics.len(),
                report: format_diagnostics(file_id, contents, &diagnostics),
            });
        }

        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config has {count} error(s):\n{report}")]
    Invalid { count: usize, report: String },
}
