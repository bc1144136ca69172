#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! [`ReactiveConfig`] is layered: defaults, then an optional TOML document
//! (`config` feature), then environment variables:
//!
//! | variable | field | values |
//! |---|---|---|
//! | `RXMVVM_SCHEDULER` | `scheduler` | `immediate`, `thread` |
//! | `RXMVVM_THREAD_NAME` | `thread_name` | any non-empty string |
//! | `RXMVVM_LOG_REJECTIONS` | `log_rejections` | `1/0`, `true/false`, `yes/no`, `on/off` |
//!
//! Environment parsing goes through [`ReactiveConfig::apply_env`], which
//! takes a lookup function, so it can be exercised without touching the
//! process environment.

use std::env;
use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the default scheduler.
pub const ENV_SCHEDULER: &str = "RXMVVM_SCHEDULER";
/// Environment variable naming execution threads.
pub const ENV_THREAD_NAME: &str = "RXMVVM_THREAD_NAME";
/// Environment variable toggling rejection logging.
pub const ENV_LOG_REJECTIONS: &str = "RXMVVM_LOG_REJECTIONS";

/// Where command bodies run by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum SchedulerKind {
    /// On the thread that subscribed to `execute`.
    #[default]
    Immediate,
    /// On a fresh named thread per execution.
    Thread,
}

impl FromStr for SchedulerKind {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "immediate" | "inline" => Ok(Self::Immediate),
            "thread" => Ok(Self::Thread),
            _ => Err(ConfigError::InvalidScheduler {
                value: raw.to_string(),
            }),
        }
    }
}

/// Settings consumed by [`ReactiveFactory::from_config`](crate::ReactiveFactory::from_config).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ReactiveConfig {
    pub scheduler: SchedulerKind,
    pub thread_name: String,
    /// Log rejected admissions at debug level. They are published on the
    /// command's error stream either way.
    pub log_rejections: bool,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::Immediate,
            thread_name: "rxmvvm-exec".to_string(),
            log_rejections: true,
        }
    }
}

impl ReactiveConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env(|name| env::var(name).ok())
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        toml::from_str(document).map_err(|error| ConfigError::Toml {
            message: error.to_string(),
        })
    }

    /// Override fields from environment-style variables found by `lookup`.
    pub fn apply_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_SCHEDULER) {
            self.scheduler = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_THREAD_NAME) {
            let name = raw.trim();
            if !name.is_empty() {
                self.thread_name = name.to_string();
            }
        }
        if let Some(raw) = lookup(ENV_LOG_REJECTIONS) {
            self.log_rejections = parse_flag(ENV_LOG_REJECTIONS, &raw)?;
        }
        Ok(self)
    }
}

fn parse_flag(variable: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            variable,
            value: raw.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors from loading a [`ReactiveConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown scheduler name.
    InvalidScheduler { value: String },
    /// A boolean variable held something else.
    InvalidFlag {
        variable: &'static str,
        value: String,
    },
    /// The TOML document did not parse.
    Toml { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScheduler { value } => {
                write!(f, "unknown scheduler {value:?} (expected immediate or thread)")
            }
            Self::InvalidFlag { variable, value } => {
                write!(f, "{variable} must be a boolean, got {value:?}")
            }
            Self::Toml { message } => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ReactiveConfig::default();
        assert_eq!(config.scheduler, SchedulerKind::Immediate);
        assert_eq!(config.thread_name, "rxmvvm-exec");
        assert!(config.log_rejections);
    }

    #[test]
    fn env_overrides_fields() {
        let config = ReactiveConfig::default()
            .apply_env(vars(&[
                (ENV_SCHEDULER, "Thread"),
                (ENV_THREAD_NAME, " worker "),
                (ENV_LOG_REJECTIONS, "off"),
            ]))
            .unwrap();
        assert_eq!(config.scheduler, SchedulerKind::Thread);
        assert_eq!(config.thread_name, "worker");
        assert!(!config.log_rejections);
    }

    #[test]
    fn empty_thread_name_is_ignored() {
        let config = ReactiveConfig::default()
            .apply_env(vars(&[(ENV_THREAD_NAME, "  ")]))
            .unwrap();
        assert_eq!(config.thread_name, "rxmvvm-exec");
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = ReactiveConfig::default()
            .apply_env(vars(&[(ENV_SCHEDULER, "gpu")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScheduler { .. }));
        assert!(err.to_string().contains("gpu"));

        let err = ReactiveConfig::default()
            .apply_env(vars(&[(ENV_LOG_REJECTIONS, "maybe")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidFlag {
                variable: ENV_LOG_REJECTIONS,
                value: "maybe".into()
            }
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_then_env() {
        let config = ReactiveConfig::from_toml_str("scheduler = \"thread\"\n").unwrap();
        assert_eq!(config.scheduler, SchedulerKind::Thread);
        assert_eq!(config.thread_name, "rxmvvm-exec");
        let config = config
            .apply_env(vars(&[(ENV_SCHEDULER, "immediate")]))
            .unwrap();
        assert_eq!(config.scheduler, SchedulerKind::Immediate);
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_errors_are_reported() {
        let err = ReactiveConfig::from_toml_str("scheduler = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }
}
