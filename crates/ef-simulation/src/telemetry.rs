//! Structured logging setup.
//!
//! Every crate in the workspace logs through `tracing` macros. Hosts call
//! [`init_tracing`] once at startup to install a `tracing-subscriber` fmt
//! subscriber; `RUST_LOG` overrides the configured filter.

use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Log level for a filter directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Diagnostics.
    Debug,
    /// Lifecycle events.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// The directive spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Subscriber configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Level for modules without an override.
    pub default_level: LogLevel,
    /// Per-module overrides, e.g. `("ef_simulation::persistence", Warn)`.
    pub module_filters: Vec<(String, LogLevel)>,
    /// Print event targets.
    pub show_targets: bool,
    /// Colour the output.
    pub ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: vec![
                ("ef_simulation::persistence".to_string(), LogLevel::Info),
                ("ef_mechanics::combat".to_string(), LogLevel::Info),
            ],
            show_targets: true,
            ansi: true,
        }
    }
}

impl TracingConfig {
    /// Set the default level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    /// Add a per-module override.
    pub fn with_module(mut self, module: impl Into<String>, level: LogLevel) -> Self {
        self.module_filters.push((module.into(), level));
        self
    }

    /// Render as an `EnvFilter` directive string.
    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.as_str().to_string()];
        for (module, level) in &self.module_filters {
            parts.push(format!("{module}={}", level.as_str()));
        }
        parts.join(",")
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the global subscriber. Idempotent: the first call wins, and an
/// already-installed subscriber from the host is left in place.
pub fn init_tracing(config: &TracingConfig) {
    let directives = config.to_env_filter_string();
    let show_targets = config.show_targets;
    let ansi = config.ansi;
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(show_targets)
            .with_ansi(ansi)
            .compact();

        let _ = subscriber.try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_string_lists_modules() {
        let config = TracingConfig {
            module_filters: Vec::new(),
            ..TracingConfig::default()
        }
        .with_level(LogLevel::Warn)
        .with_module("ef_simulation::movement", LogLevel::Trace);
        assert_eq!(
            config.to_env_filter_string(),
            "warn,ef_simulation::movement=trace"
        );
    }

    #[test]
    fn config_loads_from_json() {
        let config: TracingConfig =
            serde_json::from_str(r#"{"default_level": "debug", "ansi": false}"#).unwrap();
        assert_eq!(config.default_level, LogLevel::Debug);
        assert!(!config.ansi);
        assert!(config.show_targets);
    }

    #[test]
    fn init_is_idempotent() {
        init_tracing(&TracingConfig::default());
        init_tracing(&TracingConfig::default().with_level(LogLevel::Trace));
    }
}
