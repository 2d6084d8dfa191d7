//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session cadences (breathing tick, grounding step interval)
//! - Default log filter
//! - Custom breathing and grounding exercises
//!
//! Configuration is stored at `~/.config/calmkit/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::session::{BreathingDefinition, EngineSettings, GroundingDefinition};

/// Session cadence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Milliseconds per breathing countdown second.
    #[serde(default = "default_breathing_tick_ms")]
    pub breathing_tick_ms: u64,
    /// Seconds each grounding step is displayed.
    #[serde(default = "default_grounding_step_secs")]
    pub grounding_step_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/calmkit/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub custom_breathing: Vec<BreathingDefinition>,
    #[serde(default)]
    pub custom_grounding: Vec<GroundingDefinition>,
}

fn default_breathing_tick_ms() -> u64 {
    1000
}
fn default_grounding_step_secs() -> u64 {
    3
}
fn default_log_filter() -> String {
    "warn".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            breathing_tick_ms: default_breathing_tick_ms(),
            grounding_step_secs: default_grounding_step_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
            custom_breathing: Vec::new(),
            custom_grounding: Vec::new(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let bad_value = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| bad_value(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| bad_value(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| bad_value(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Location of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be created.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return (and persist) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path,
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("falling back to default config: {e}");
            Self::default()
        })
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value has the wrong type,
    /// or the result no longer forms a valid config.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.engine_settings()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply), plus save failures.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Engine cadences derived from `[session]`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero period.
    pub fn engine_settings(&self) -> std::result::Result<EngineSettings, ConfigError> {
        if self.session.breathing_tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.breathing_tick_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.session.grounding_step_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.grounding_step_secs".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(EngineSettings {
            breathing_tick: Duration::from_millis(self.session.breathing_tick_ms),
            grounding_step: Duration::from_secs(self.session.grounding_step_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.session.breathing_tick_ms, 1000);
        assert_eq!(parsed.session.grounding_step_secs, 3);
        assert_eq!(parsed.logging.filter, "warn");
    }

    #[test]
    fn empty_file_uses_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert!(parsed.custom_breathing.is_empty());
        assert_eq!(
            parsed.engine_settings().unwrap(),
            EngineSettings::default()
        );
    }

    #[test]
    fn custom_exercises_parse_from_toml() {
        let parsed: Config = toml::from_str(
            r##"
[[custom_breathing]]
id = "calm"
name = "Calm"
color = "#112233"
cycles = 2
phases = [
  { phase = "inhale", duration_secs = 3 },
  { phase = "exhale", duration_secs = 6 },
]

[[custom_grounding]]
id = "room"
name = "Room"
icon = "R"
color = "#445566"
steps = ["Find a door", "Find a window"]
"##,
        )
        .unwrap();
        assert_eq!(parsed.custom_breathing[0].cycle_secs(), 9);
        assert_eq!(parsed.custom_grounding[0].steps.len(), 2);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.breathing_tick_ms").as_deref(), Some("1000"));
        assert_eq!(cfg.get("logging.filter").as_deref(), Some("warn"));
        assert!(cfg.get("session.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("session.grounding_step_secs", "5").unwrap();
        assert_eq!(
            cfg.engine_settings().unwrap().grounding_step,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn apply_updates_nested_string() {
        let mut cfg = Config::default();
        cfg.apply("logging.filter", "calmkit_core=debug").unwrap();
        assert_eq!(cfg.logging.filter, "calmkit_core=debug");
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(cfg.apply("session.nonexistent_key", "1").is_err());
        assert!(cfg.apply("", "1").is_err());
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("session.breathing_tick_ms", "fast").is_err());
        assert_eq!(cfg.session.breathing_tick_ms, 1000);
    }

    #[test]
    fn apply_rejects_zero_period() {
        let mut cfg = Config::default();
        assert!(cfg.apply("session.breathing_tick_ms", "0").is_err());
        assert_eq!(cfg.session.breathing_tick_ms, 1000);
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_type() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "custom_breathing", "not json");
        assert!(result.is_err());
    }
}
