//! CLI configuration: guard settings plus the observability policy.
//!
//! Files are read as JSON first and YAML second. Environment overrides are applied on top
//! of whatever was loaded.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use interrupt_signatures::load_signature_from_path;
use playguard_engine::GuardSettings;
use playguard_observe::ObsPolicyView;

use crate::errors::ConfigError;

pub const ENV_STUCK_THRESHOLD_MS: &str = "PLAYGUARD_STUCK_THRESHOLD_MS";
pub const ENV_RECOVERY_COOLDOWN_MS: &str = "PLAYGUARD_RECOVERY_COOLDOWN_MS";
pub const ENV_TICK_INTERVAL_MS: &str = "PLAYGUARD_TICK_INTERVAL_MS";
pub const ENV_SITE_HOST: &str = "PLAYGUARD_SITE_HOST";
pub const ENV_DIAGNOSTICS: &str = "PLAYGUARD_DIAGNOSTICS";

const DEFAULT_CONFIG_PATH: &str = "config/playguard.yaml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub guard: GuardSettings,
    #[serde(default)]
    pub observe: ObsPolicyView,
    /// Signature bundle replacing the built-in tables. Relative paths resolve against the
    /// config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_path: Option<PathBuf>,
}

pub struct LoadedConfig {
    pub config: CliConfig,
    /// `None` when no file was found and defaults are in use.
    pub path: Option<PathBuf>,
}

pub fn parse_config_str(raw: &str, path: &Path) -> Result<CliConfig, ConfigError> {
    match serde_json::from_str(raw) {
        Ok(config) => Ok(config),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| ConfigError::Parse {
            path: path.to_path_buf(),
            json: json_err.to_string(),
            yaml: yaml_err.to_string(),
        }),
    }
}

/// Loads `explicit` (must exist) or the default location (optional), resolves the
/// signature bundle, then applies process environment overrides.
pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            fallback.exists().then_some(fallback)
        }
    };

    let mut config = match &path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
            let mut config = parse_config_str(&raw, path)?;
            resolve_signature(&mut config, path.parent())?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => {
            warn!("No configuration file found, using defaults");
            CliConfig::default()
        }
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    config.guard.validate()?;
    Ok(LoadedConfig { config, path })
}

fn resolve_signature(config: &mut CliConfig, base: Option<&Path>) -> Result<(), ConfigError> {
    let Some(raw) = &config.signature_path else {
        return Ok(());
    };
    let path = match base {
        Some(base) if raw.is_relative() => base.join(raw),
        _ => raw.clone(),
    };
    config.guard.signature = load_signature_from_path(&path)?;
    info!("Loaded signature bundle from: {}", path.display());
    Ok(())
}

/// `lookup` returns the raw value of an environment variable, if set.
pub fn apply_env_overrides(
    config: &mut CliConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let engine = &mut config.guard.engine;
    if let Some(value) = lookup(ENV_STUCK_THRESHOLD_MS) {
        engine.stuck_threshold_ms = parse_number(ENV_STUCK_THRESHOLD_MS, &value)?;
    }
    if let Some(value) = lookup(ENV_RECOVERY_COOLDOWN_MS) {
        engine.recovery_cooldown_ms = parse_number(ENV_RECOVERY_COOLDOWN_MS, &value)?;
    }
    if let Some(value) = lookup(ENV_TICK_INTERVAL_MS) {
        engine.tick_interval_ms = parse_number(ENV_TICK_INTERVAL_MS, &value)?;
    }
    if let Some(value) = lookup(ENV_SITE_HOST) {
        let host = value.trim();
        if host.is_empty() {
            return Err(ConfigError::InvalidOverride {
                key: ENV_SITE_HOST,
                value,
            });
        }
        engine.site_host = host.to_string();
    }
    if let Some(value) = lookup(ENV_DIAGNOSTICS) {
        config.guard.diagnostics.force_enabled = Some(parse_switch(&value)?);
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            key,
            value: value.to_string(),
        })
}

fn parse_switch(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            key: ENV_DIAGNOSTICS,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn yaml_config_keeps_unlisted_defaults() {
        let raw = "guard:\n  engine:\n    stuck_threshold_ms: 5000\nobserve:\n  default_filter: debug\n";
        let config = parse_config_str(raw, Path::new("inline.yaml")).unwrap();
        assert_eq!(config.guard.engine.stuck_threshold_ms, 5000);
        assert_eq!(config.guard.engine.recovery_cooldown_ms, 8000);
        assert_eq!(config.guard.signature.support_code, "3037019");
        assert_eq!(config.observe.default_filter, "debug");
    }

    #[test]
    fn json_is_tried_first() {
        let raw = r#"{ "guard": { "engine": { "site_host": "m.youtube.com" } } }"#;
        let config = parse_config_str(raw, Path::new("inline.json")).unwrap();
        assert_eq!(config.guard.engine.site_host, "m.youtube.com");
    }

    #[test]
    fn unparsable_file_reports_both_attempts() {
        let err = parse_config_str("guard: [", Path::new("broken.yaml")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken.yaml"));
        assert!(message.contains("json error"));
        assert!(message.contains("yaml error"));
    }

    #[test]
    fn env_overrides_replace_loaded_values() {
        let mut config = CliConfig::default();
        apply_env_overrides(
            &mut config,
            lookup(&[
                (ENV_STUCK_THRESHOLD_MS, "3000"),
                (ENV_RECOVERY_COOLDOWN_MS, "12000"),
                (ENV_TICK_INTERVAL_MS, "250"),
                (ENV_SITE_HOST, " music.youtube.com "),
                (ENV_DIAGNOSTICS, "off"),
            ]),
        )
        .unwrap();
        let engine = &config.guard.engine;
        assert_eq!(engine.stuck_threshold_ms, 3000);
        assert_eq!(engine.recovery_cooldown_ms, 12000);
        assert_eq!(engine.tick_interval_ms, 250);
        assert_eq!(engine.site_host, "music.youtube.com");
        assert_eq!(config.guard.diagnostics.force_enabled, Some(false));
    }

    #[test]
    fn malformed_override_is_rejected() {
        let mut config = CliConfig::default();
        let err = apply_env_overrides(&mut config, lookup(&[(ENV_TICK_INTERVAL_MS, "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                key: ENV_TICK_INTERVAL_MS,
                ..
            }
        ));
        assert_eq!(config.guard.engine.tick_interval_ms, 1000);
    }
}
