//! Startup Configuration
//!
//! This module loads the process-wide settings: the static login credential
//! pair, the bind address, timeouts, and an optional placeholder connection
//! profile.
//!
//! # Configuration Locations
//! - Local: `.rubrica/config.json` (per working directory)
//! - Global: `~/.config/rubrica/config.json` (per user)
//!
//! # Resolution Precedence
//! 1. Environment variables (`AUTH_USERNAME`, `AUTH_PASSWORD`, `RUBRICA_BIND`, `RUBRICA_LOG`)
//! 2. Local config file
//! 3. Global config file
//! 4. Built-in defaults
//!
//! The initial profile is only a placeholder. It becomes the live target
//! only through the connection manager, and only when
//! `adopt_initial_profile` is set.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, RubricaError};
use crate::gate::AuthCredentials;
use crate::profile::ConnectionProfile;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SESSION_IDLE_MINUTES: u64 = 30;

/// Resolved startup configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub auth: AuthCredentials,
    pub initial_profile: Option<StoredProfile>,
    pub adopt_initial_profile: bool,
    pub probe_timeout: Duration,
    pub session_idle_timeout: Duration,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            auth: AuthCredentials::default(),
            initial_profile: None,
            adopt_initial_profile: false,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            session_idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_MINUTES * 60),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Placeholder connection profile as written in a config file
///
/// Supports an environment variable reference for the password.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    pub host: String,
    pub port: u32,
    pub database: String,
    pub username: String,

    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name for password (if not storing password directly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl StoredProfile {
    /// Resolve the password reference and build a profile
    ///
    /// The profile is not validated here; the connection manager does that.
    pub fn resolve(&self) -> Result<ConnectionProfile> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<ConnectionProfile> {
        let password = match &self.password_env {
            Some(env_var) => env(env_var).ok_or_else(|| {
                RubricaError::config_error(format!(
                    "Environment variable {env_var} not found for password"
                ))
            })?,
            None => self.password.clone().unwrap_or_default(),
        };

        Ok(ConnectionProfile::new(&self.host, self.port, &self.database, &self.username, password))
    }
}

impl std::fmt::Debug for StoredProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password_env", &self.password_env)
            .finish_non_exhaustive()
    }
}

/// On-disk configuration document; every key is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<SocketAddr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthCredentials>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_profile: Option<StoredProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adopt_initial_profile: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_idle_minutes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl ConfigFile {
    /// Overlay `self` on top of `lower`; keys set in `self` win
    #[must_use]
    pub fn merge_over(self, lower: Self) -> Self {
        Self {
            bind: self.bind.or(lower.bind),
            auth: self.auth.or(lower.auth),
            initial_profile: self.initial_profile.or(lower.initial_profile),
            adopt_initial_profile: self.adopt_initial_profile.or(lower.adopt_initial_profile),
            probe_timeout_secs: self.probe_timeout_secs.or(lower.probe_timeout_secs),
            session_idle_minutes: self.session_idle_minutes.or(lower.session_idle_minutes),
            log_level: self.log_level.or(lower.log_level),
        }
    }

    /// Fill unset keys from the defaults
    #[must_use]
    pub fn into_config(self) -> AppConfig {
        let defaults = AppConfig::default();
        AppConfig {
            bind: self.bind.unwrap_or(defaults.bind),
            auth: self.auth.unwrap_or(defaults.auth),
            initial_profile: self.initial_profile,
            adopt_initial_profile: self.adopt_initial_profile.unwrap_or(false),
            probe_timeout: self
                .probe_timeout_secs
                .map_or(defaults.probe_timeout, Duration::from_secs),
            session_idle_timeout: self
                .session_idle_minutes
                .map_or(defaults.session_idle_timeout, |m| Duration::from_secs(m * 60)),
            log_level: self.log_level.unwrap_or(defaults.log_level),
        }
    }
}

impl AppConfig {
    /// Load configuration with full precedence
    ///
    /// With an explicit path only that file is read, and it must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(RubricaError::config_error(format!(
                        "Config file {} does not exist",
                        path.display()
                    )));
                }
                load_file(path)?
            }
            None => load_with_precedence()?,
        };

        let mut config = file.into_config();
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(username) = env("AUTH_USERNAME") {
            self.auth.username = username;
        }
        if let Some(password) = env("AUTH_PASSWORD") {
            self.auth.password = password;
        }
        if let Some(bind) = env("RUBRICA_BIND") {
            self.bind = bind.parse().map_err(|e| {
                RubricaError::config_error(format!("RUBRICA_BIND '{bind}' is not a socket address: {e}"))
            })?;
        }
        if let Some(level) = env("RUBRICA_LOG") {
            self.log_level = level;
        }
        Ok(())
    }

    /// The placeholder profile with its password resolved, if one is configured
    pub fn resolved_initial_profile(&self) -> Result<Option<ConnectionProfile>> {
        self.initial_profile.as_ref().map(StoredProfile::resolve).transpose()
    }
}

/// Get path to local config file (`.rubrica/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        RubricaError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".rubrica").join("config.json"))
}

/// Get path to global config file (`~/.config/rubrica/config.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| RubricaError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("rubrica").join("config.json"))
}

/// Load one config file; a missing file is an empty document
pub fn load_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| RubricaError::config_error(format!("Could not read config file: {e}")))?;

    serde_json::from_str(&contents).map_err(|e| {
        RubricaError::config_error(format!("Invalid config file {}: {e}", path.display()))
    })
}

/// Load local and global files, local keys taking precedence
pub fn load_with_precedence() -> Result<ConfigFile> {
    let local = load_file(&local_config_path()?)?;
    let global = match global_config_path() {
        Ok(path) => load_file(&path)?,
        Err(e) => {
            tracing::debug!(error = %e, "skipping global config");
            ConfigFile::default()
        }
    };

    Ok(local.merge_over(global))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| map.get(name).cloned()
    }

    fn stored(password: Option<&str>, password_env: Option<&str>) -> StoredProfile {
        StoredProfile {
            host: "localhost".to_string(),
            port: 3306,
            database: "test".to_string(),
            username: "root".to_string(),
            password: password.map(String::from),
            password_env: password_env.map(String::from),
        }
    }

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default().into_config();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.auth.username, "admin");
        assert_eq!(config.auth.password, "admin123");
        assert!(config.initial_profile.is_none());
        assert!(!config.adopt_initial_profile);
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.session_idle_timeout, Duration::from_secs(30 * 60));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_parse_config_file() {
        let json = r#"{
            "bind": "0.0.0.0:9000",
            "auth": { "username": "owner", "password": "s3cret" },
            "initial_profile": {
                "host": "localhost",
                "port": 3306,
                "database": "test",
                "username": "root",
                "password_env": "RUBRICA_DB_PASSWORD"
            },
            "adopt_initial_profile": true,
            "probe_timeout_secs": 2
        }"#;
        let file: ConfigFile = serde_json::from_str(json).unwrap();
        let config = file.into_config();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.auth.username, "owner");
        assert!(config.adopt_initial_profile);
        assert_eq!(config.probe_timeout, Duration::from_secs(2));
        assert_eq!(
            config.initial_profile.unwrap().password_env.as_deref(),
            Some("RUBRICA_DB_PASSWORD")
        );
    }

    #[test]
    fn test_local_keys_override_global() {
        let global = ConfigFile {
            bind: Some("0.0.0.0:9000".parse().unwrap()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        let local = ConfigFile { log_level: Some("warn".to_string()), ..Default::default() };

        let merged = local.merge_over(global).into_config();
        assert_eq!(merged.bind.port(), 9000);
        assert_eq!(merged.log_level, "warn");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env_of(&[
                ("AUTH_USERNAME", "ops"),
                ("AUTH_PASSWORD", "pw"),
                ("RUBRICA_BIND", "127.0.0.1:9999"),
            ]))
            .unwrap();
        assert_eq!(config.auth.username, "ops");
        assert_eq!(config.auth.password, "pw");
        assert_eq!(config.bind.port(), 9999);
    }

    #[test]
    fn test_env_bad_bind_address() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env_of(&[("RUBRICA_BIND", "not-an-address")])).unwrap_err();
        assert!(err.message().contains("RUBRICA_BIND"));
    }

    #[test]
    fn test_stored_profile_direct_password() {
        let profile = stored(Some("pass"), None).resolve_with(env_of(&[])).unwrap();
        assert_eq!(profile.password(), "pass");
        assert_eq!(profile.database_name(), "test");
    }

    #[test]
    fn test_stored_profile_missing_password_is_empty() {
        let profile = stored(None, None).resolve_with(env_of(&[])).unwrap();
        assert_eq!(profile.password(), "");
    }

    #[test]
    fn test_stored_profile_env_password() {
        let profile = stored(Some("ignored"), Some("DB_PASS"))
            .resolve_with(env_of(&[("DB_PASS", "secret")]))
            .unwrap();
        assert_eq!(profile.password(), "secret");
    }

    #[test]
    fn test_stored_profile_missing_env_var() {
        let err = stored(None, Some("NONEXISTENT_VAR")).resolve_with(env_of(&[])).unwrap_err();
        assert!(err.message().contains("Environment variable NONEXISTENT_VAR not found"));
    }

    #[test]
    fn test_stored_profile_debug_hides_password() {
        let debug = format!("{:?}", stored(Some("hunter2"), None));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let path = std::env::temp_dir().join("rubrica-test-missing").join("config.json");
        let file = load_file(&path).unwrap();
        assert!(file.bind.is_none());
    }

    #[test]
    fn test_load_invalid_json() {
        let path = std::env::temp_dir().join(format!("rubrica-invalid-{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        let err = load_file(&path).unwrap_err();
        let _ = fs::remove_file(&path);
        assert!(err.message().contains("Invalid config file"));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let path = std::env::temp_dir().join("rubrica-test-missing-explicit.json");
        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }
}
