use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DwLogError, Result};
use crate::severity::Severity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub enabled: bool,
    pub database_url: String,
    /// Explicit dialect name; derived from the URL scheme when unset.
    pub dialect: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub min_level: Severity,
    pub bubble: bool,
    pub http_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_root = env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(home).join(".local/share"));
        let db_path = data_root.join("dwlog/dwlog.db");

        Self {
            enabled: true,
            database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
            dialect: None,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            min_level: Severity::Debug,
            bubble: true,
            http_addr: "127.0.0.1:8085".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    /// Local file path behind a `sqlite:` URL, if any.
    pub fn sqlite_path(&self) -> Option<PathBuf> {
        let rest = self.database_url.strip_prefix("sqlite:")?;
        let rest = rest.trim_start_matches("//");
        let path = rest.split('?').next().unwrap_or_default();
        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    enabled: Option<bool>,
    database_url: Option<String>,
    dialect: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout: Option<String>,
    min_level: Option<String>,
    bubble: Option<bool>,
    http_addr: Option<String>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("DWLOG_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("dwlog/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| DwLogError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| DwLogError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    Ok(ConfigOverrides {
        enabled: env_bool("DWLOG_ENABLED")?,
        database_url: env::var("DWLOG_DATABASE_URL").ok(),
        dialect: env::var("DWLOG_DIALECT").ok(),
        max_connections: match env::var("DWLOG_MAX_CONNECTIONS") {
            Ok(v) => Some(v.parse::<u32>().map_err(|e| {
                DwLogError::Config(format!("bad DWLOG_MAX_CONNECTIONS in environment: {e}"))
            })?),
            Err(_) => None,
        },
        acquire_timeout: env::var("DWLOG_ACQUIRE_TIMEOUT").ok(),
        min_level: env::var("DWLOG_MIN_LEVEL").ok(),
        bubble: env_bool("DWLOG_BUBBLE")?,
        http_addr: env::var("DWLOG_HTTP_ADDR").ok(),
    })
}

fn env_bool(key: &str) -> Result<Option<bool>> {
    match env::var(key) {
        Ok(v) => parse_bool(&v)
            .map(Some)
            .ok_or_else(|| DwLogError::Config(format!("bad {key} in environment: {v}"))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.enabled {
        cfg.enabled = v;
    }
    if let Some(v) = overrides.database_url {
        cfg.database_url = v;
    }
    if let Some(v) = overrides.dialect {
        cfg.dialect = Some(v);
    }
    if let Some(v) = overrides.max_connections {
        if v == 0 {
            return Err(DwLogError::Config(format!(
                "bad max_connections in {source}: must be at least 1"
            )));
        }
        cfg.max_connections = v;
    }
    if let Some(v) = overrides.acquire_timeout {
        cfg.acquire_timeout = humantime::parse_duration(&v).map_err(|e| {
            DwLogError::Config(format!("bad acquire_timeout in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.min_level {
        cfg.min_level = Severity::from_str(&v).map_err(|e| {
            DwLogError::Config(format!("bad min_level in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.bubble {
        cfg.bubble = v;
    }
    if let Some(v) = overrides.http_addr {
        cfg.http_addr = v;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_enabled_sqlite() {
        let cfg = Config::default();
        assert!(cfg.enabled);
        assert!(cfg.bubble);
        assert!(cfg.database_url.starts_with("sqlite://"));
        assert!(cfg.database_url.ends_with("dwlog/dwlog.db?mode=rwc"));
        assert_eq!(cfg.min_level, Severity::Debug);
        assert_eq!(cfg.http_addr, "127.0.0.1:8085");
    }

    #[test]
    fn apply_file_overrides_updates_fields() {
        let mut cfg = Config::default();
        let file: ConfigOverrides = toml::from_str(
            r#"
            enabled = false
            database_url = "postgres://app@localhost/app"
            acquire_timeout = "3s"
            min_level = "warning"
            bubble = false
            "#,
        )
        .unwrap();

        apply_overrides(&mut cfg, file, "config file").unwrap();

        assert!(!cfg.enabled);
        assert_eq!(cfg.database_url, "postgres://app@localhost/app");
        assert_eq!(cfg.acquire_timeout, Duration::from_secs(3));
        assert_eq!(cfg.min_level, Severity::Warning);
        assert!(!cfg.bubble);
    }

    #[test]
    fn apply_overrides_rejects_bad_values() {
        let mut cfg = Config::default();
        let bad_level = ConfigOverrides {
            min_level: Some("loud".into()),
            ..ConfigOverrides::default()
        };
        assert!(apply_overrides(&mut cfg, bad_level, "environment").is_err());

        let bad_pool = ConfigOverrides {
            max_connections: Some(0),
            ..ConfigOverrides::default()
        };
        assert!(apply_overrides(&mut cfg, bad_pool, "environment").is_err());
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn sqlite_path_from_url() {
        let mut cfg = Config {
            database_url: "sqlite:///tmp/dwlog/logs.db?mode=rwc".into(),
            ..Config::default()
        };
        assert_eq!(cfg.sqlite_path(), Some(PathBuf::from("/tmp/dwlog/logs.db")));

        cfg.database_url = "sqlite::memory:".into();
        assert_eq!(cfg.sqlite_path(), None);

        cfg.database_url = "mysql://root@localhost/app".into();
        assert_eq!(cfg.sqlite_path(), None);
    }
}
