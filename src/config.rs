//! Fastcili configuration loaded from `fastcili.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! `FASTCILI_DATABASE_URL` takes precedence over the file's `database_url`.

use serde::Deserialize;
use std::path::Path;

use crate::error::{FastciliError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "fastcili.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct FastciliConfig {
    /// SQLite connection string.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Run embedded migrations on startup.
    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,

    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

fn default_database_url() -> String {
    "sqlite://fastcili.db".to_string()
}

fn default_auto_migrate() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_min_password_length() -> usize {
    8
}

impl Default for FastciliConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            auto_migrate: default_auto_migrate(),
            log_level: default_log_level(),
            min_password_length: default_min_password_length(),
        }
    }
}

impl FastciliConfig {
    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<FastciliConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("FASTCILI_DATABASE_URL") {
            if !url.is_empty() {
                config.database_url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(FastciliError::Config("database_url must not be empty".into()));
        }
        if self.min_password_length == 0 {
            return Err(FastciliError::Config(
                "min_password_length must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = FastciliConfig::default();
        assert_eq!(config.database_url, "sqlite://fastcili.db");
        assert!(config.auto_migrate);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.min_password_length, 8);
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            log_level = "debug"
            min_password_length = 10
        "#;
        let config: FastciliConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.min_password_length, 10);
        assert!(config.auto_migrate);
    }

    #[test]
    fn load_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fastcili.toml");
        fs::write(&path, "auto_migrate = false\n").unwrap();

        let config = FastciliConfig::load(&path).unwrap();
        assert!(!config.auto_migrate);
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = FastciliConfig::load(&tmp.path().join("missing.toml")).unwrap();
        assert_eq!(config.min_password_length, 8);
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fastcili.toml");
        fs::write(&path, "auto_migrate = \"sometimes\"\n").unwrap();

        assert!(FastciliConfig::load(&path).is_err());
    }

    #[test]
    fn load_rejects_zero_password_length() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fastcili.toml");
        fs::write(&path, "min_password_length = 0\n").unwrap();

        let err = FastciliConfig::load(&path).unwrap_err();
        assert!(matches!(err, FastciliError::Config(_)));
    }
}
