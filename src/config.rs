//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/cork.sqlite"
//!
//! [enrichment]
//! provider = "gemini"
//! model = "gemini-2.5-flash"
//! timeout_secs = 30
//! max_retries = 2
//! api_key_env = "GEMINI_API_KEY"
//!
//! [storage]
//! snapshot_key = "corkboard_data"
//! credential_key = "corkboard_api_key"
//! ```
//!
//! Only `[db]` is required.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use corkboard_core::persistence::{StorageKeys, DEFAULT_CREDENTIAL_KEY, DEFAULT_SNAPSHOT_KEY};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Environment variable consulted when no credential is stored.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}
fn default_api_key_env() -> Option<String> {
    Some("GEMINI_API_KEY".to_string())
}

impl EnrichmentConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
    #[serde(default = "default_credential_key")]
    pub credential_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_key: default_snapshot_key(),
            credential_key: default_credential_key(),
        }
    }
}

fn default_snapshot_key() -> String {
    DEFAULT_SNAPSHOT_KEY.to_string()
}
fn default_credential_key() -> String {
    DEFAULT_CREDENTIAL_KEY.to_string()
}

impl StorageConfig {
    pub fn keys(&self) -> StorageKeys {
        StorageKeys {
            snapshot: self.snapshot_key.clone(),
            credential: self.credential_key.clone(),
        }
    }
}

impl Config {
    /// Defaults for when no config file exists: a database under `./data`.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/cork.sqlite"),
            },
            enrichment: EnrichmentConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    match config.enrichment.provider.as_str() {
        "disabled" | "gemini" => {}
        other => anyhow::bail!(
            "Unknown enrichment provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }

    if config.enrichment.is_enabled() {
        if config.enrichment.timeout_secs == 0 {
            anyhow::bail!("enrichment.timeout_secs must be > 0");
        }
        if config.enrichment.model.trim().is_empty() {
            anyhow::bail!("enrichment.model must not be empty");
        }
    }

    let storage = &config.storage;
    if storage.snapshot_key.trim().is_empty() || storage.credential_key.trim().is_empty() {
        anyhow::bail!("storage keys must not be empty");
    }
    if storage.snapshot_key == storage.credential_key {
        anyhow::bail!("storage.snapshot_key and storage.credential_key must differ");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = parse_config("[db]\npath = \"/tmp/cork.sqlite\"\n").unwrap();
        assert_eq!(config.enrichment.provider, "gemini");
        assert_eq!(config.enrichment.model, "gemini-2.5-flash");
        assert_eq!(config.enrichment.api_key_env.as_deref(), Some("GEMINI_API_KEY"));
        assert_eq!(config.storage.keys(), StorageKeys::default());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[db]\npath = \"x\"\n[enrichment]\nprovider = \"magic\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("Unknown enrichment provider"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(parse_config("[db]\npath = \"x\"\n[enrichment]\ntimeout_secs = 0\n").is_err());
        // disabled provider doesn't care
        assert!(parse_config(
            "[db]\npath = \"x\"\n[enrichment]\nprovider = \"disabled\"\ntimeout_secs = 0\n"
        )
        .is_ok());
    }

    #[test]
    fn test_rejects_colliding_storage_keys() {
        let toml = "[db]\npath = \"x\"\n[storage]\nsnapshot_key = \"k\"\ncredential_key = \"k\"\n";
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_missing_db_section_fails() {
        assert!(parse_config("[enrichment]\nprovider = \"disabled\"\n").is_err());
    }
}
