use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Key holding the folder `create-db` indexes by default
pub const TEXTS_DIR_KEY: &str = "texts.dir";

/// Environment variable that replaces the platform config directory
pub const CONFIG_DIR_ENV: &str = "NIKKI_CONFIG_DIR";

const APP_DIR: &str = "nikki";
const CONFIG_FILE: &str = "config.json";

/// Persistent key-value settings stored as a JSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: BTreeMap<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        values.insert(TEXTS_DIR_KEY.to_string(), Value::Null);
        Self { values }
    }
}

impl Config {
    /// Location of the config file for this user
    ///
    /// `NIKKI_CONFIG_DIR` wins; otherwise the platform config directory
    /// (`$XDG_CONFIG_HOME` or `~/.config`, `~/Library/Application Support`,
    /// `%APPDATA%`) with a `nikki` subfolder.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir).join(CONFIG_FILE));
        }

        let base = BaseDirs::new().context("Could not determine the user's home directory")?;
        Ok(base.config_dir().join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location
    pub async fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?).await
    }

    /// Load from `path`; a missing file yields the defaults
    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Config file {} is not a JSON object", path.display()))?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<PathBuf> {
        let path = Self::default_path()?;
        self.save_to(&path).await?;
        Ok(path)
    }

    /// Save as pretty JSON, creating parent directories as needed
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Value for `key`; unset and `null` are both `None`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|value| !value.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Pick the folder to index: an explicit argument, then the `texts.dir` key
pub fn resolve_texts_dir(explicit: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }

    match config.get_str(TEXTS_DIR_KEY) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => anyhow::bail!(
            "No folder to index: pass --folder-path or run `nikki set-config {} <DIR>`",
            TEXTS_DIR_KEY
        ),
    }
}
