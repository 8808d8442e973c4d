use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::storage::DEFAULT_KEY_PREFIX;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum StorageSettings {
    InMemory,
    Sqlite { path: String },
    File { path: String },
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings::File {
            path: "data/accounts.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct KeySettings {
    #[serde(default = "default_key_prefix")]
    pub prefix: String,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            prefix: default_key_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub keys: KeySettings,
}

impl Settings {
    pub fn load() -> Result<Settings, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("SWIPE_ACCOUNTS").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("SWIPE_ACCOUNTS").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
