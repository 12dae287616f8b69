use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::family::validator::CyclePolicy;

#[derive(Deserialize, Serialize, Default, Debug)]
pub struct Configuration {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub validation: ValidationConfig,
    /// People inserted when the database is first initialised, keyed by a
    /// short handle that `children` entries refer to.
    #[serde(default)]
    pub family: BTreeMap<String, Family>,
}

impl Configuration {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let cfg: Self = toml::from_str(&config)
            .with_context(|| format!("failed to parse configuration {}", path.display()))?;
        Ok(cfg)
    }
}

#[derive(Deserialize, Serialize, Debug)]
pub struct DatabaseConfig {
    /// Directory holding `db.sqlite`, or `:memory:` for a throwaway store.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::from("data"),
        }
    }
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub struct ValidationConfig {
    #[serde(default)]
    pub cycle_check: CyclePolicy,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub struct Family {
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}
