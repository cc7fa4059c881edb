use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ledger::SignPolicy;

const CONFIG_FILE: &str = "budgetledger.toml";
const DATABASE_FILE: &str = "budgetledger.db";

pub(crate) const ENV_USER: &str = "BUDGETLEDGER_USER";
pub(crate) const ENV_DB: &str = "BUDGETLEDGER_DB";
pub(crate) const ENV_AI_BASE_URL: &str = "BUDGETLEDGER_AI_BASE_URL";
pub(crate) const ENV_AI_KEY: &str = "BUDGETLEDGER_AI_KEY";

/// Settings read from `budgetledger.toml`. Every field is optional in the
/// file; missing ones take the defaults below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub(crate) database_path: Option<PathBuf>,
    /// Name of the registered user operations run as.
    pub(crate) user: Option<String>,
    pub(crate) log_level: String,
    pub(crate) income_policy: SignPolicy,
    pub(crate) ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            user: None,
            log_level: "warn".into(),
            income_policy: SignPolicy::default(),
            ai: AiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AiConfig {
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) temperature: f32,
    pub(crate) timeout_secs: u64,
    /// Only ever taken from the environment.
    #[serde(skip)]
    pub(crate) api_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.1,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "budgetledger", "BudgetLedger")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

impl Config {
    /// Load the user's config file and apply environment overrides.
    pub(crate) fn load() -> Result<Self> {
        let path = project_dirs()?.config_dir().join(CONFIG_FILE);
        let mut config = Self::load_from(&path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse a config file. A missing file yields the defaults.
    pub(crate) fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub(crate) fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        if let Some(user) = set(ENV_USER) {
            self.user = Some(user);
        }
        if let Some(db) = set(ENV_DB) {
            self.database_path = Some(PathBuf::from(db));
        }
        if let Some(url) = set(ENV_AI_BASE_URL) {
            self.ai.base_url = url;
        }
        self.ai.api_key = set(ENV_AI_KEY);
    }

    /// Configured database path, or `budgetledger.db` in the platform data
    /// directory (created if needed).
    pub(crate) fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let dirs = project_dirs()?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Ok(data_dir.join(DATABASE_FILE))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
