use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use std::path::{Path, PathBuf};

use super::Settings;
use crate::utils::get_home_dir;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

const REPO_CONFIG: &str = "utilp.toml";
const ENV_PREFIX: &str = "UTILP_";

pub struct UtilpConfig {
    figment: Figment,
}

impl UtilpConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    /// Layer the configuration sources, lowest priority first.
    ///
    /// A custom file replaces the user and repository files. Environment
    /// variables always win.
    pub fn load_with_custom_config(custom_config: Option<&Path>) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");

        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(custom_path) = custom_config {
            if !custom_path.exists() {
                tracing::warn!("Config file {} not found, using defaults", custom_path.display());
            }
            figment = figment.merge(Toml::file(custom_path));
        } else {
            if let Some(user_path) = Self::user_config_path() {
                figment = figment.merge(Toml::file(user_path));
            }
            figment = figment.merge(Toml::file(REPO_CONFIG));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(UtilpConfig { figment })
    }

    /// Typed view of the merged configuration
    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .context("Invalid utilp configuration")
    }

    /// Get a nested object/section as JSON
    pub fn get_section(&self, path: &str) -> Result<serde_json::Value> {
        let value = self.figment.extract_inner(path)?;
        Ok(value)
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        let value = self.figment.extract()?;
        Ok(value)
    }

    pub fn user_config_path() -> Option<PathBuf> {
        get_home_dir().map(|home| home.join(".config").join("utilp").join("config.toml"))
    }
}
