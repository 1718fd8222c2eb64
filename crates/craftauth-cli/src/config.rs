//! Application configuration management.
//!
//! This module handles loading and saving the CLI configuration: the
//! Minecraft directory, last used username and the auth service settings,
//! including the per-installation client token.
//!
//! Configuration is stored at `~/.config/craftauth/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use craftauth_core::auth::generate_client_token;
use craftauth_core::AuthConfig;
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "craftauth";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Used when neither the environment nor the config names a directory
const DEFAULT_MINECRAFT_DIR: &str = ".minecraft";

/// Environment override for the Minecraft directory
pub const MINECRAFT_DIR_ENV: &str = "CRAFTAUTH_MINECRAFT_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub minecraft_dir: Option<PathBuf>,
    pub last_username: Option<String>,
    pub auth: AuthConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Minecraft directory from the environment, then the config file.
    pub fn minecraft_dir(&self) -> PathBuf {
        std::env::var_os(MINECRAFT_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| self.minecraft_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MINECRAFT_DIR))
    }

    /// Generate the installation's client token on first use.
    /// Returns true when the config changed and should be saved.
    pub fn ensure_client_token(&mut self) -> bool {
        if self.auth.client_token.is_some() {
            return false;
        }
        self.auth.client_token = Some(generate_client_token());
        true
    }
}
