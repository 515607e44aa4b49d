//! Configuration: defaults, then an optional JSON file, then environment.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "backlog-forge";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

/// Settings for the chat-completions backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API, without `/chat/completions`.
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Load configuration from the user's config directory, then apply the
    /// process environment. Falls back to defaults if the file fails to parse.
    pub fn load() -> Self {
        let mut config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        config
    }

    fn try_load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Reads `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;

        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Overrides fields from `lookup`, which maps a variable name to its value.
    ///
    /// Unparseable numbers are ignored and keep the previous value.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("BACKLOG_FORGE_API_URL") {
            self.generation.api_url = url;
        }
        if let Some(key) = get("BACKLOG_FORGE_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.generation.api_key = Some(key);
        }
        if let Some(model) = get("BACKLOG_FORGE_MODEL") {
            self.generation.model = model;
        }
        if let Some(temperature) = get("BACKLOG_FORGE_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.generation.temperature = temperature;
        }
        if let Some(host) = get("BACKLOG_FORGE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("BACKLOG_FORGE_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
