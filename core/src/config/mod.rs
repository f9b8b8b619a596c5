use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MCPHUB_DIR: &str = ".mcphub";

/// Free-form settings for a single tool.
///
/// Keys a tool does not recognise are ignored; keys it expects but cannot
/// find fall back to that tool's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolConfig(Map<String, Value>);

impl ToolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn str_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or(default).to_string()
    }

    pub fn u64_or(&self, key: &str, default: u64) -> u64 {
        self.0.get(key).and_then(|v| v.as_u64()).unwrap_or(default)
    }

    pub fn path_or(&self, key: &str, default: &str) -> PathBuf {
        PathBuf::from(self.get_str(key).unwrap_or(default))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: BTreeMap<String, ToolConfig>,
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Settings for `name`, or an empty table when none are configured.
    pub fn tool(&self, name: &str) -> ToolConfig {
        self.tools.get(name).cloned().unwrap_or_default()
    }

    pub fn with_tool(mut self, name: impl Into<String>, config: ToolConfig) -> Self {
        self.tools.insert(name.into(), config);
        self
    }
}

pub fn get_mcphub_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(MCPHUB_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_mcphub_dir().join("config.toml")
}

pub fn ensure_mcphub_dir() -> Result<PathBuf> {
    let dir = get_mcphub_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create mcphub directory at {}", dir.display()))?;
    }

    Ok(dir)
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    if !config_path.exists() {
        anyhow::bail!("Config file not found. Run 'mcphub init' to create one.");
    }

    Config::load_from(&config_path)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_mcphub_dir()?;
    save_config_to(config, &get_config_path())
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}
