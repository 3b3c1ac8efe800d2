use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub walker: WalkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// `"openai"` for any OpenAI-compatible chat-completions endpoint,
    /// or `"disabled"` to run without a model (every document degrades to
    /// the no-match path).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Endpoint base URL. Defaults to the OpenAI API when unset.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            max_retries: 5,
            timeout_secs: 60,
        }
    }
}

impl ModelConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7410".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WalkerConfig {
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Extra extensions (lowercase, no dot) accepted in addition to the
    /// built-in supported set.
    #[serde(default)]
    pub extra_extensions: Vec<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    match config.model.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown model provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.model.is_enabled() && config.model.model.is_none() {
        anyhow::bail!(
            "model.model must be specified when provider is '{}'",
            config.model.provider
        );
    }

    if config.model.timeout_secs == 0 {
        anyhow::bail!("model.timeout_secs must be > 0");
    }

    Ok(config)
}
