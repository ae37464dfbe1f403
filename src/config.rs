//! TOML configuration parsing and validation.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8000"
//! allowed_origins = ["http://localhost:5173"]
//!
//! [llm]
//! provider = "groq"
//! model = "llama-3.3-70b-versatile"
//! timeout_secs = 60
//!
//! [editor]
//! context_lines = 4
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use docedit_core::generate::DEFAULT_CONTEXT_LINES;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// CORS origins; empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Overrides the provider's default `/chat/completions` base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key. Defaults per provider.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            api_key_env: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditorConfig {
    /// Lines of context shown to the model on each side of the target line.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    /// Seed the in-memory store with the welcome document.
    #[serde(default = "default_seed_sample")]
    pub seed_sample: bool,
    /// Buffered events per request before the pipeline waits on the client.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            seed_sample: default_seed_sample(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_context_lines() -> usize {
    DEFAULT_CONTEXT_LINES
}
fn default_seed_sample() -> bool {
    true
}
fn default_channel_capacity() -> usize {
    64
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl Config {
    /// Configuration used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:8000".to_string(),
                allowed_origins: vec![
                    "http://localhost:5173".to_string(),
                    "http://127.0.0.1:5173".to_string(),
                ],
            },
            llm: LlmConfig::default(),
            editor: EditorConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Loads `path` if it exists, otherwise falls back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::warn!(
            "config file {} not found, using built-in defaults",
            path.display()
        );
        Ok(Config::minimal())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    match config.llm.provider.as_str() {
        "disabled" | "openai" | "groq" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, openai, groq, or ollama.",
            other
        ),
    }

    if config.llm.is_enabled() && config.llm.model.is_none() {
        anyhow::bail!(
            "llm.model must be specified when provider is '{}'",
            config.llm.provider
        );
    }

    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    if config.editor.channel_capacity == 0 {
        anyhow::bail!("editor.channel_capacity must be > 0");
    }

    Ok(())
}
