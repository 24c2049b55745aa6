/*!
common/src/lib.rs

Shared configuration types for newsbrief.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with default/override merging
- Accessors that resolve every optional key to its built-in default
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_LLM_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

/// HTTP server section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Upper bound on live browser sessions kept in memory
    pub max_sessions: Option<usize>,
}

/// NewsAPI (`/v2/everything`) search section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsApiConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub language: Option<String>,
    pub sort_by: Option<String>,
    pub default_page_size: Option<u32>,
    pub default_days_back: Option<u32>,
    /// Hard upper limit enforced by the upstream API
    pub max_page_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Chat-completion endpoint section (OpenAI-compatible, Groq by default)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub available_models: Vec<String>,
    pub default_model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub timeout_seconds: Option<u64>,
    /// How many articles are folded into the analysis prompt
    pub max_prompt_articles: Option<usize>,
}

/// Limits applied to the research form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    pub max_days_back: Option<u32>,
    pub min_articles: Option<u32>,
    pub max_articles_display: Option<u32>,
    pub history_limit: Option<usize>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub newsapi: NewsApiConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject endpoint URLs that cannot be parsed, so a typo fails at startup
    /// instead of on the first research request.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(self.newsapi_url())
            .with_context(|| format!("Invalid newsapi.api_url: {}", self.newsapi_url()))?;
        url::Url::parse(self.llm_url())
            .with_context(|| format!("Invalid llm.api_url: {}", self.llm_url()))?;
        if self.min_articles() > self.max_articles_display() {
            anyhow::bail!(
                "ui.min_articles ({}) is greater than ui.max_articles_display ({})",
                self.min_articles(),
                self.max_articles_display()
            );
        }
        Ok(())
    }

    pub fn bind_address(&self) -> &str {
        self.server.bind.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn port(&self) -> u16 {
        self.server.port.unwrap_or(8000)
    }

    pub fn max_sessions(&self) -> usize {
        self.server.max_sessions.unwrap_or(256).max(1)
    }

    pub fn newsapi_url(&self) -> &str {
        self.newsapi.api_url.as_deref().unwrap_or(DEFAULT_NEWSAPI_URL)
    }

    pub fn newsapi_key_env(&self) -> &str {
        self.newsapi.api_key_env.as_deref().unwrap_or("NEWSAPI_KEY")
    }

    pub fn news_language(&self) -> &str {
        self.newsapi.language.as_deref().unwrap_or("en")
    }

    pub fn news_sort_by(&self) -> &str {
        self.newsapi.sort_by.as_deref().unwrap_or("relevancy")
    }

    pub fn default_page_size(&self) -> u32 {
        self.newsapi.default_page_size.unwrap_or(15)
    }

    pub fn default_days_back(&self) -> u32 {
        self.newsapi.default_days_back.unwrap_or(7)
    }

    pub fn max_page_size(&self) -> u32 {
        self.newsapi.max_page_size.unwrap_or(100)
    }

    pub fn news_timeout_seconds(&self) -> u64 {
        self.newsapi.timeout_seconds.unwrap_or(30)
    }

    pub fn llm_url(&self) -> &str {
        self.llm.api_url.as_deref().unwrap_or(DEFAULT_LLM_URL)
    }

    pub fn llm_key_env(&self) -> &str {
        self.llm.api_key_env.as_deref().unwrap_or("GROQ_API_KEY")
    }

    /// Models offered in the sidebar. Falls back to the built-in list when the
    /// config does not name any.
    pub fn available_models(&self) -> Vec<String> {
        if self.llm.available_models.is_empty() {
            [
                "openai/gpt-oss-120b",
                "llama-3.1-8b-instant",
                "moonshotai/kimi-k2-instruct-0905",
                "gemma-7b-it",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect()
        } else {
            self.llm.available_models.clone()
        }
    }

    pub fn default_model(&self) -> String {
        self.llm
            .default_model
            .clone()
            .or_else(|| self.llm.available_models.first().cloned())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn temperature(&self) -> f32 {
        self.llm.temperature.unwrap_or(0.3)
    }

    pub fn max_tokens(&self) -> usize {
        self.llm.max_tokens.unwrap_or(1000)
    }

    pub fn llm_timeout_seconds(&self) -> u64 {
        self.llm.timeout_seconds.unwrap_or(30)
    }

    pub fn max_prompt_articles(&self) -> usize {
        self.llm.max_prompt_articles.unwrap_or(10)
    }

    pub fn max_days_back(&self) -> u32 {
        self.ui.max_days_back.unwrap_or(30).max(1)
    }

    pub fn min_articles(&self) -> u32 {
        self.ui.min_articles.unwrap_or(5).max(1)
    }

    pub fn max_articles_display(&self) -> u32 {
        self.ui.max_articles_display.unwrap_or(50)
    }

    pub fn history_limit(&self) -> usize {
        self.ui.history_limit.unwrap_or(20)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read an API key from the named environment variable.
/// Empty values are treated as unset.
pub fn resolve_api_key(env_name: &str) -> Option<String> {
    std::env::var(env_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
