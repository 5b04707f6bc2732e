/*!
common/src/lib.rs

Shared configuration types for Blogcast.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a default config file merged with an override file
- Credential resolution from inline values or named environment variables
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Completion model settings (OpenAI-compatible chat completions endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    /// Inline credential; takes precedence over `api_key_env`
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: None,
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.2,
            max_tokens: 1000,
            timeout_seconds: 60,
        }
    }
}

impl LlmConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// Text-to-speech settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// API root, e.g. "https://api.elevenlabs.io/v1"
    pub api_url: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    pub optimize_streaming_latency: String,
    pub timeout_seconds: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.elevenlabs.io/v1".to_string(),
            api_key: None,
            api_key_env: "ELEVENLABS_API_KEY".to_string(),
            // "Adam" pre-made voice
            voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            output_format: "mp3_22050_32".to_string(),
            optimize_streaming_latency: "0".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl TtsConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// Scraper settings. `adapter` is "firecrawl" (hosted API) or "readability" (direct fetch).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub adapter: String,
    pub api_url: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            adapter: "firecrawl".to_string(),
            api_url: "https://api.firecrawl.dev/v1/scrape".to_string(),
            api_key: None,
            api_key_env: "FIRECRAWL_API_KEY".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl ScraperConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// Where generated audio files are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: ".".to_string() }
    }
}

/// Chat transcript compaction policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Compaction runs once the transcript holds strictly more messages than this
    pub compaction_threshold: usize,
    /// Number of most recent messages kept after compaction
    pub retained_messages: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: 10,
            retained_messages: 2,
        }
    }
}

/// Observability project settings, attached to every pipeline span
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub project_name: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            project_name: "blog2podcast".to_string(),
            api_key: None,
            api_key_env: "OPIK_API_KEY".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// HTTP front-end bind settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Scraped posts kept for chat; the oldest run is dropped past this
    pub max_documents: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            max_documents: 100,
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub scraper: ScraperConfig,
    pub output: OutputConfig,
    pub chat: ChatConfig,
    pub observability: ObservabilityConfig,
    pub server: ServerConfig,
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
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are ignored; with neither present the built-in defaults apply.
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

    /// Sanity checks that do not need credentials or network access.
    pub fn validate(&self) -> Result<()> {
        for (section, api_url) in [
            ("llm", &self.llm.api_url),
            ("tts", &self.tts.api_url),
            ("scraper", &self.scraper.api_url),
        ] {
            url::Url::parse(api_url)
                .with_context(|| format!("Invalid {}.api_url: {}", section, api_url))?;
        }

        if self.chat.retained_messages > self.chat.compaction_threshold {
            anyhow::bail!(
                "chat.retained_messages ({}) must not exceed chat.compaction_threshold ({})",
                self.chat.retained_messages,
                self.chat.compaction_threshold
            );
        }

        if self.server.max_documents == 0 {
            anyhow::bail!("server.max_documents must be at least 1");
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be within 0.0..=2.0, got {}", self.llm.temperature);
        }

        Ok(())
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

/// Resolve a credential: a non-blank inline value wins, otherwise the named
/// environment variable is read. Blank values count as absent.
pub fn resolve_secret(inline: Option<&str>, env_name: &str) -> Option<String> {
    inline
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| {
            if env_name.is_empty() {
                return None;
            }
            std::env::var(env_name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn config_from_string_uses_defaults_for_missing_sections() {
        let toml = r#"
            [llm]
            model = "llama-3.1-8b-instant"
            max_tokens = 400

            [chat]
            compaction_threshold = 20
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.llm.model, "llama-3.1-8b-instant");
        assert_eq!(cfg.llm.max_tokens, 400);
        assert_eq!(cfg.llm.api_key_env, "GROQ_API_KEY");
        assert_eq!(cfg.chat.compaction_threshold, 20);
        assert_eq!(cfg.chat.retained_messages, 2);
        assert_eq!(cfg.tts.voice_id, "pNInz6obpgDQGcFmaJgB");
        assert_eq!(cfg.tts.output_format, "mp3_22050_32");
        assert_eq!(cfg.scraper.adapter, "firecrawl");
        assert_eq!(cfg.output.dir, ".");
    }

    #[tokio::test]
    async fn override_file_wins_key_by_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        fs::write(
            &default_path,
            "[llm]\nmodel = \"base-model\"\ntemperature = 0.5\n\n[server]\nport = 9000\n",
        )
        .expect("write default");
        fs::write(&override_path, "[llm]\nmodel = \"override-model\"\n").expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");

        assert_eq!(cfg.llm.model, "override-model");
        assert_eq!(cfg.llm.temperature, 0.5);
        assert_eq!(cfg.server.port, 9000);
    }

    #[tokio::test]
    async fn missing_files_fall_back_to_builtin_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");

        let cfg = Config::load_with_defaults(Some(&missing), None)
            .await
            .expect("load config");

        assert_eq!(cfg.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(cfg.chat.compaction_threshold, 10);
    }

    #[test]
    fn validate_rejects_bad_urls_and_policy() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_ok());

        cfg.scraper.api_url = "not a url".to_string();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("scraper.api_url"));

        let mut cfg = Config::default();
        cfg.chat.retained_messages = 11;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        assert_eq!(cfg.server.max_documents, 100);
        cfg.server.max_documents = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inline_secret_wins_and_blank_is_absent() {
        assert_eq!(
            resolve_secret(Some("inline-key"), "BLOGCAST_TEST_UNSET_VAR"),
            Some("inline-key".to_string())
        );
        assert_eq!(resolve_secret(Some("   "), "BLOGCAST_TEST_UNSET_VAR"), None);
        assert_eq!(resolve_secret(None, ""), None);
    }

    #[test]
    fn secret_read_from_named_env_var() {
        std::env::set_var("BLOGCAST_TEST_SECRET_VAR", "from-env");
        assert_eq!(
            resolve_secret(None, "BLOGCAST_TEST_SECRET_VAR"),
            Some("from-env".to_string())
        );
        std::env::remove_var("BLOGCAST_TEST_SECRET_VAR");
    }
}
