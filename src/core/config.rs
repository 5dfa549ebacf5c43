//! Configuration management for Titanium.
//!
//! Handles loading configuration from TOML files. API keys never live here;
//! they are read from the environment (optionally populated from `.env`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the project-local config file.
pub const LOCAL_CONFIG_FILE: &str = ".titanium.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM completion settings
    pub llm: LlmConfig,

    /// Text-to-speech settings
    pub tts: TtsConfig,

    /// Hook behaviour
    pub hooks: HooksConfig,
}

/// LLM completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Providers to try, in order (`openai`, `anthropic`)
    pub providers: Vec<String>,

    /// OpenAI model used for documents and plans
    pub openai_model: String,

    /// OpenAI model used for short hook summaries
    pub openai_fast_model: String,

    /// Anthropic model used for documents and plans
    pub anthropic_model: String,

    /// Anthropic model used for short hook summaries
    pub anthropic_fast_model: String,

    /// Override for the OpenAI-compatible base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,

    /// Token budget for generated documents
    pub document_max_tokens: u32,

    /// Token budget for generated plans
    pub plan_max_tokens: u32,

    /// Sampling temperature for documents and plans
    pub temperature: f32,

    /// Request timeout for document and plan generation, in seconds
    pub timeout_secs: u64,

    /// Request timeout for hook summaries, in seconds
    pub hook_timeout_secs: u64,

    /// Maximum characters of an input document embedded in a prompt
    pub context_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            providers: vec!["openai".to_string(), "anthropic".to_string()],
            openai_model: "gpt-4o".to_string(),
            openai_fast_model: "gpt-5-nano".to_string(),
            anthropic_model: "claude-sonnet-4-20250514".to_string(),
            anthropic_fast_model: "claude-3-5-haiku-latest".to_string(),
            openai_base_url: None,
            document_max_tokens: 4000,
            plan_max_tokens: 2000,
            temperature: 0.3,
            timeout_secs: 120,
            hook_timeout_secs: 10,
            context_chars: 3000,
        }
    }
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Providers to try, in order (`elevenlabs`, `openai`, `local`)
    pub providers: Vec<String>,

    /// ElevenLabs voice id
    pub elevenlabs_voice_id: String,

    /// ElevenLabs model id
    pub elevenlabs_model: String,

    /// OpenAI speech model
    pub openai_model: String,

    /// OpenAI voice name
    pub openai_voice: String,

    /// Words per minute for the local speech engine
    pub speech_rate: u32,

    /// Request timeout for remote providers, in seconds
    pub timeout_secs: u64,

    /// Audio player command (audio file path is appended)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            providers: vec!["elevenlabs".to_string(), "openai".to_string(), "local".to_string()],
            elevenlabs_voice_id: "EXAVITQu4vr4xnSDxMaL".to_string(),
            elevenlabs_model: "eleven_turbo_v2_5".to_string(),
            openai_model: "tts-1".to_string(),
            openai_voice: "nova".to_string(),
            speech_rate: 180,
            timeout_secs: 15,
            player: None,
        }
    }
}

/// Hook behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Tools that never trigger a post-tool-use announcement
    pub quiet_tools: Vec<String>,

    /// Log directory, relative to the working directory
    pub log_dir: String,

    /// Entries kept in rolling hook logs
    pub max_log_entries: usize,

    /// Environment variable holding the user's display name
    pub display_name_env: String,

    /// Whether to raise a desktop notification alongside speech
    pub desktop_notifications: bool,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            quiet_tools: ["TodoWrite", "Grep", "LS", "Bash", "Read", "Glob", "WebFetch", "WebSearch"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            log_dir: "logs".to_string(),
            max_log_entries: 50,
            display_name_env: "ENGINEER_NAME".to_string(),
            desktop_notifications: true,
        }
    }
}

impl HooksConfig {
    /// Resolve the log directory against a working directory.
    pub fn log_dir_in(&self, cwd: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.log_dir);
        let dir = PathBuf::from(expanded.as_ref());
        if dir.is_absolute() {
            dir
        } else {
            cwd.join(dir)
        }
    }

    /// Read the user's display name, if set.
    pub fn display_name(&self) -> Option<String> {
        std::env::var(&self.display_name_env)
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.titanium.toml` in current directory
    /// 2. `~/.config/titanium/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::global_config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Path of the file `load` would read, if any exists.
    pub fn active_path() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }
        Self::global_config_path().filter(|p| p.exists())
    }

    /// Get the global config file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("titanium"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.providers, vec!["openai", "anthropic"]);
        assert_eq!(config.tts.providers.first().map(String::as_str), Some("elevenlabs"));
        assert_eq!(config.hooks.max_log_entries, 50);
        assert!(config.hooks.quiet_tools.iter().any(|t| t == "Bash"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[llm]
openai_model = "gpt-4.1"

[tts]
providers = ["local"]
"#,
        )
        .unwrap();

        assert_eq!(config.llm.openai_model, "gpt-4.1");
        assert_eq!(config.llm.plan_max_tokens, 2000);
        assert_eq!(config.tts.providers, vec!["local"]);
        assert_eq!(config.hooks.log_dir, "logs");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.openai_model, config.llm.openai_model);
        assert_eq!(parsed.tts.elevenlabs_voice_id, config.tts.elevenlabs_voice_id);
    }

    #[test]
    fn test_log_dir_resolution() {
        let hooks = HooksConfig::default();
        let cwd = Path::new("/tmp/project");
        assert_eq!(hooks.log_dir_in(cwd), PathBuf::from("/tmp/project/logs"));

        let hooks = HooksConfig { log_dir: "/var/log/titanium".to_string(), ..HooksConfig::default() };
        assert_eq!(hooks.log_dir_in(cwd), PathBuf::from("/var/log/titanium"));
    }
}
