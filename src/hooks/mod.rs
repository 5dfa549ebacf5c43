//! Host-invoked hook entry points.
//!
//! The host runs a hook with a JSON payload on stdin and ignores the exit
//! status, so hooks must never break its flow. Each hook is an ordinary
//! function returning `anyhow::Result<HookOutcome>`; [`run_hook`] is the only
//! place where errors are swallowed.

mod log;
mod notification;
mod post_tool_use;
mod stop;
mod transcript;

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

pub use log::HookLog;
pub use notification::{notification_hook, spoken_notification};
pub use post_tool_use::{post_tool_use_hook, simple_summary};
pub use stop::{completion_message, stop_hook, COMPLETION_MESSAGES};
pub use transcript::Transcript;

use crate::core::HooksConfig;
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::tts::TtsChain;

/// Which hook the host invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Notification,
    PostToolUse,
    Stop {
        /// Copy the transcript to `logs/chat.json`
        chat: bool,
    },
}

impl HookKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::PostToolUse => "post-tool-use",
            Self::Stop { .. } => "stop",
        }
    }
}

/// Payload the host writes to stdin.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HookInput {
    pub session_id: Option<String>,
    pub transcript_path: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
    pub hook_event_name: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub permission_mode: Option<String>,
    pub tool_name: Option<String>,
    pub tool_input: Value,
    pub tool_response: Value,
    pub stop_hook_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HookInput {
    /// Parse the raw payload, keeping the original JSON alongside.
    pub fn parse(raw: &str) -> anyhow::Result<(Self, Value)> {
        let value: Value = serde_json::from_str(raw)?;
        let input = serde_json::from_value(value.clone())?;
        Ok((input, value))
    }

    /// Transcript for this session, if readable.
    pub fn transcript(&self) -> Option<Transcript> {
        let path = self.transcript_path.as_ref()?;
        match Transcript::load(path) {
            Ok(transcript) => Some(transcript),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Transcript unreadable");
                None
            }
        }
    }
}

/// What a hook did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Text was spoken by the named provider (or "none" if speech failed).
    Announced { provider: String, text: String },
    /// Nothing to announce.
    Skipped(String),
}

/// Collaborators shared by all hooks.
pub struct HookContext<'a> {
    pub config: &'a HooksConfig,
    pub llm: &'a dyn CompletionProvider,
    pub speech: &'a TtsChain,
    /// Directory hook logs are resolved against.
    pub cwd: PathBuf,
    /// Timeout for LLM phrase generation.
    pub llm_timeout: Duration,
}

impl HookContext<'_> {
    pub(crate) fn log_dir(&self) -> PathBuf {
        self.config.log_dir_in(&self.cwd)
    }

    /// Ask the fast model for a short phrase; `None` on any failure.
    pub(crate) fn ask_phrase(&self, prompt: String, max_tokens: u32) -> Option<String> {
        let request = CompletionRequest::new(prompt)
            .with_max_tokens(max_tokens)
            .with_timeout(self.llm_timeout)
            .fast();

        match self.llm.complete(&request) {
            Ok(text) => clean_phrase(&text),
            Err(e) => {
                tracing::warn!(provider = self.llm.name(), error = %e, "Phrase generation failed");
                None
            }
        }
    }

    /// Speak `text`, reporting the provider used or "none".
    pub(crate) fn announce(&self, text: &str) -> String {
        match self.speech.speak(text) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!(error = %e, "Announcement not spoken");
                "none".to_string()
            }
        }
    }
}

/// Strip quotes and trailing chatter from a model-generated phrase.
pub(crate) fn clean_phrase(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|line| !line.is_empty())?;
    let line = line.trim_matches(|c| c == '"' || c == '\'' || c == '`').trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// Run a hook against raw stdin, never failing.
///
/// Always returns exit code 0. Errors are logged to stderr.
pub fn run_hook(kind: HookKind, raw: &str, ctx: &HookContext<'_>) -> i32 {
    let result = HookInput::parse(raw).and_then(|(input, value)| match kind {
        HookKind::Notification => notification_hook(&input, ctx),
        HookKind::PostToolUse => post_tool_use_hook(&input, ctx),
        HookKind::Stop { chat } => stop_hook(&input, &value, chat, ctx),
    });

    match result {
        Ok(HookOutcome::Announced { provider, text }) => {
            tracing::info!(hook = kind.name(), provider = %provider, text = %text, "Hook announced");
        }
        Ok(HookOutcome::Skipped(reason)) => {
            tracing::debug!(hook = kind.name(), reason = %reason, "Hook skipped");
        }
        Err(e) => {
            tracing::warn!(hook = kind.name(), error = %e, "Hook failed");
        }
    }

    0
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::*;
    use crate::tts::testing::RecordingSpeaker;

    /// Owned collaborators for building a `HookContext` in tests.
    pub struct Harness {
        pub config: HooksConfig,
        pub speaker: Arc<RecordingSpeaker>,
        pub speech: TtsChain,
        pub dir: tempfile::TempDir,
    }

    impl Harness {
        pub fn new() -> Self {
            let speaker = Arc::new(RecordingSpeaker::new("recording"));
            let speech = TtsChain::with_providers(vec![Box::new(Arc::clone(&speaker))]);
            let config = HooksConfig { desktop_notifications: false, ..HooksConfig::default() };
            Self { config, speaker, speech, dir: tempfile::TempDir::new().unwrap() }
        }

        pub fn context<'a>(&'a self, llm: &'a dyn CompletionProvider) -> HookContext<'a> {
            HookContext {
                config: &self.config,
                llm,
                speech: &self.speech,
                cwd: self.dir.path().to_path_buf(),
                llm_timeout: Duration::from_secs(1),
            }
        }

        pub fn spoken(&self) -> Vec<String> {
            self.speaker.spoken.lock().clone()
        }

        pub fn logs_dir(&self) -> PathBuf {
            self.dir.path().join("logs")
        }
    }
}
