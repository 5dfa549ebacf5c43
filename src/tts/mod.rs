//! Text-to-speech providers.
//!
//! Remote providers return audio that is played through a local player;
//! the local provider drives the system speech engine directly. Providers
//! are tried in configured order and the first one that speaks wins.

mod elevenlabs;
mod local;
mod openai;
mod player;

use std::io;

pub use elevenlabs::ElevenLabsProvider;
pub use local::LocalProvider;
pub use openai::OpenAiSpeechProvider;
pub use player::AudioPlayer;

use crate::core::TtsConfig;

/// Speech error types.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("No audio player found (tried {0})")]
    NoPlayer(String),

    #[error("No speech engine found (tried {0})")]
    NoEngine(String),

    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: std::process::ExitStatus },

    #[error("No speech provider available")]
    Unavailable,
}

/// Something that can say a short phrase out loud.
pub trait SpeechProvider {
    fn name(&self) -> &str;

    /// Speak `text`, blocking until playback finishes.
    fn speak(&self, text: &str) -> Result<(), TtsError>;
}

impl<P: SpeechProvider + ?Sized> SpeechProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn speak(&self, text: &str) -> Result<(), TtsError> {
        (**self).speak(text)
    }
}

/// Ordered speech providers with fallback.
pub struct TtsChain {
    providers: Vec<Box<dyn SpeechProvider>>,
}

impl TtsChain {
    /// Build from config. Remote providers without an API key are skipped.
    pub fn from_config(config: &TtsConfig) -> Self {
        let player = AudioPlayer::new(config.player.clone());
        let mut providers: Vec<Box<dyn SpeechProvider>> = Vec::new();

        for name in &config.providers {
            let provider: Result<Box<dyn SpeechProvider>, TtsError> = match name.as_str() {
                "elevenlabs" => ElevenLabsProvider::from_env(config, player.clone())
                    .map(|p| Box::new(p) as Box<dyn SpeechProvider>),
                "openai" => OpenAiSpeechProvider::from_env(config, player.clone())
                    .map(|p| Box::new(p) as Box<dyn SpeechProvider>),
                "local" => Ok(Box::new(LocalProvider::new(config.speech_rate))),
                other => {
                    tracing::warn!(provider = other, "Unknown TTS provider in config");
                    continue;
                }
            };

            match provider {
                Ok(provider) => providers.push(provider),
                Err(e) => tracing::debug!(provider = name.as_str(), error = %e, "Skipping TTS provider"),
            }
        }

        Self { providers }
    }

    pub fn with_providers(providers: Vec<Box<dyn SpeechProvider>>) -> Self {
        Self { providers }
    }

    pub fn is_available(&self) -> bool {
        !self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Speak with the first provider that succeeds, returning its name.
    pub fn speak(&self, text: &str) -> Result<String, TtsError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.speak(text) {
                Ok(()) => {
                    tracing::debug!(provider = provider.name(), "Spoke announcement");
                    return Ok(provider.name().to_string());
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "TTS provider failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(TtsError::Unavailable))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Records spoken phrases instead of playing them.
    pub struct RecordingSpeaker {
        name: &'static str,
        fail: bool,
        pub spoken: Mutex<Vec<String>>,
    }

    impl RecordingSpeaker {
        pub fn new(name: &'static str) -> Self {
            Self { name, fail: false, spoken: Mutex::new(Vec::new()) }
        }

        pub fn failing(name: &'static str) -> Self {
            Self { name, fail: true, spoken: Mutex::new(Vec::new()) }
        }
    }

    impl SpeechProvider for RecordingSpeaker {
        fn name(&self) -> &str {
            self.name
        }

        fn speak(&self, text: &str) -> Result<(), TtsError> {
            if self.fail {
                return Err(TtsError::Unavailable);
            }
            self.spoken.lock().push(text.to_string());
            Ok(())
        }
    }

    impl SpeechProvider for std::sync::Arc<RecordingSpeaker> {
        fn name(&self) -> &str {
            self.as_ref().name()
        }

        fn speak(&self, text: &str) -> Result<(), TtsError> {
            self.as_ref().speak(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::RecordingSpeaker;
    use super::*;

    #[test]
    fn test_chain_returns_speaking_provider() {
        let speaker = Arc::new(RecordingSpeaker::new("second"));
        let chain = TtsChain::with_providers(vec![
            Box::new(RecordingSpeaker::failing("first")),
            Box::new(Arc::clone(&speaker)),
        ]);

        assert_eq!(chain.speak("Work complete!").unwrap(), "second");
        assert_eq!(speaker.spoken.lock().as_slice(), ["Work complete!"]);
    }

    #[test]
    fn test_empty_chain_unavailable() {
        let chain = TtsChain::with_providers(Vec::new());
        assert!(matches!(chain.speak("hi"), Err(TtsError::Unavailable)));
    }

    #[test]
    fn test_local_only_config() {
        let config = TtsConfig { providers: vec!["local".to_string()], ..TtsConfig::default() };
        let chain = TtsChain::from_config(&config);
        assert_eq!(chain.provider_names(), vec!["local"]);
    }
}
