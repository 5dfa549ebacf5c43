//! OpenAI speech synthesis.

use std::time::Duration;

use serde::Serialize;

use super::{AudioPlayer, SpeechProvider, TtsError};
use crate::core::TtsConfig;

pub struct OpenAiSpeechProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    voice: String,
    base_url: String,
    player: AudioPlayer,
}

impl OpenAiSpeechProvider {
    /// Create from `OPENAI_API_KEY`.
    pub fn from_env(config: &TtsConfig, player: AudioPlayer) -> Result<Self, TtsError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(TtsError::NotConfigured("OPENAI_API_KEY"))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("titanium/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            model: config.openai_model.clone(),
            voice: config.openai_voice.clone(),
            base_url: "https://api.openai.com/v1".to_string(),
            player,
        })
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
}

impl SpeechProvider for OpenAiSpeechProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn speak(&self, text: &str) -> Result<(), TtsError> {
        let body = SpeechRequest {
            model: &self.model,
            voice: &self.voice,
            input: text,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(TtsError::Api { status, body });
        }

        let audio = response.bytes()?;
        self.player.play(&audio, "mp3")
    }
}
