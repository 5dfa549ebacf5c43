//! ElevenLabs text-to-speech.

use std::time::Duration;

use serde::Serialize;

use super::{AudioPlayer, SpeechProvider, TtsError};
use crate::core::TtsConfig;

const API_BASE: &str = "https://api.elevenlabs.io/v1";
const OUTPUT_FORMAT: &str = "mp3_44100_128";

pub struct ElevenLabsProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    voice_id: String,
    model_id: String,
    player: AudioPlayer,
}

impl ElevenLabsProvider {
    /// Create from `ELEVENLABS_API_KEY`.
    pub fn from_env(config: &TtsConfig, player: AudioPlayer) -> Result<Self, TtsError> {
        let api_key = std::env::var("ELEVENLABS_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(TtsError::NotConfigured("ELEVENLABS_API_KEY"))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("titanium/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            voice_id: config.elevenlabs_voice_id.clone(),
            model_id: config.elevenlabs_model.clone(),
            player,
        })
    }

    fn url(&self) -> String {
        format!("{API_BASE}/text-to-speech/{}?output_format={OUTPUT_FORMAT}", self.voice_id)
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

impl SpeechProvider for ElevenLabsProvider {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    fn speak(&self, text: &str) -> Result<(), TtsError> {
        let response = self
            .client
            .post(self.url())
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&SpeechRequest { text, model_id: &self.model_id })
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
