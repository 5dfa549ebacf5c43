//! LLM completion providers.
//!
//! Plans, BMAD documents and hook announcements are all produced by a
//! single-turn completion call. Providers are tried in order; the first one
//! that answers wins.

mod anthropic;
mod openai;

use std::time::Duration;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

use crate::core::LlmConfig;

/// Which model class a request should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelTier {
    /// Full model for documents and plans.
    #[default]
    Standard,
    /// Small, fast model for short hook phrases.
    Fast,
}

/// A single-turn completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub tier: ModelTier,
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 1024,
            temperature: None,
            tier: ModelTier::Standard,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Route to the fast model.
    pub fn fast(mut self) -> Self {
        self.tier = ModelTier::Fast;
        self
    }
}

/// LLM error types.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("No LLM provider configured (set OPENAI_API_KEY or ANTHROPIC_API_KEY)")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}

/// A blocking single-turn completion backend.
pub trait CompletionProvider {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Run the request and return the response text.
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

impl<P: CompletionProvider + ?Sized> CompletionProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        (**self).complete(request)
    }
}

impl<P: CompletionProvider + ?Sized> CompletionProvider for &P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        (**self).complete(request)
    }
}

/// Provider chain with fallback.
pub struct LlmChain {
    providers: Vec<Box<dyn CompletionProvider>>,
}

impl LlmChain {
    /// Build the chain from config, skipping providers without an API key.
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut providers: Vec<Box<dyn CompletionProvider>> = Vec::new();

        for name in &config.providers {
            match name.as_str() {
                "openai" => match OpenAiProvider::from_env() {
                    Ok(provider) => {
                        let mut provider = provider
                            .with_model(&config.openai_model)
                            .with_fast_model(&config.openai_fast_model);
                        if let Some(url) = &config.openai_base_url {
                            provider = provider.with_base_url(url);
                        }
                        providers.push(Box::new(provider));
                    }
                    Err(e) => tracing::debug!(provider = "openai", error = %e, "Skipping provider"),
                },
                "anthropic" => match AnthropicProvider::from_env() {
                    Ok(provider) => providers.push(Box::new(
                        provider
                            .with_model(&config.anthropic_model)
                            .with_fast_model(&config.anthropic_fast_model),
                    )),
                    Err(e) => {
                        tracing::debug!(provider = "anthropic", error = %e, "Skipping provider");
                    }
                },
                other => tracing::warn!(provider = other, "Unknown LLM provider in config"),
            }
        }

        Self { providers }
    }

    /// Chain over explicit providers.
    pub fn with_providers(providers: Vec<Box<dyn CompletionProvider>>) -> Self {
        Self { providers }
    }

    /// Check if any provider is available.
    pub fn is_available(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Names of the providers, in order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl CompletionProvider for LlmChain {
    fn name(&self) -> &str {
        self.providers.first().map_or("none", |p| p.name())
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.complete(request) {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Provider failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::NotConfigured))
    }
}

/// Remove a surrounding markdown code fence from a model response.
///
/// Handles a leading "```json" (or any other info string) or bare "```"
/// and a trailing "```".
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.split_once('\n') {
            Some((info, after))
                if info.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
            {
                after
            }
            _ => rest.strip_prefix("json").unwrap_or(rest),
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
