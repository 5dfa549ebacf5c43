//! OpenAI chat completions.

use serde::{Deserialize, Serialize};

use super::{CompletionProvider, CompletionRequest, LlmError, ModelTier};

/// OpenAI API provider.
pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    fast_model: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider with an explicit key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("titanium/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            fast_model: "gpt-5-nano".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, LlmError> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Self::new(key.trim()),
            _ => Err(LlmError::NotConfigured),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_fast_model(mut self, model: impl Into<String>) -> Self {
        self.fast_model = model.into();
        self
    }

    /// Use a custom base URL (Azure OpenAI or compatible APIs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => &self.model,
            ModelTier::Fast => &self.fast_model,
        }
    }
}

impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: &request.prompt });

        let body = ChatRequest {
            model: self.model_for(request.tier),
            messages,
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(model = body.model, max_tokens = request.max_tokens, "OpenAI request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let response: ChatResponse = response.json()?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| LlmError::EmptyResponse("openai".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_model_for_tier() {
        let provider = OpenAiProvider::new("sk-test").unwrap().with_model("gpt-4.1");
        assert_eq!(provider.model_for(ModelTier::Standard), "gpt-4.1");
        assert_eq!(provider.model_for(ModelTier::Fast), "gpt-5-nano");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = OpenAiProvider::new("sk-test").unwrap().with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_request_serialization_omits_temperature() {
        let body = ChatRequest {
            model: "gpt-5-nano",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            max_completion_tokens: 20,
            temperature: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_completion_tokens"], 20);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Hello"}}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("Hello"));
    }

    #[test]
    #[serial(llm_env)]
    fn test_from_env_requires_key() {
        let saved = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        assert!(matches!(OpenAiProvider::from_env(), Err(LlmError::NotConfigured)));

        if let Some(key) = saved {
            std::env::set_var("OPENAI_API_KEY", key);
        }
    }
}
