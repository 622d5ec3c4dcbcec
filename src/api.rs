use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

use crate::config::{AiConfig, GenerationSettings};
use crate::error::{MoodError, MoodResult};
use crate::tokens::{clamp_count, Usage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIChoice {
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    pub usage: Option<Usage>,
}

/// Body returned by custom `/api/chat` backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomResponse {
    pub response: String,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Text produced by one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str, settings: &GenerationSettings) -> MoodResult<Completion>;

    fn name(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AIProvider {
    Gemini,
    OpenAI,
    Ollama,
    Custom,
}

impl AIProvider {
    pub fn parse(provider: &str) -> Self {
        match provider.trim().to_lowercase().as_str() {
            "gemini" | "google" | "google-ai-studio" => AIProvider::Gemini,
            "openai" => AIProvider::OpenAI,
            "ollama" => AIProvider::Ollama,
            _ => AIProvider::Custom,
        }
    }
}

impl fmt::Display for AIProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AIProvider::Gemini => write!(f, "gemini"),
            AIProvider::OpenAI => write!(f, "openai"),
            AIProvider::Ollama => write!(f, "ollama"),
            AIProvider::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    pub provider: AIProvider,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ApiClient {
    pub fn new(config: &AiConfig) -> MoodResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("mood-quote/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            provider: AIProvider::parse(&config.provider),
            endpoint: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn send_prompt(&self, prompt: &str, settings: &GenerationSettings) -> MoodResult<Completion> {
        tracing::debug!(provider = %self.provider, model = %self.model, "sending prompt");
        let completion = match self.provider {
            AIProvider::Gemini => self.send_gemini_request(prompt, settings).await?,
            AIProvider::OpenAI => self.send_openai_request(prompt, settings, "chat/completions").await?,
            AIProvider::Ollama => self.send_ollama_request(prompt, settings).await?,
            AIProvider::Custom => self.send_custom_request(prompt, settings).await?,
        };

        if completion.text.trim().is_empty() {
            return Err(MoodError::EmptyCompletion);
        }
        Ok(completion)
    }

    async fn send_gemini_request(&self, prompt: &str, settings: &GenerationSettings) -> MoodResult<Completion> {
        let mut generation_config = json!({
            "temperature": settings.temperature,
            "maxOutputTokens": settings.max_tokens,
        });
        if let Some(top_k) = settings.top_k {
            generation_config["topK"] = json!(top_k);
        }
        if let Some(top_p) = settings.top_p {
            generation_config["topP"] = json!(top_p);
        }

        let request = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        let mut request_builder = self
            .client
            .post(format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model))
            .json(&request);

        if !self.api_key.is_empty() {
            request_builder = request_builder.header("x-goog-api-key", &self.api_key);
        }

        let gemini_response = Self::read_json(request_builder.send().await?).await?;

        let text = gemini_response["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = gemini_response.get("usageMetadata").map(|meta| {
            let mut usage = Usage::from_counts(
                meta["promptTokenCount"].as_u64().unwrap_or(0),
                meta["candidatesTokenCount"].as_u64().unwrap_or(0),
            );
            if let Some(total) = meta["totalTokenCount"].as_u64() {
                usage.total_tokens = clamp_count(total);
            }
            usage
        });

        Ok(Completion { text, usage })
    }

    async fn send_openai_request(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
        path: &str,
    ) -> MoodResult<Completion> {
        let request = self.openai_body(prompt, settings);

        let mut request_builder = self
            .client
            .post(format!("{}/{}", self.endpoint, path))
            .json(&request);

        // Add authorization header if API key is provided
        if !self.api_key.is_empty() {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = Self::check_status(request_builder.send().await?).await?;
        let openai_response: OpenAIResponse = response.json().await?;

        match openai_response.choices.into_iter().next() {
            Some(choice) => Ok(Completion {
                text: choice.message.content,
                usage: openai_response.usage,
            }),
            None => Err(MoodError::EmptyCompletion),
        }
    }

    async fn send_ollama_request(&self, prompt: &str, settings: &GenerationSettings) -> MoodResult<Completion> {
        let mut options = json!({
            "temperature": settings.temperature,
            "num_predict": settings.max_tokens,
        });
        if let Some(top_k) = settings.top_k {
            options["top_k"] = json!(top_k);
        }
        if let Some(top_p) = settings.top_p {
            options["top_p"] = json!(top_p);
        }

        let request = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
            "options": options,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .await?;
        let ollama_response = Self::read_json(response).await?;

        let text = ollama_response["response"].as_str().unwrap_or_default().to_string();
        let usage = match (
            ollama_response["prompt_eval_count"].as_u64(),
            ollama_response["eval_count"].as_u64(),
        ) {
            (None, None) => None,
            (prompt_tokens, completion_tokens) => Some(Usage::from_counts(
                prompt_tokens.unwrap_or(0),
                completion_tokens.unwrap_or(0),
            )),
        };

        Ok(Completion { text, usage })
    }

    async fn send_custom_request(&self, prompt: &str, settings: &GenerationSettings) -> MoodResult<Completion> {
        // For custom providers, use a generic format similar to OpenAI
        let request = self.openai_body(prompt, settings);

        let mut request_builder = self
            .client
            .post(format!("{}/api/chat", self.endpoint))
            .json(&request);

        if !self.api_key.is_empty() {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = Self::check_status(request_builder.send().await?).await?;
        let custom: CustomResponse = response.json().await?;
        Ok(Completion {
            text: custom.response,
            usage: custom.usage,
        })
    }

    fn openai_body(&self, prompt: &str, settings: &GenerationSettings) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: Some(settings.max_tokens),
            stream: Some(false),
        }
    }

    async fn check_status(response: reqwest::Response) -> MoodResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        tracing::warn!(status = status.as_u16(), "model API request failed");
        Err(MoodError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn read_json(response: reqwest::Response) -> MoodResult<Value> {
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl GenerativeModel for ApiClient {
    async fn generate(&self, prompt: &str, settings: &GenerationSettings) -> MoodResult<Completion> {
        self.send_prompt(prompt, settings).await
    }

    fn name(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(AIProvider::parse("Gemini"), AIProvider::Gemini);
        assert_eq!(AIProvider::parse("google"), AIProvider::Gemini);
        assert_eq!(AIProvider::parse("openai"), AIProvider::OpenAI);
        assert_eq!(AIProvider::parse(" ollama "), AIProvider::Ollama);
        assert_eq!(AIProvider::parse("my-proxy"), AIProvider::Custom);
    }

    #[test]
    fn test_openai_body_carries_sampling() {
        let config = AiConfig {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            ..AiConfig::default()
        };
        let client = ApiClient::new(&config).unwrap();
        let settings = GenerationSettings {
            temperature: 0.7,
            top_p: Some(0.9),
            ..GenerationSettings::default()
        };

        let body = serde_json::to_value(client.openai_body("hello", &settings)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 512);
        assert!(body["top_p"].is_number());
        assert_eq!(client.name(), "openai:gpt-4o-mini");
    }
}
