//! Answer provider implementations.
//!
//! - **[`GeminiAnswerer`]**: `models/{model}:generateContent`, needs `GEMINI_API_KEY`.
//! - **[`OpenAIAnswerer`]**: `POST /v1/chat/completions`, needs `OPENAI_API_KEY`.
//! - **[`DisabledAnswerer`]**: fails every call, so `ask` still returns
//!   retrieval-backed fallbacks without a generation backend.
//!
//! Both remote providers send the prompt built by
//! [`build_prompt`](docqa_core::answer::build_prompt).

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use docqa_core::answer::{build_prompt, AnswerSynthesizer, SynthesisError};

use crate::config::AnswerConfig;
use crate::embedding::{api_key, GEMINI_KEY_HEADER};
use crate::http::{post_json, HttpSettings};

const GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_URL: &str = "https://api.openai.com";

/// Build the synthesizer named by `config.provider`.
pub fn create_synthesizer(config: &AnswerConfig) -> Result<Arc<dyn AnswerSynthesizer>> {
    let settings = HttpSettings::new(config.timeout_secs, config.max_retries);
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledAnswerer)),
        "gemini" => {
            let key = api_key("GEMINI_API_KEY")?;
            Ok(Arc::new(GeminiAnswerer::new(config, key, settings)?))
        }
        "openai" => {
            let key = api_key("OPENAI_API_KEY")?;
            Ok(Arc::new(OpenAIAnswerer::new(config, key, settings)?))
        }
        other => bail!("Unknown answer provider: {}", other),
    }
}

fn required_model(config: &AnswerConfig, provider: &str) -> Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow!("answer.model required for {} provider", provider))
}

fn provider_err(e: anyhow::Error) -> SynthesisError {
    SynthesisError::Provider(format!("{:#}", e))
}

fn non_empty(text: Option<&str>) -> Result<String, SynthesisError> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(SynthesisError::EmptyResponse),
    }
}

pub struct DisabledAnswerer;

#[async_trait]
impl AnswerSynthesizer for DisabledAnswerer {
    fn name(&self) -> &str {
        "disabled"
    }
    async fn answer(&self, _question: &str, _context: &str) -> Result<String, SynthesisError> {
        Err(SynthesisError::Disabled)
    }
}

pub struct GeminiAnswerer {
    model: String,
    url: String,
    api_key: String,
    settings: HttpSettings,
    client: reqwest::Client,
}

impl GeminiAnswerer {
    pub fn new(config: &AnswerConfig, api_key: String, settings: HttpSettings) -> Result<Self> {
        let model = required_model(config, "Gemini")?;
        let url = config.url.clone().unwrap_or_else(|| GEMINI_URL.to_string());
        let client = settings.client()?;
        Ok(Self {
            model,
            url,
            api_key,
            settings,
            client,
        })
    }
}

#[async_trait]
impl AnswerSynthesizer for GeminiAnswerer {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn answer(&self, question: &str, context: &str) -> Result<String, SynthesisError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": build_prompt(question, context) }] }],
        });
        let endpoint = format!(
            "{}/v1/models/{}:generateContent",
            self.url.trim_end_matches('/'),
            self.model
        );
        let headers = [(GEMINI_KEY_HEADER, self.api_key.clone())];
        let json = post_json(&self.client, &self.settings, "Gemini", &endpoint, &headers, &body)
            .await
            .map_err(provider_err)?;
        non_empty(gemini_text(&json))
    }
}

/// `candidates[0].content.parts[0].text` of a `generateContent` response.
pub fn gemini_text(json: &serde_json::Value) -> Option<&str> {
    json.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}

pub struct OpenAIAnswerer {
    model: String,
    url: String,
    api_key: String,
    settings: HttpSettings,
    client: reqwest::Client,
}

impl OpenAIAnswerer {
    pub fn new(config: &AnswerConfig, api_key: String, settings: HttpSettings) -> Result<Self> {
        let model = required_model(config, "OpenAI")?;
        let url = config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string());
        let client = settings.client()?;
        Ok(Self {
            model,
            url,
            api_key,
            settings,
            client,
        })
    }
}

#[async_trait]
impl AnswerSynthesizer for OpenAIAnswerer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn answer(&self, question: &str, context: &str) -> Result<String, SynthesisError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(question, context) }],
        });
        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let json = post_json(
            &self.client,
            &self.settings,
            "OpenAI",
            &format!("{}/v1/chat/completions", self.url.trim_end_matches('/')),
            &headers,
            &body,
        )
        .await
        .map_err(provider_err)?;
        non_empty(openai_text(&json))
    }
}

/// `choices[0].message.content` of a chat completion response.
pub fn openai_text(json: &serde_json::Value) -> Option<&str> {
    json.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}
