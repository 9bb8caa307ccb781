//! Embedding provider implementations.
//!
//! Concrete [`Embedder`]s for the providers the config accepts:
//! - **[`DisabledEmbedder`]**: fails every call; used when `embedding.provider = "disabled"`.
//! - **[`OpenAIEmbedder`]**: `POST /v1/embeddings`, needs `OPENAI_API_KEY`.
//! - **[`GeminiEmbedder`]**: `models/{model}:embedContent`, needs `GEMINI_API_KEY`.
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed` endpoint.
//!
//! Use [`create_embedder`] to build the one named by the configuration.
//! All remote calls go through [`post_json`](crate::http::post_json) and
//! share its retry and backoff policy.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use docqa_core::embedding::{EmbedError, Embedder};

use crate::config::EmbeddingConfig;
use crate::http::{post_json, HttpSettings};

const OPENAI_URL: &str = "https://api.openai.com";
const GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const OLLAMA_URL: &str = "http://localhost:11434";

/// Build the embedder named by `config.provider`.
///
/// API keys are read from the environment here and nowhere else.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let settings = HttpSettings::new(config.timeout_secs, config.max_retries);
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => {
            let key = api_key("OPENAI_API_KEY")?;
            Ok(Arc::new(OpenAIEmbedder::new(config, key, settings)?))
        }
        "gemini" => {
            let key = api_key("GEMINI_API_KEY")?;
            Ok(Arc::new(GeminiEmbedder::new(config, key, settings)?))
        }
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config, settings)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

pub(crate) fn api_key(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{} environment variable not set", var),
    }
}

fn model_and_dims(config: &EmbeddingConfig, provider: &str) -> Result<(String, usize)> {
    let model = config
        .model
        .clone()
        .ok_or_else(|| anyhow!("embedding.model required for {} provider", provider))?;
    let dims = config
        .dims
        .ok_or_else(|| anyhow!("embedding.dims required for {} provider", provider))?;
    Ok((model, dims))
}

fn provider_err(e: anyhow::Error) -> EmbedError {
    EmbedError::Provider(format!("{:#}", e))
}

/// `None` unless every element is a finite number.
fn parse_f32_array(values: &serde_json::Value) -> Option<Vec<f32>> {
    values
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32).filter(|f| f.is_finite()))
        .collect()
}

// ============ Disabled ============

/// Embedder that refuses every call.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Disabled)
    }
}

// ============ OpenAI ============

pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    settings: HttpSettings,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String, settings: HttpSettings) -> Result<Self> {
        let (model, dims) = model_and_dims(config, "OpenAI")?;
        let url = config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string());
        let client = settings.client()?;
        Ok(Self {
            model,
            dims,
            url,
            api_key,
            settings,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let json = post_json(
            &self.client,
            &self.settings,
            "OpenAI",
            &format!("{}/v1/embeddings", self.url.trim_end_matches('/')),
            &headers,
            &body,
        )
        .await
        .map_err(provider_err)?;
        parse_openai_response(&json).map_err(provider_err)
    }
}

/// Extract `data[0].embedding` from an OpenAI embeddings response.
pub fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    json.get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(parse_f32_array)
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing or non-numeric data[0].embedding"))
}

// ============ Gemini ============

/// Header carrying the Gemini API key, kept out of request URLs.
pub const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiEmbedder {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    settings: HttpSettings,
    client: reqwest::Client,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String, settings: HttpSettings) -> Result<Self> {
        let (model, dims) = model_and_dims(config, "Gemini")?;
        let url = config.url.clone().unwrap_or_else(|| GEMINI_URL.to_string());
        let client = settings.client()?;
        Ok(Self {
            model,
            dims,
            url,
            api_key,
            settings,
            client,
        })
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let body = serde_json::json!({
            "content": { "parts": [{ "text": text }] },
        });
        let endpoint = format!(
            "{}/v1beta/models/{}:embedContent",
            self.url.trim_end_matches('/'),
            self.model
        );
        let headers = [(GEMINI_KEY_HEADER, self.api_key.clone())];
        let json = post_json(&self.client, &self.settings, "Gemini", &endpoint, &headers, &body)
            .await
            .map_err(provider_err)?;
        parse_gemini_response(&json).map_err(provider_err)
    }
}

/// Extract `embedding.values` from a Gemini `embedContent` response.
pub fn parse_gemini_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    json.get("embedding")
        .and_then(|e| e.get("values"))
        .and_then(parse_f32_array)
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing or non-numeric embedding.values"))
}

// ============ Ollama ============

/// Embedder backed by a local Ollama instance (`ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    settings: HttpSettings,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig, settings: HttpSettings) -> Result<Self> {
        let (model, dims) = model_and_dims(config, "Ollama")?;
        let url = config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string());
        let client = settings.client()?;
        Ok(Self {
            model,
            dims,
            url,
            settings,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        let json = post_json(
            &self.client,
            &self.settings,
            "Ollama",
            &format!("{}/api/embed", self.url.trim_end_matches('/')),
            &[],
            &body,
        )
        .await
        .map_err(provider_err)?;
        parse_ollama_response(&json).map_err(provider_err)
    }
}

/// Extract `embeddings[0]` from an Ollama `/api/embed` response.
pub fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .and_then(parse_f32_array)
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings[0]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_openai_response() {
        let v = parse_openai_response(&json!({"data": [{"index": 0, "embedding": [0.5, -1.0]}]}))
            .unwrap();
        assert_eq!(v, vec![0.5, -1.0]);
        assert!(parse_openai_response(&json!({"data": []})).is_err());
    }

    #[test]
    fn test_parse_gemini_response() {
        let v = parse_gemini_response(&json!({"embedding": {"values": [1.0, 2.0, 3.0]}})).unwrap();
        assert_eq!(v.len(), 3);
        assert!(parse_gemini_response(&json!({"candidates": []})).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let v = parse_ollama_response(&json!({"embeddings": [[0.25, 0.75]]})).unwrap();
        assert_eq!(v, vec![0.25, 0.75]);
    }

    #[test]
    fn test_non_numeric_components_are_rejected() {
        assert!(parse_openai_response(&json!({"data": [{"embedding": [0.5, null, "x"]}]})).is_err());
        assert!(parse_gemini_response(&json!({"embedding": {"values": [1.0, "2.0"]}})).is_err());
        assert!(parse_ollama_response(&json!({"embeddings": [[0.25, true]]})).is_err());
        // Overflows f32.
        assert!(parse_ollama_response(&json!({"embeddings": [[1e300]]})).is_err());
    }

    #[tokio::test]
    async fn test_disabled_embedder_fails() {
        let e = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(e.model_name(), "disabled");
        assert!(matches!(e.embed("hi").await, Err(EmbedError::Disabled)));
    }

    #[test]
    fn test_provider_requires_model() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            dims: Some(4),
            ..EmbeddingConfig::default()
        };
        assert!(OllamaEmbedder::new(&config, HttpSettings::new(1, 0)).is_err());
    }
}
