//! TOML configuration parsing and validation.
//!
//! A config file has seven sections. Only `[db]` is required; every other
//! section falls back to defaults:
//!
//! ```toml
//! [db]
//! path = "./data/docqa.sqlite"
//!
//! [chunking]
//! max_chars = 1000
//! mode = "words"          # or "fixed"
//!
//! [retrieval]
//! top_k = "adaptive"      # or a positive integer
//!
//! [ingest]
//! concurrency = 4
//! retain_text = true
//!
//! [embedding]
//! provider = "gemini"     # disabled | openai | gemini | ollama
//! model = "text-embedding-004"
//! dims = 768
//!
//! [answer]
//! provider = "gemini"     # disabled | gemini | openai
//! model = "gemini-1.5-flash-latest"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```
//!
//! API keys are read from `OPENAI_API_KEY` / `GEMINI_API_KEY` and never
//! from the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docqa_core::chunk::ChunkMode;
use docqa_core::notebook::NotebookOptions;
use docqa_core::select::TopK;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default)]
    pub mode: ChunkMode,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            mode: ChunkMode::default(),
        }
    }
}

fn default_max_chars() -> usize {
    1000
}

/// `top_k` accepts either `"adaptive"` or an integer.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum TopKSetting {
    Count(i64),
    Name(String),
}

impl Default for TopKSetting {
    fn default() -> Self {
        TopKSetting::Name("adaptive".to_string())
    }
}

impl TopKSetting {
    pub fn parse(&self) -> Result<TopK> {
        let raw = match self {
            TopKSetting::Count(n) => n.to_string(),
            TopKSetting::Name(s) => s.clone(),
        };
        raw.parse::<TopK>()
            .map_err(|e| anyhow::anyhow!("retrieval.top_k: {}", e))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub top_k: TopKSetting,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_retain_text")]
    pub retain_text: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retain_text: default_retain_text(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}
fn default_retain_text() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama, or an OpenAI-compatible gateway).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_answer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_answer_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_answer_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Tuning handed to the notebook service.
    pub fn notebook_options(&self) -> Result<NotebookOptions> {
        Ok(NotebookOptions {
            max_chars: self.chunking.max_chars,
            chunk_mode: self.chunking.mode,
            top_k: self.retrieval.top_k.parse()?,
            concurrency: self.ingest.concurrency,
            retain_text: self.ingest.retain_text,
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        bail!("chunking.max_chars must be > 0");
    }

    config.retrieval.top_k.parse()?;

    if config.ingest.concurrency == 0 {
        bail!("ingest.concurrency must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "gemini" | "ollama" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, gemini, or ollama.",
            other
        ),
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.answer.provider.as_str() {
        "disabled" | "gemini" | "openai" => {}
        other => bail!(
            "Unknown answer provider: '{}'. Must be disabled, gemini, or openai.",
            other
        ),
    }

    if config.answer.provider != "disabled" && config.answer.model.is_none() {
        bail!(
            "answer.model must be specified when provider is '{}'",
            config.answer.provider
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [db]
        path = "./data/docqa.sqlite"
    "#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.chunking.max_chars, 1000);
        assert_eq!(cfg.chunking.mode, ChunkMode::Words);
        assert_eq!(cfg.ingest.concurrency, 4);
        assert!(!cfg.embedding.is_enabled());
        assert_eq!(cfg.server.bind, "127.0.0.1:7341");

        let opts = cfg.notebook_options().unwrap();
        assert_eq!(opts.top_k, TopK::Adaptive);
        assert!(opts.retain_text);
    }

    #[test]
    fn test_top_k_accepts_integer_and_string() {
        let cfg = parse_config(&format!("{}\n[retrieval]\ntop_k = 7\n", MINIMAL)).unwrap();
        assert_eq!(cfg.notebook_options().unwrap().top_k, TopK::Fixed(7));

        let cfg = parse_config(&format!("{}\n[retrieval]\ntop_k = \"3\"\n", MINIMAL)).unwrap();
        assert_eq!(cfg.notebook_options().unwrap().top_k, TopK::Fixed(3));
    }

    #[test]
    fn test_fixed_chunk_mode() {
        let cfg = parse_config(&format!(
            "{}\n[chunking]\nmax_chars = 200\nmode = \"fixed\"\n",
            MINIMAL
        ))
        .unwrap();
        assert_eq!(cfg.chunking.mode, ChunkMode::Fixed);
        assert_eq!(cfg.chunking.max_chars, 200);
    }

    fn rejection(extra: &str) -> String {
        let err = parse_config(&format!("{}\n{}\n", MINIMAL, extra)).unwrap_err();
        format!("{:#}", err)
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let err = rejection("[ingest]\nconcurrency = 0");
        assert!(err.contains("ingest.concurrency must be >= 1"), "{}", err);
    }

    #[test]
    fn test_rejects_bad_top_k() {
        for bad in ["top_k = 0", "top_k = -3", "top_k = \"many\"", "top_k = \"0\""] {
            let err = rejection(&format!("[retrieval]\n{}", bad));
            assert!(err.contains("retrieval.top_k"), "{}: {}", bad, err);
        }
        let cfg = parse_config(&format!("{}\n[retrieval]\ntop_k = \"Adaptive\"\n", MINIMAL)).unwrap();
        assert_eq!(cfg.notebook_options().unwrap().top_k, TopK::Adaptive);
    }

    #[test]
    fn test_rejects_unknown_providers() {
        let err = rejection("[embedding]\nprovider = \"cohere\"");
        assert!(err.contains("Unknown embedding provider: 'cohere'"), "{}", err);

        let err = rejection("[answer]\nprovider = \"claude\"");
        assert!(err.contains("Unknown answer provider: 'claude'"), "{}", err);
    }

    #[test]
    fn test_enabled_embedding_needs_model_and_dims() {
        let err = rejection("[embedding]\nprovider = \"ollama\"\ndims = 768");
        assert!(err.contains("embedding.model must be specified"), "{}", err);

        let err = rejection("[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"");
        assert!(err.contains("embedding.dims must be > 0"), "{}", err);

        let err = rejection("[embedding]\nprovider = \"gemini\"\nmodel = \"m\"\ndims = 0");
        assert!(err.contains("embedding.dims must be > 0"), "{}", err);

        let cfg = parse_config(&format!(
            "{}\n[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\ndims = 768\n",
            MINIMAL
        ))
        .unwrap();
        assert!(cfg.embedding.is_enabled());
    }

    #[test]
    fn test_enabled_answer_needs_model() {
        let err = rejection("[answer]\nprovider = \"gemini\"");
        assert!(err.contains("answer.model must be specified"), "{}", err);
    }
}
