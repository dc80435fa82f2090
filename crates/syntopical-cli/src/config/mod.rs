//! Configuration loading for syntopical.
//! Reads syntopical.toml from the current directory or the path in SYNTOPICAL_CONFIG.
//! A missing file is not an error: every field has a default.

use anyhow::Context;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use syntopical_chat::ChatConfig;
use syntopical_ingestion::EmbeddingConfig;
use syntopical_llm::{BackendConfig, BackendKind};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

fn default_db_path() -> PathBuf { PathBuf::from("data/lancedb") }

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default = "default_llm_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Set from OPENAI_API_KEY only.
    #[serde(skip)]
    pub api_key: Option<SecretString>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            model: default_llm_model(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key: None,
        }
    }
}

fn default_llm_model()   -> String { syntopical_llm::router::DEFAULT_MODEL.to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens()  -> u32 { 1000 }

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            memory_window: default_memory_window(),
        }
    }
}

fn default_top_k()         -> usize { 5 }
fn default_memory_window() -> usize { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,
    #[serde(default = "default_arxiv_dir")]
    pub arxiv_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pdf_dir: default_pdf_dir(),
            arxiv_dir: default_arxiv_dir(),
        }
    }
}

fn default_pdf_dir()   -> PathBuf { PathBuf::from("data/pdfs") }
fn default_arxiv_dir() -> PathBuf { PathBuf::from("data/arxiv_papers") }

impl Config {
    /// File (if present), then environment.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("SYNTOPICAL_CONFIG")
            .unwrap_or_else(|_| "syntopical.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {path}"))?;
            Self::from_toml(&content).with_context(|| format!("invalid config in {path}"))?
        } else {
            tracing::debug!(path = %path, "No config file, using defaults");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            let secret = SecretString::from(key);
            self.llm.api_key = Some(secret.clone());
            self.embedding.api_key = Some(secret);
        }
        if let Some(path) = non_empty("DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(dir) = non_empty("PDF_DIR") {
            self.paths.pdf_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("ARXIV_DIR") {
            self.paths.arxiv_dir = PathBuf::from(dir);
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            kind: self.llm.kind,
            model: self.llm.model.clone(),
            base_url: self.llm.base_url.clone(),
            api_key: self.llm.api_key.clone(),
        }
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            top_k: self.retrieval.top_k,
            memory_window: self.retrieval.memory_window,
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
        }
    }
}
