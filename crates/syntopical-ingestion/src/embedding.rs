//! Embedding client: turns chunk text and queries into vectors.
//!
//! Supports three backends:
//!   - OpenAI         (text-embedding-3-small and friends)
//!   - OpenAI-compat  (any /v1/embeddings endpoint)
//!   - Ollama         (all-minilm by default, one request per text)
//!
//! Every vector leaving [`EmbeddingClient`] is L2-normalized, so the store's
//! L2 distance ranks the same way cosine similarity would.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use syntopical_common::sandbox::SandboxClient as Client;
use tracing::{debug, instrument};

/// Anything that can embed text into fixed-width vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; returns one `dim()`-wide vector per input.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Width of the produced vectors.
    fn dim(&self) -> usize;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow!("embedding backend returned no vector"))
    }
}

// ── Backend config ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Filled from the environment, never from the config file.
    #[serde(skip)]
    pub api_key: Option<SecretString>,
    pub model: String,
    pub dim: usize,
    pub batch_size: usize,
    /// Overrides the backend's default endpoint.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EmbeddingBackend {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    #[serde(rename = "ollama")]
    Ollama,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            api_key: None,
            // all-MiniLM-L6-v2 as packaged by Ollama
            model: "all-minilm".to_string(),
            dim: syntopical_db::DEFAULT_EMBEDDING_DIM,
            batch_size: 32,
            base_url: None,
        }
    }
}

impl EmbeddingConfig {
    fn endpoint_base(&self) -> Result<&str> {
        let base = match (self.backend, self.base_url.as_deref()) {
            (_, Some(url)) => url,
            (EmbeddingBackend::OpenAi, None) => "https://api.openai.com",
            (EmbeddingBackend::Ollama, None) => "http://localhost:11434",
            (EmbeddingBackend::OpenAiCompatible, None) => {
                bail!("openai_compatible embedding backend needs a base_url")
            }
        };
        Ok(base.trim_end_matches('/'))
    }
}

// ── Embedding client ──────────────────────────────────────────────────────────

pub struct EmbeddingClient {
    cfg: EmbeddingConfig,
    client: Client,
}

impl EmbeddingClient {
    pub fn new(cfg: EmbeddingConfig) -> Result<Self> {
        let mut client = Client::new()?;
        if let Some(url) = cfg.base_url.as_deref() {
            client.allow_url(url);
        }
        Ok(Self { cfg, client })
    }

    // ── OpenAI / OpenAI-compatible ──────────────────────────────────────────

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.cfg.endpoint_base()?);
        let body = serde_json::json!({
            "model": &self.cfg.model,
            "input": texts,
        });
        let mut req = self.client.post(&url)?.json(&body);
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key.expose_secret());
        } else if self.cfg.backend == EmbeddingBackend::OpenAi {
            bail!("OPENAI_API_KEY is required for the openai embedding backend");
        }
        let resp: serde_json::Value = req
            .send()
            .await
            .with_context(|| format!("embedding endpoint unreachable at {url}"))?
            .error_for_status()?
            .json()
            .await?;
        parse_openai_embeddings(&resp)
    }

    // ── Ollama ─────────────────────────────────────────────────────────────

    async fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embeddings", self.cfg.endpoint_base()?);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let body = serde_json::json!({"model": &self.cfg.model, "prompt": text});
            let resp = self
                .client
                .post(&url)?
                .json(&body)
                .send()
                .await
                .with_context(|| {
                    format!("Ollama unreachable at {url}. Start it with: ollama serve")
                })?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                bail!(
                    "Ollama has no model '{0}'. Pull it with: ollama pull {0}",
                    self.cfg.model
                );
            }
            let resp: serde_json::Value = resp.error_for_status()?.json().await?;
            out.push(json_vector(&resp["embedding"]));
        }
        Ok(out)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    #[instrument(skip(self, texts), fields(n = texts.len(), backend = ?self.cfg.backend))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let mut vecs = match self.cfg.backend {
            EmbeddingBackend::OpenAi | EmbeddingBackend::OpenAiCompatible => {
                self.embed_openai(texts).await?
            }
            EmbeddingBackend::Ollama => self.embed_ollama(texts).await?,
        };

        if vecs.len() != texts.len() {
            bail!(
                "embedding backend returned {} vectors for {} inputs",
                vecs.len(),
                texts.len()
            );
        }
        for v in &mut vecs {
            if v.len() != self.cfg.dim {
                bail!(
                    "embedding model '{}' returned {} dimensions, expected {}",
                    self.cfg.model,
                    v.len(),
                    self.cfg.dim
                );
            }
            normalize(v);
        }
        debug!("Embedded batch");
        Ok(vecs)
    }

    fn dim(&self) -> usize {
        self.cfg.dim
    }
}

fn parse_openai_embeddings(resp: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = resp["data"]
        .as_array()
        .ok_or_else(|| anyhow!("embedding response has no 'data' array"))?;
    Ok(data.iter().map(|item| json_vector(&item["embedding"])).collect())
}

fn json_vector(value: &serde_json::Value) -> Vec<f32> {
    value
        .as_array()
        .map(|arr| arr.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
        .unwrap_or_default()
}

/// Scale `v` to unit length in place.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    for x in v.iter_mut() {
        *x /= norm;
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    let s: f32 = v.iter().map(|x| x * x).sum();
    s.sqrt().max(1e-10)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
