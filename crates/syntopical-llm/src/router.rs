//! Backend selection from configuration.

use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;

use crate::backend::{
    LlmBackend, LlmError, OllamaBackend, OpenAiBackend, OpenAiCompatibleBackend, OLLAMA_BASE_URL,
    OPENAI_BASE_URL,
};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum BackendKind {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    #[serde(rename = "ollama")]
    Ollama,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::OpenAiCompatible => "openai_compatible",
            BackendKind::Ollama => "ollama",
        }
    }
}

/// Everything needed to reach a chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::OpenAi,
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

impl BackendConfig {
    /// Only the hosted OpenAI API insists on a key.
    pub fn requires_api_key(&self) -> bool {
        self.kind == BackendKind::OpenAi
    }

    /// `Err(MissingCredential)` when the backend needs a key and has none.
    pub fn check_credentials(&self) -> Result<(), LlmError> {
        if self.requires_api_key() && self.api_key.is_none() {
            return Err(LlmError::MissingCredential(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Construct the configured backend.
pub fn build_backend(cfg: &BackendConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    cfg.check_credentials()?;

    let backend: Arc<dyn LlmBackend> = match cfg.kind {
        BackendKind::OpenAi => {
            let key = cfg.api_key.clone().ok_or_else(|| {
                LlmError::MissingCredential("OPENAI_API_KEY is not set".to_string())
            })?;
            let base = cfg.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
            Arc::new(OpenAiBackend::new(key, &cfg.model).with_base_url(base))
        }
        BackendKind::OpenAiCompatible => {
            let base = cfg.base_url.as_deref().ok_or_else(|| {
                LlmError::Unavailable("openai_compatible backend needs a base_url".to_string())
            })?;
            Arc::new(OpenAiCompatibleBackend::new(base, &cfg.model, cfg.api_key.clone()))
        }
        BackendKind::Ollama => {
            let base = cfg.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL);
            Arc::new(OllamaBackend::new(base, &cfg.model))
        }
    };

    tracing::info!(
        kind = cfg.kind.as_str(),
        model = backend.model_id(),
        is_local = backend.is_local(),
        "LLM backend ready"
    );
    Ok(backend)
}
