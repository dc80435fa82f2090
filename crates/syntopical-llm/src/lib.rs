//! syntopical-llm: chat-completion backends.
//!
//! [`backend`] defines the [`LlmBackend`] trait and the OpenAI, OpenAI-compatible
//! and Ollama implementations. [`router`] turns configuration into a backend,
//! refusing early when a remote backend has no credential.

pub mod backend;
pub mod router;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use router::{build_backend, BackendConfig, BackendKind};
