//! The syntopical chat session.

use serde::Serialize;
use std::sync::Arc;
use syntopical_llm::{build_backend, BackendConfig, LlmBackend, LlmRequest, Message};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::memory::{ConversationMemory, DEFAULT_MEMORY_WINDOW};
use crate::prompts;
use crate::retriever::{Retriever, SourceDocument, DEFAULT_TOP_K};

/// Generation and retrieval parameters for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub top_k: usize,
    pub memory_window: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            memory_window: DEFAULT_MEMORY_WINDOW,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    /// The passages the answer was grounded on, closest first.
    pub source_documents: Vec<SourceDocument>,
}

pub struct SyntopicalChat {
    llm: Arc<dyn LlmBackend>,
    retriever: Arc<dyn Retriever>,
    memory: ConversationMemory,
    config: ChatConfig,
    session_id: Uuid,
}

impl SyntopicalChat {
    /// Build the configured backend and start a session. Fails with
    /// [`ChatError::MissingCredential`](crate::ChatError::MissingCredential)
    /// before any request is made when the backend needs a key it lacks.
    pub fn connect(
        backend: &BackendConfig,
        retriever: Arc<dyn Retriever>,
        config: ChatConfig,
    ) -> Result<Self> {
        let llm = build_backend(backend)?;
        Ok(Self::new(llm, retriever, config))
    }

    pub fn new(llm: Arc<dyn LlmBackend>, retriever: Arc<dyn Retriever>, config: ChatConfig) -> Self {
        let session_id = Uuid::new_v4();
        info!(%session_id, model = llm.model_id(), top_k = config.top_k, "Chat session started");
        Self {
            llm,
            retriever,
            memory: ConversationMemory::new(config.memory_window),
            config,
            session_id,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Answer `query` from the indexed papers, taking earlier turns into
    /// account.
    #[instrument(skip(self, query), fields(session_id = %self.session_id))]
    pub async fn chat(&mut self, query: &str) -> Result<ChatResponse> {
        let enhanced = prompts::enhance_query(query);
        let question = self.standalone_question(&enhanced).await?;

        let source_documents = self.retriever.retrieve(&question, self.config.top_k).await?;
        let context = source_documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let answer = self
            .complete(vec![
                Message::system(prompts::answer_system_prompt(&context)),
                Message::user(question),
            ])
            .await?;

        self.memory.push(query, answer.clone());
        debug!(sources = source_documents.len(), turns = self.memory.len(), "Answered");

        Ok(ChatResponse {
            answer,
            source_documents,
        })
    }

    /// Structured cross-paper analysis of `topic`. Goes through [`chat`](Self::chat),
    /// so it also becomes part of the conversation.
    pub async fn analyze_topic(&mut self, topic: &str) -> Result<ChatResponse> {
        self.chat(&prompts::analysis_prompt(topic)).await
    }

    pub fn reset_conversation(&mut self) {
        self.memory.clear();
        info!(session_id = %self.session_id, "Conversation reset");
    }

    /// With no history the question stands on its own. Otherwise the model
    /// rewrites it so retrieval sees the full intent.
    async fn standalone_question(&self, question: &str) -> Result<String> {
        if self.memory.is_empty() {
            return Ok(question.to_string());
        }
        let history = prompts::format_history(self.memory.turns());
        let prompt = prompts::condense_question_prompt(&history, question);
        let condensed = self.complete(vec![Message::user(prompt)]).await?;
        let condensed = condensed.trim();
        if condensed.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(condensed.to_string())
        }
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let req = LlmRequest {
            messages,
            model: None,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };
        let resp = self.llm.complete(req).await?;
        debug!(
            prompt_tokens = resp.prompt_tokens,
            completion_tokens = resp.completion_tokens,
            "LLM call"
        );
        Ok(resp.content)
    }
}
