use syntopical_llm::LlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingCredential(msg) => ChatError::MissingCredential(msg),
            other => ChatError::Llm(other),
        }
    }
}

impl From<syntopical_db::DbError> for ChatError {
    fn from(err: syntopical_db::DbError) -> Self {
        ChatError::Retrieval(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
