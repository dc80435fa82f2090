//! syntopical-chat: retrieval-augmented conversation over the paper store.
//!
//! A question is wrapped in the syntopical preamble, condensed against the
//! conversation so far, used to fetch the nearest chunks, and answered by the
//! language model with those chunks as context.

pub mod chat;
pub mod error;
pub mod memory;
pub mod prompts;
pub mod retriever;

pub use chat::{ChatConfig, ChatResponse, SyntopicalChat};
pub use error::ChatError;
pub use memory::{ConversationMemory, Turn};
pub use retriever::{Retriever, SourceDocument, VectorRetriever};
