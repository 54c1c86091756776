//! LLM-assisted locator healing: an HTTP chat-completion client and the
//! two-stage healing cascade that invokes it.

pub mod healer;
pub mod llm_client;

pub use healer::{heal, TEXT_HEAL_PREFIX_CHARS};
pub use llm_client::{ChatClient, ChatMessage, LlmChatClient, LlmConfig};
