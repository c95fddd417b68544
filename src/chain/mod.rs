//! Conversation and prompt-assembly primitives for LLM chat providers.
//!
//! The module contains the role-tagged transcript types, the conversation
//! session, prompt templates, structured-output schemas, and the typed
//! clients used by the CLI commands.

pub(crate) mod chat_runtime;
/// Embedding clients and vector similarity helpers.
pub mod embeddings;
/// Hugging Face router chat-completions functions.
pub mod huggingface;
/// Role-tagged message types.
pub mod messages;
/// OpenAI chat-completions functions.
pub mod openai;
/// Reusable parameterized text patterns.
pub mod prompt;
/// Provider-agnostic chat interfaces and dispatch.
pub mod provider;
/// Structured-output schemas and reply validation.
pub mod schema;
/// Transcript accumulation and model mediation.
pub mod session;
