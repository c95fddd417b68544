//! Conversational LLM toolkit: role-tagged transcripts, prompt templates,
//! structured output, and embedding similarity over hosted chat providers.

/// Conversation, prompt, and provider primitives.
pub mod chain;
/// CLI subcommand implementations.
pub mod commands;
/// TOML profile configuration.
pub mod config;
