//! Hugging Face Inference router, chat-completions surface.
//!
//! The router speaks the OpenAI wire format; models are addressed by hub
//! repo id (e.g. `Qwen/Qwen2.5-72B-Instruct`).

use serde::{Deserialize, Serialize};

use crate::chain::chat_runtime::{BackoffPolicy, CallFailure, post_with_retry};
use crate::chain::messages::Turn;
use crate::chain::provider::{
    AskOptions, AskResponse, Provider, ProviderError, Usage, require_api_key,
};

#[derive(Debug, Serialize)]
struct RouterChatRequest {
    model: String,
    messages: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RouterChatResponse {
    choices: Vec<RouterChoice>,
    usage: Option<RouterUsage>,
}

#[derive(Debug, Deserialize)]
struct RouterChoice {
    message: RouterMessage,
}

#[derive(Debug, Deserialize)]
struct RouterMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouterUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

pub async fn ask_messages(
    transcript: &[Turn],
    model: &str,
    options: AskOptions,
) -> Result<AskResponse, ProviderError> {
    let provider = Provider::HuggingFace;
    let api_key = require_api_key(provider)?;

    let payload = RouterChatRequest {
        model: model.to_string(),
        messages: transcript.to_vec(),
        temperature: options.temperature,
        max_tokens: options.max_tokens,
    };

    let client = reqwest::Client::new();
    let response = post_with_retry(
        &client,
        provider.chat_endpoint(),
        &api_key,
        &payload,
        BackoffPolicy {
            timeout_secs: options.timeout_secs,
            retries: options.retries,
            base_delay_ms: options.retry_delay_ms,
        },
    )
    .await
    .map_err(|failure| match failure {
        CallFailure::Transport(source) => ProviderError::Request { provider, source },
        CallFailure::Api { status, body } => ProviderError::Api {
            provider,
            status,
            body,
        },
    })?;

    let body: RouterChatResponse = response
        .json()
        .await
        .map_err(|source| ProviderError::Request { provider, source })?;
    let content = body
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .filter(|content| !content.is_empty())
        .ok_or(ProviderError::EmptyResponse { provider })?;
    let usage = body.usage.map(|usage| Usage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });

    Ok(AskResponse { content, usage })
}
