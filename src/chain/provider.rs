use std::env;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use reqwest::StatusCode;

use crate::chain::messages::Turn;
use crate::chain::session::LanguageModel;
use crate::chain::{huggingface, openai};

/// Supported chat/embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Openai,
    HuggingFace,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::HuggingFace => "huggingface",
        }
    }

    pub fn chat_endpoint(self) -> &'static str {
        match self {
            Self::Openai => "https://api.openai.com/v1/chat/completions",
            Self::HuggingFace => "https://router.huggingface.co/v1/chat/completions",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Openai => "OPENAI_API_KEY",
            Self::HuggingFace => "HF_TOKEN",
        }
    }

    /// Model used when an embedding command names none.
    pub fn default_embedding_model(self) -> &'static str {
        match self {
            Self::Openai => "text-embedding-3-small",
            Self::HuggingFace => "sentence-transformers/all-MiniLM-L6-v2",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::Openai),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(format!(
                "Invalid provider '{other}'. Supported values: openai, huggingface."
            )),
        }
    }
}

pub fn is_api_key_present(provider: Provider) -> bool {
    env::var(provider.api_key_env())
        .ok()
        .is_some_and(|value| !value.trim().is_empty())
}

pub(crate) fn require_api_key(provider: Provider) -> Result<String, ProviderError> {
    let key_env = provider.api_key_env();
    env::var(key_env)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ProviderError::MissingApiKey { provider, key_env })
}

/// Request knobs forwarded to the provider; retry policy included because
/// the transport runtime owns retries, not the session.
#[derive(Debug, Clone, Copy)]
pub struct AskOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            timeout_secs: None,
            retries: 0,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AskResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Transport-level failures, uniform across providers.
#[derive(Debug)]
pub enum ProviderError {
    MissingApiKey {
        provider: Provider,
        key_env: &'static str,
    },
    Request {
        provider: Provider,
        source: reqwest::Error,
    },
    Api {
        provider: Provider,
        status: StatusCode,
        body: String,
    },
    EmptyResponse {
        provider: Provider,
    },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey { key_env, .. } => {
                write!(f, "{key_env} is not set in the environment")
            }
            Self::Request { provider, source } => {
                write!(f, "{} request failed: {source}", provider.as_str())
            }
            Self::Api {
                provider,
                status,
                body,
            } => write!(f, "{} API error {status}: {body}", provider.as_str()),
            Self::EmptyResponse { provider } => {
                write!(f, "{} reply contained no content", provider.as_str())
            }
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Request { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Sends a transcript to the selected provider and returns the assistant
/// reply with usage accounting when the provider reports it.
pub async fn ask(
    provider: Provider,
    model: &str,
    transcript: &[Turn],
    options: AskOptions,
) -> Result<AskResponse, ProviderError> {
    match provider {
        Provider::Openai => openai::ask_messages(transcript, model, options).await,
        Provider::HuggingFace => huggingface::ask_messages(transcript, model, options).await,
    }
}

/// Concrete [`LanguageModel`] backed by a hosted chat-completions API.
#[derive(Debug, Clone)]
pub struct ChatModel {
    provider: Provider,
    model: String,
    options: AskOptions,
}

impl ChatModel {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            options: AskOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AskOptions) -> Self {
        self.options = options;
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LanguageModel for ChatModel {
    async fn reply(&self, transcript: &[Turn]) -> Result<String, Box<dyn Error + Send + Sync>> {
        let response = ask(self.provider, &self.model, transcript, self.options).await?;
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::{Provider, ProviderError};
    use reqwest::StatusCode;

    #[test]
    fn provider_parses_known_names() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::Openai);
        assert_eq!("HF".parse::<Provider>().unwrap(), Provider::HuggingFace);
        assert_eq!(
            " HuggingFace ".parse::<Provider>().unwrap(),
            Provider::HuggingFace
        );
        assert!("bedrock".parse::<Provider>().is_err());
    }

    #[test]
    fn errors_render_actionable_messages() {
        let missing = ProviderError::MissingApiKey {
            provider: Provider::HuggingFace,
            key_env: "HF_TOKEN",
        };
        assert_eq!(missing.to_string(), "HF_TOKEN is not set in the environment");

        let api = ProviderError::Api {
            provider: Provider::Openai,
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "slow down".to_string(),
        };
        let rendered = api.to_string();
        assert!(rendered.contains("openai"));
        assert!(rendered.contains("429"));
    }
}
