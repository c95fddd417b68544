//! CLI subcommand implementations.

pub mod ask;
pub mod chat;
pub mod config;
pub mod extract;
pub mod similar;

use std::env;
use std::str::FromStr;

use crate::chain::provider::{AskOptions, Provider};
use crate::config::ProfileConfig;

/// Non-empty, trimmed environment value.
pub(crate) fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses an environment value, failing loudly instead of silently
/// ignoring a typo.
pub(crate) fn env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, String> {
    match env_value(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid {key} '{raw}'.")),
    }
}

/// Settings shared by the model-calling commands, resolved with the
/// precedence flag > `LM_*` env > profile > default.
pub(crate) struct ModelSettings {
    pub provider: Provider,
    pub model: String,
    pub system: Option<String>,
    pub options: AskOptions,
}

pub(crate) struct ModelFlags<'a> {
    pub provider: Option<&'a str>,
    pub model: Option<&'a str>,
    pub system: Option<&'a str>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
}

pub(crate) fn load_optional_profile(name: Option<&str>) -> Result<ProfileConfig, String> {
    match name {
        Some(name) => crate::config::load_profile(name),
        None => Ok(ProfileConfig::default()),
    }
}

pub(crate) fn resolve_model_settings(
    flags: ModelFlags<'_>,
    profile: &ProfileConfig,
) -> Result<ModelSettings, String> {
    let provider = resolve_provider(flags.provider, profile.provider.as_deref())?;

    let model = flags
        .model
        .map(str::to_string)
        .or(env_value("LM_MODEL"))
        .or_else(|| profile.model.clone())
        .ok_or_else(|| "No model provided. Use --model or set LM_MODEL.".to_string())?;

    let system = flags
        .system
        .map(str::to_string)
        .or_else(|| profile.system.clone());

    let defaults = AskOptions::default();
    let options = AskOptions {
        temperature: flags
            .temperature
            .or(env_parsed("LM_TEMPERATURE")?)
            .or(profile.temperature),
        max_tokens: flags
            .max_tokens
            .or(env_parsed("LM_MAX_TOKENS")?)
            .or(profile.max_tokens),
        timeout_secs: flags
            .timeout
            .or(env_parsed("LM_TIMEOUT")?)
            .or(profile.timeout),
        retries: flags
            .retries
            .or(env_parsed("LM_RETRIES")?)
            .or(profile.retries)
            .unwrap_or(defaults.retries),
        retry_delay_ms: flags
            .retry_delay
            .or(env_parsed("LM_RETRY_DELAY")?)
            .or(profile.retry_delay)
            .unwrap_or(defaults.retry_delay_ms),
    };

    Ok(ModelSettings {
        provider,
        model,
        system,
        options,
    })
}

pub(crate) fn resolve_provider(
    flag: Option<&str>,
    profile: Option<&str>,
) -> Result<Provider, String> {
    if let Some(raw) = flag {
        return raw.parse().map_err(|_| {
            format!("Invalid --provider '{raw}'. Supported values: openai, huggingface.")
        });
    }
    if let Some(raw) = env_value("LM_PROVIDER") {
        return raw.parse().map_err(|_| {
            format!("Invalid LM_PROVIDER '{raw}'. Supported values: openai, huggingface.")
        });
    }
    if let Some(raw) = profile {
        return raw
            .parse()
            .map_err(|_| format!("Invalid provider '{raw}' in profile."));
    }
    Err("No provider selected. Use --provider or set LM_PROVIDER.".to_string())
}
