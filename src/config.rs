use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::chain::provider::Provider;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
    pub exit_word: Option<String>,
    pub window: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

pub fn load_profile(name: &str) -> Result<ProfileConfig, String> {
    let path = config_path()?;
    let raw = fs::read_to_string(&path)
        .map_err(|err| format!("Failed to read config file '{}': {err}", path.display()))?;
    let profiles = parse_profiles(&raw)
        .map_err(|err| format!("Failed to parse config file '{}': {err}", path.display()))?
        .ok_or_else(|| {
            format!(
                "Config file '{}' does not contain a [profiles] section.",
                path.display()
            )
        })?;

    profiles.get(name).cloned().ok_or_else(|| {
        format!(
            "Profile '{}' not found in config file '{}'.",
            name,
            path.display()
        )
    })
}

/// Outcome of a config check: where the file was found, how many profiles
/// it declares, and the validated profile when one was requested.
#[derive(Debug)]
pub struct ConfigReport {
    pub path: PathBuf,
    pub profile_count: usize,
    pub profile: Option<(String, ProfileConfig)>,
}

/// Parses the config file and, when a profile is named, validates its
/// session settings (provider, context window, exit word).
pub fn validate_config(profile: Option<&str>) -> Result<ConfigReport, String> {
    let path = config_path()?;
    let raw = fs::read_to_string(&path)
        .map_err(|err| format!("Failed to read config file '{}': {err}", path.display()))?;
    let profiles = parse_profiles(&raw)
        .map_err(|err| format!("Failed to parse config file '{}': {err}", path.display()))?
        .unwrap_or_default();

    let profile = match profile {
        Some(name) => {
            let entry = profiles.get(name).ok_or_else(|| {
                format!(
                    "Profile '{}' not found in config file '{}'.",
                    name,
                    path.display()
                )
            })?;
            validate_profile(name, entry)?;
            Some((name.to_string(), entry.clone()))
        }
        None => None,
    };

    Ok(ConfigReport {
        path,
        profile_count: profiles.len(),
        profile,
    })
}

fn validate_profile(name: &str, profile: &ProfileConfig) -> Result<(), String> {
    if let Some(raw_provider) = &profile.provider {
        raw_provider
            .parse::<Provider>()
            .map_err(|err| format!("Profile '{name}': {err}"))?;
    }
    if profile.window == Some(0) {
        return Err(format!(
            "Profile '{name}': window must be at least 1 turn."
        ));
    }
    if profile
        .exit_word
        .as_deref()
        .is_some_and(|word| word.trim().is_empty())
    {
        return Err(format!("Profile '{name}': exit_word must not be blank."));
    }
    Ok(())
}

fn parse_profiles(raw: &str) -> Result<Option<HashMap<String, ProfileConfig>>, toml::de::Error> {
    let config: ConfigFile = toml::from_str(raw)?;
    Ok(config.profiles)
}

fn config_path() -> Result<PathBuf, String> {
    if let Ok(path) = env::var("LM_CONFIG") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed).join("lmchain").join("config.toml"));
        }
    }

    let home = env::var("HOME").map_err(|_| {
        "Cannot resolve config path: set LM_CONFIG or HOME/XDG_CONFIG_HOME.".to_string()
    })?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("lmchain")
        .join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::{ProfileConfig, parse_profiles, validate_profile};

    #[test]
    fn profiles_section_parses_all_fields() {
        let raw = r#"
            [profiles.default]
            provider = "huggingface"
            model = "Qwen/Qwen2.5-72B-Instruct"
            system = "You are a helpful assistant."
            temperature = 0.7
            max_tokens = 256
            timeout = 30
            retries = 2
            retry_delay = 500
            exit_word = "quit"
            window = 20
        "#;
        let profiles = parse_profiles(raw).unwrap().unwrap();
        let profile = &profiles["default"];
        assert_eq!(profile.provider.as_deref(), Some("huggingface"));
        assert_eq!(profile.model.as_deref(), Some("Qwen/Qwen2.5-72B-Instruct"));
        assert_eq!(profile.window, Some(20));
        assert_eq!(profile.exit_word.as_deref(), Some("quit"));
    }

    #[test]
    fn missing_profiles_section_is_none() {
        assert!(parse_profiles("").unwrap().is_none());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(parse_profiles("profiles = [").is_err());
    }

    #[test]
    fn profile_with_known_provider_validates() {
        let profile = ProfileConfig {
            provider: Some("huggingface".to_string()),
            window: Some(20),
            exit_word: Some("quit".to_string()),
            ..ProfileConfig::default()
        };
        assert!(validate_profile("default", &profile).is_ok());
    }

    #[test]
    fn profile_with_zero_window_is_rejected() {
        let profile = ProfileConfig {
            window: Some(0),
            ..ProfileConfig::default()
        };
        let err = validate_profile("default", &profile).unwrap_err();
        assert_eq!(err, "Profile 'default': window must be at least 1 turn.");
    }

    #[test]
    fn profile_with_blank_exit_word_is_rejected() {
        let profile = ProfileConfig {
            exit_word: Some("  ".to_string()),
            ..ProfileConfig::default()
        };
        let err = validate_profile("default", &profile).unwrap_err();
        assert_eq!(err, "Profile 'default': exit_word must not be blank.");
    }
}
