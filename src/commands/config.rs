use clap::{Args, Subcommand};

use crate::config::{self, ProfileConfig};

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand, Clone)]
enum ConfigSubcommand {
    /// Parse the config file and validate a profile's session settings.
    Check {
        #[arg(long)]
        profile: Option<String>,
    },
}

pub fn run(args: ConfigArgs) -> Result<(), String> {
    match args.command {
        ConfigSubcommand::Check { profile } => {
            let report = config::validate_config(profile.as_deref())?;
            let noun = if report.profile_count == 1 {
                "profile"
            } else {
                "profiles"
            };
            println!(
                "config OK: {} ({} {noun})",
                report.path.display(),
                report.profile_count
            );
            if let Some((name, profile)) = &report.profile {
                println!("profile '{name}': {}", describe_profile(profile));
            }
            Ok(())
        }
    }
}

/// One-line summary of the settings a profile pins down; unset fields
/// fall back to flags/env at run time and are omitted here.
fn describe_profile(profile: &ProfileConfig) -> String {
    let mut parts = Vec::new();
    if let Some(provider) = &profile.provider {
        parts.push(format!("provider={provider}"));
    }
    if let Some(model) = &profile.model {
        parts.push(format!("model={model}"));
    }
    if let Some(window) = profile.window {
        parts.push(format!("window={window}"));
    }
    if let Some(exit_word) = &profile.exit_word {
        parts.push(format!("exit_word={exit_word}"));
    }
    if parts.is_empty() {
        "(all defaults)".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::describe_profile;
    use crate::config::ProfileConfig;

    #[test]
    fn profile_summary_lists_session_settings() {
        let profile = ProfileConfig {
            provider: Some("huggingface".to_string()),
            model: Some("Qwen/Qwen2.5-72B-Instruct".to_string()),
            window: Some(20),
            exit_word: Some("quit".to_string()),
            ..ProfileConfig::default()
        };
        assert_eq!(
            describe_profile(&profile),
            "provider=huggingface model=Qwen/Qwen2.5-72B-Instruct window=20 exit_word=quit"
        );
    }

    #[test]
    fn empty_profile_summary_says_defaults() {
        assert_eq!(describe_profile(&ProfileConfig::default()), "(all defaults)");
    }
}
