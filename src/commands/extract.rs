use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::chain::messages::Turn;
use crate::chain::provider;
use crate::chain::schema::OutputSchema;
use crate::commands::{ModelFlags, load_optional_profile, resolve_model_settings};

#[derive(Debug, Args, Clone)]
pub struct ExtractArgs {
    /// Text to extract from; read from stdin when omitted.
    prompt: Option<String>,

    /// Output schema file (JSON).
    #[arg(long)]
    schema: PathBuf,

    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    model: Option<String>,
    /// Config profile to take defaults from.
    #[arg(long)]
    profile: Option<String>,

    #[arg(long)]
    temperature: Option<f32>,
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(long)]
    retries: Option<u32>,
    /// Base retry delay in milliseconds.
    #[arg(long)]
    retry_delay: Option<u64>,

    /// Print the request that would be sent, without calling the provider.
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(args: ExtractArgs) -> Result<(), String> {
    let schema = OutputSchema::load(&args.schema)
        .map_err(|err| format!("Failed to load schema '{}': {err}", args.schema.display()))?;

    let profile = load_optional_profile(args.profile.as_deref())?;
    let settings = resolve_model_settings(
        ModelFlags {
            provider: args.provider.as_deref(),
            model: args.model.as_deref(),
            system: None,
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            timeout: args.timeout,
            retries: args.retries,
            retry_delay: args.retry_delay,
        },
        &profile,
    )?;

    let prompt = match &args.prompt {
        Some(prompt) => prompt.clone(),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| format!("Failed to read prompt from stdin: {err}"))?;
            buffer
        }
    };
    if prompt.trim().is_empty() {
        return Err("No prompt provided.".to_string());
    }

    let transcript = vec![Turn::system(schema.instruction()), Turn::user(prompt)];

    if args.dry_run {
        let payload = json!({
            "dry_run": true,
            "provider": settings.provider.as_str(),
            "model": settings.model,
            "schema": schema,
            "messages": transcript,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).map_err(|err| err.to_string())?
        );
        return Ok(());
    }

    let response = provider::ask(
        settings.provider,
        &settings.model,
        &transcript,
        settings.options,
    )
    .await
    .map_err(|err| err.to_string())?;

    let object = schema
        .parse_reply(&response.content)
        .map_err(|err| err.to_string())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&object).map_err(|err| err.to_string())?
    );

    Ok(())
}
