use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use serde_json::json;

use crate::chain::messages::Turn;
use crate::chain::prompt::PromptTemplate;
use crate::chain::provider::{self, Usage};
use crate::commands::{ModelFlags, load_optional_profile, resolve_model_settings};

#[derive(Debug, Args, Clone)]
pub struct AskArgs {
    /// Question to send; read from stdin when omitted.
    prompt: Option<String>,

    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    model: Option<String>,
    /// System prompt prepended to the request.
    #[arg(long)]
    system: Option<String>,
    /// Config profile to take defaults from.
    #[arg(long)]
    profile: Option<String>,

    /// Saved prompt template (JSON) to render instead of a raw prompt.
    #[arg(long)]
    template: Option<PathBuf>,
    /// Template value as key=value; repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,

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
    /// Emit the reply as JSON.
    #[arg(long)]
    json: bool,
    /// Report token usage and latency on stderr.
    #[arg(long)]
    show_usage: bool,
}

pub async fn run(args: AskArgs) -> Result<(), String> {
    let profile = load_optional_profile(args.profile.as_deref())?;
    let settings = resolve_model_settings(
        ModelFlags {
            provider: args.provider.as_deref(),
            model: args.model.as_deref(),
            system: args.system.as_deref(),
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            timeout: args.timeout,
            retries: args.retries,
            retry_delay: args.retry_delay,
        },
        &profile,
    )?;

    let prompt = resolve_prompt(&args)?;

    let mut transcript = Vec::new();
    if let Some(system) = &settings.system {
        transcript.push(Turn::system(system.clone()));
    }
    transcript.push(Turn::user(prompt));

    if args.dry_run {
        let payload = json!({
            "dry_run": true,
            "provider": settings.provider.as_str(),
            "model": settings.model,
            "messages": transcript,
            "options": {
                "temperature": settings.options.temperature,
                "max_tokens": settings.options.max_tokens,
                "timeout": settings.options.timeout_secs,
                "retries": settings.options.retries,
                "retry_delay": settings.options.retry_delay_ms,
            },
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).map_err(|err| err.to_string())?
        );
        if args.show_usage {
            eprintln!("usage: unavailable latency_ms=0 (dry-run)");
        }
        return Ok(());
    }

    let started = Instant::now();
    let response = provider::ask(
        settings.provider,
        &settings.model,
        &transcript,
        settings.options,
    )
    .await
    .map_err(|err| err.to_string())?;
    let latency_ms = started.elapsed().as_millis() as u64;

    if args.json {
        let payload = json!({
            "content": response.content,
            "provider": settings.provider.as_str(),
            "model": settings.model,
            "latency_ms": latency_ms,
            "usage": response.usage.as_ref().map(usage_json),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).map_err(|err| err.to_string())?
        );
    } else {
        println!("{}", response.content);
    }

    if args.show_usage {
        report_usage(response.usage.as_ref(), latency_ms);
    }

    Ok(())
}

fn resolve_prompt(args: &AskArgs) -> Result<String, String> {
    if let Some(path) = &args.template {
        if args.prompt.is_some() {
            return Err("Provide either a prompt or --template, not both.".to_string());
        }
        let template = PromptTemplate::load(path)
            .map_err(|err| format!("Failed to load template '{}': {err}", path.display()))?;
        let values = parse_vars(&args.vars)?;
        let pairs: Vec<(&str, &str)> = values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        return template.render(&pairs).map_err(|err| err.to_string());
    }

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
    Ok(prompt.trim_end_matches('\n').to_string())
}

fn parse_vars(vars: &[String]) -> Result<Vec<(String, String)>, String> {
    vars.iter()
        .map(|raw| {
            raw.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| format!("Invalid --var '{raw}'. Expected KEY=VALUE."))
        })
        .collect()
}

fn usage_json(usage: &Usage) -> serde_json::Value {
    json!({
        "prompt_tokens": usage.prompt_tokens,
        "completion_tokens": usage.completion_tokens,
        "total_tokens": usage.total_tokens,
    })
}

fn report_usage(usage: Option<&Usage>, latency_ms: u64) {
    match usage {
        Some(usage) => eprintln!(
            "usage: prompt={} completion={} total={} latency_ms={latency_ms}",
            format_count(usage.prompt_tokens),
            format_count(usage.completion_tokens),
            format_count(usage.total_tokens),
        ),
        None => eprintln!("usage: unavailable latency_ms={latency_ms}"),
    }
}

fn format_count(count: Option<u32>) -> String {
    count.map_or_else(|| "?".to_string(), |value| value.to_string())
}
