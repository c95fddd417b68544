use std::io::{self, BufRead, Write};

use clap::Args;
use owo_colors::OwoColorize;

use crate::chain::provider::{ChatModel, is_api_key_present};
use crate::chain::session::{ContextWindow, ConversationSession, SessionError};
use crate::commands::{ModelFlags, load_optional_profile, resolve_model_settings};

#[derive(Debug, Args, Clone)]
pub struct ChatArgs {
    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    model: Option<String>,
    /// System prompt for the whole session.
    #[arg(long)]
    system: Option<String>,
    /// Config profile to take defaults from.
    #[arg(long)]
    profile: Option<String>,

    /// Word that ends the session (default "exit").
    #[arg(long)]
    exit_word: Option<String>,
    /// Limit the context sent to the model to the last N turns.
    #[arg(long, value_name = "TURNS")]
    window: Option<usize>,

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

    /// Print the full transcript when the session ends.
    #[arg(long)]
    show_history: bool,
}

pub async fn run(args: ChatArgs) -> Result<(), String> {
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

    if !is_api_key_present(settings.provider) {
        eprintln!(
            "warning: {} is not set; replies will fail until it is exported",
            settings.provider.api_key_env()
        );
    }

    let model =
        ChatModel::new(settings.provider, settings.model.clone()).with_options(settings.options);
    let mut session = match &settings.system {
        Some(system) => ConversationSession::with_system_prompt(model, system.clone()),
        None => ConversationSession::new(model),
    };
    let exit_word = args
        .exit_word
        .or(profile.exit_word)
        .unwrap_or_else(|| "exit".to_string());
    session = session.exit_word(exit_word.clone());
    if let Some(window) = args.window.or(profile.window) {
        session = session.context_window(ContextWindow::LastTurns(window));
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{} ", "you:".cyan().bold());
        io::stdout().flush().map_err(|err| err.to_string())?;

        let Some(line) = lines.next() else {
            break; // EOF
        };
        let line = line.map_err(|err| format!("Failed to read input: {err}"))?;

        if session.is_exit_signal(&line) {
            break;
        }

        match session.submit_user_turn(&line) {
            Ok(()) => {}
            Err(SessionError::EmptyInput) => {
                eprintln!("(empty input, type '{exit_word}' to quit)");
                continue;
            }
            Err(other) => return Err(other.to_string()),
        }

        match session.request_reply().await {
            Ok(content) => println!("{} {content}", "ai:".magenta().bold()),
            // Transcript is unchanged; the next attempt resends it.
            Err(err) => eprintln!("{err}"),
        }
    }

    if args.show_history {
        for turn in session.history() {
            println!("{}: {}", turn.role.as_str(), turn.content);
        }
    }

    Ok(())
}
