use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use lmchain::commands::ask::{self, AskArgs};
use lmchain::commands::chat::{self, ChatArgs};
use lmchain::commands::config::{self, ConfigArgs};
use lmchain::commands::extract::{self, ExtractArgs};
use lmchain::commands::similar::{self, SimilarArgs};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("LM_GIT_SHA"),
    ", built ",
    env!("LM_BUILD_TS"),
    ")"
);

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  lmchain ask --provider huggingface --model Qwen/Qwen2.5-72B-Instruct \"2+2?\"\n  echo \"2+2?\" | lmchain ask --provider openai --model gpt-4o-mini\n  lmchain chat --provider huggingface --model Qwen/Qwen2.5-72B-Instruct --system \"You are a helpful assistant.\"\n  lmchain similar \"What is document similarity search?\" --doc \"Embeddings are numeric text representations.\" --doc \"Chat models are tuned for conversation.\"\n  lmchain config check\n  lmchain completion bash > ~/.local/share/bash-completion/completions/lmchain";

const CHAT_HELP_EXAMPLES: &str = "Examples:\n  lmchain chat --provider huggingface --model Qwen/Qwen2.5-72B-Instruct\n  lmchain chat --profile default --window 20 --show-history\n  lmchain chat --provider openai --model gpt-4o-mini --exit-word quit";

#[derive(Debug, Parser)]
#[command(
    name = "lmchain",
    about = "Chat, prompt-template, and embedding CLI for hosted LLM providers",
    version,
    long_version = LONG_VERSION,
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Ask a one-shot question to an LLM provider")]
    Ask(AskArgs),
    #[command(about = "Hold an interactive conversation", after_help = CHAT_HELP_EXAMPLES)]
    Chat(ChatArgs),
    #[command(about = "Rank documents by embedding similarity to a query")]
    Similar(SimilarArgs),
    #[command(about = "Extract schema-validated JSON from text")]
    Extract(ExtractArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "lmchain", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "lmchain", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "lmchain", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask(args) => ask::run(args).await,
        Commands::Chat(args) => chat::run(args).await,
        Commands::Similar(args) => similar::run(args).await,
        Commands::Extract(args) => extract::run(args).await,
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
