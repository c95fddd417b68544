use std::process;

use clap::Parser;
use lmchain::commands::chat::{self, ChatArgs};

#[derive(Debug, Parser)]
#[command(
    name = "lmchat",
    about = "Hold an interactive conversation with an LLM provider",
    disable_version_flag = true
)]
struct Cli {
    #[command(flatten)]
    chat: ChatArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = chat::run(cli.chat).await {
        eprintln!("{err}");
        process::exit(1);
    }
}
