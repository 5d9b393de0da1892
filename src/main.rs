//! Main entry point for the DeepL Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deepl_translator::cli::commands::{self, Commands};
use deepl_translator::{Translator, TranslatorConfig};

/// DeepL Translator - translate text and documents from the command line
#[derive(Parser, Debug)]
#[command(name = "deepl-translator", version, about, long_about = None)]
struct Args {
    /// Authentication key (optional, defaults to DEEPL_AUTH_KEY env var)
    #[arg(long)]
    auth_key: Option<String>,

    /// JSON config file, overlaid by DEEPL_* environment variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server URL override
    #[arg(long)]
    server_url: Option<String>,

    /// Maximum attempts per request
    #[arg(long)]
    max_retries: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("deepl_translator={}", default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(command) = args.command else {
        println!("Please specify a command. Use --help for more information.");
        return Ok(());
    };

    let mut config = TranslatorConfig::load_layered(args.config.as_deref())?;
    if let Some(auth_key) = args.auth_key {
        config.auth_key = auth_key;
    }
    if args.server_url.is_some() {
        config.server_url = args.server_url;
    }
    if let Some(max_retries) = args.max_retries {
        config.max_retries = max_retries;
    }

    let translator = Translator::new(config)?;
    commands::run(&translator, command).await
}
