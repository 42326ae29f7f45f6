mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sculpt::translate::TranslationInput;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file, instead of ./sculpt.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite every eligible file under a directory with a profile
    Run {
        /// Profile to apply, see `sculpt profiles`
        #[arg(short, long)]
        profile: String,

        /// Root of the tree to rewrite
        path: PathBuf,
    },

    /// Translate a piece of text
    Translate {
        #[arg(long)]
        source: String,

        #[arg(long)]
        target: String,

        /// Subject area, used to pick terminology
        #[arg(long, default_value = "general")]
        domain: String,

        /// Model as provider/model, e.g. ollama/gpt-oss:20b
        #[arg(short, long)]
        model: Option<String>,

        text: String,
    },

    /// List built-in and configured profiles
    Profiles,

    /// List the tools available to profiles
    Tools {
        /// Also print each tool's input schema
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Command::Run { profile, path } => commands::run::execute(config, &profile, &path).await,
        Command::Translate {
            source,
            target,
            domain,
            model,
            text,
        } => {
            let input = TranslationInput {
                text,
                source,
                target,
                domain,
            };
            commands::translate::execute(config, input, model.as_deref()).await
        }
        Command::Profiles => commands::profiles::execute(config).await,
        Command::Tools { verbose } => commands::tools::execute(verbose).await,
        Command::Version => commands::version::execute().await,
    }
}
