//! Pressroom CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pressroom::cli::{handle_error, Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Run(args) => pressroom::cli::commands::run::execute(args, config_path, cli.json).await,
        Commands::Check(args) => {
            pressroom::cli::commands::check::execute(args, config_path, cli.json).await
        }
        Commands::Score(args) => {
            pressroom::cli::commands::score::execute(args, config_path, cli.json).await
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => handle_error(&err, cli.json),
    }
}
