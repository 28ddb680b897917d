mod cli;
mod cmd;
mod error;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Publish(args) => cmd::publish::run(args).await,
        Commands::Objects(args) => cmd::read::objects(args).await,
        Commands::Messages(args) => cmd::read::messages(args).await,
        Commands::Topics(args) => cmd::read::topics(args).await,
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
