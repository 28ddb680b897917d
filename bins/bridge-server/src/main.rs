mod config;
mod error;
mod ingress;
mod serve;

use clap::Parser;

#[derive(Parser)]
#[command(name = "bridge-server", about = "Batches topic messages into object-store objects")]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(long, default_value = "config.toml", env = "BRIDGE_CONFIG")]
    config: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = serve::run(&cli.config).await {
        tracing::error!(error = %e, "bridge-server failed");
        std::process::exit(1);
    }
}
