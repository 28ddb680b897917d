use clap::{Args, Parser, Subcommand};

use bridge_store::{StoreBackend, StoreConfig};

#[derive(Parser)]
#[command(name = "bridgectl", about = "Publish to and inspect a running bridge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send messages to the ingress listener
    Publish(PublishArgs),
    /// List flushed objects in a bucket
    Objects(BucketArgs),
    /// Print messages from flushed objects
    Messages(MessagesArgs),
    /// List distinct topics in flushed objects
    Topics(BucketArgs),
}

#[derive(Args, Clone, Debug)]
pub struct PublishArgs {
    /// Ingress address.
    #[arg(long, default_value = "127.0.0.1:7878", env = "BRIDGE_INGRESS")]
    pub addr: String,
    #[arg(long)]
    pub topic: String,
    #[arg(long)]
    pub payload: String,
    /// Send the same message this many times.
    #[arg(long, default_value_t = 1)]
    pub count: u32,
}

#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    #[arg(long, default_value = "us-east-1", env = "AWS_REGION")]
    pub region: String,
    /// S3-compatible endpoint, e.g. http://localhost:9000.
    #[arg(long, env = "BRIDGE_S3_ENDPOINT")]
    pub endpoint: Option<String>,
    #[arg(long)]
    pub allow_http: bool,
}

impl StoreArgs {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: StoreBackend::S3,
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            allow_http: self.allow_http,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct BucketArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    pub bucket: String,
    /// First flush second (unix), inclusive.
    #[arg(long, default_value_t = 0)]
    pub from: i64,
    /// Last flush second (unix), inclusive.
    #[arg(long, default_value_t = i64::MAX)]
    pub to: i64,
}

#[derive(Args, Clone, Debug)]
pub struct MessagesArgs {
    #[command(flatten)]
    pub bucket: BucketArgs,
    /// Open a single object instead of a time window.
    #[arg(long)]
    pub key: Option<String>,
    #[arg(long)]
    pub topic: Option<String>,
    /// Only messages received at or after this unix second.
    #[arg(long)]
    pub since: Option<i64>,
    /// Only messages received at or before this unix second.
    #[arg(long)]
    pub until: Option<i64>,
}
