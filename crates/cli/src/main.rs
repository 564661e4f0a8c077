//! Cluster Recommender CLI
//!
//! A command-line tool for requesting cluster layouts, scale-outs and
//! multi-cloud rankings from the cluster recommender service.

mod client;
mod commands;
mod input;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{cluster, service};
use std::path::PathBuf;

/// Cluster Recommender CLI
#[derive(Parser)]
#[command(name = "crc")]
#[command(author, version, about = "CLI for the Cluster Recommender", long_about = None)]
pub struct Cli {
    /// API endpoint URL, including any base path (can also be set via CRC_API_URL env var)
    #[arg(long, env = "CRC_API_URL", default_value = "http://localhost:9090")]
    pub api_url: String,

    /// Bearer token for the recommender routes
    #[arg(long, env = "CRC_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend the cheapest node pools for a new cluster
    Recommend(cluster::RecommendArgs),

    /// Recommend node pools to add to an existing cluster
    ScaleOut(cluster::ScaleOutArgs),

    /// Rank cluster layouts across providers and regions
    Multicloud {
        /// JSON file with the multi-cluster request
        #[arg(long)]
        request: PathBuf,
    },

    /// Show recommender health
    Status,

    /// Show client and server versions
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url, cli.token.clone())?;

    match &cli.command {
        Commands::Recommend(args) => {
            cluster::recommend(&client, args, cli.format).await?;
        }
        Commands::ScaleOut(args) => {
            cluster::scale_out(&client, args, cli.format).await?;
        }
        Commands::Multicloud { request } => {
            cluster::multicloud(&client, request, cli.format).await?;
        }
        Commands::Status => {
            service::show_status(&client, cli.format).await?;
        }
        Commands::Version => {
            service::show_version(&client, cli.format).await?;
        }
    }

    Ok(())
}
