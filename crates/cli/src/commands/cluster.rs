//! Cluster recommendation CLI commands

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use recommender_lib::{
    CatalogTarget, ClusterRecommendationRequest, ClusterRecommendationResponse,
    ClusterScaleOutRequest, MultiClusterResponse, NetworkPerfCategory,
};
use std::path::{Path, PathBuf};

use crate::client::{cluster_path, ApiClient, MULTICLOUD_PATH};
use crate::input::{load_layout, load_multi_cluster_request};
use crate::output::{print_info, print_json, print_ranked, print_recommendation, OutputFormat};

/// Provider, service and region of a recommendation
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Cloud provider (e.g. amazon, google, azure)
    pub provider: String,
    /// Service within the provider (e.g. compute, eks)
    pub service: String,
    /// Region to plan the cluster in
    pub region: String,
}

impl TargetArgs {
    pub fn target(&self) -> CatalogTarget {
        CatalogTarget::new(&self.provider, &self.service, &self.region)
    }
}

/// Resource and placement options of a new cluster
#[derive(Args, Debug, Clone)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Total number of CPUs requested
    #[arg(long)]
    pub cpu: f64,

    /// Total memory requested in GiB
    #[arg(long)]
    pub mem: f64,

    /// Total number of GPUs requested
    #[arg(long, default_value_t = 0)]
    pub gpu: u32,

    #[arg(long, default_value_t = 1)]
    pub min_nodes: u32,

    #[arg(long, default_value_t = 1)]
    pub max_nodes: u32,

    /// Percentage of regular (on-demand) resources
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub on_demand_pct: u8,

    /// Availability zone to place the nodes in
    #[arg(long)]
    pub zone: Option<String>,

    /// Only consider these instance types (repeatable)
    #[arg(long = "include")]
    pub includes: Vec<String>,

    /// Never consider these instance types (repeatable)
    #[arg(long = "exclude")]
    pub excludes: Vec<String>,

    /// Instance categories to consider (repeatable)
    #[arg(long)]
    pub category: Vec<String>,

    /// Network performance categories: low, medium, high, extra (repeatable)
    #[arg(long, value_parser = parse_network_perf)]
    pub network_perf: Vec<NetworkPerfCategory>,

    /// Only consider these instance series (repeatable)
    #[arg(long)]
    pub include_series: Vec<String>,

    /// Never consider these instance series (repeatable)
    #[arg(long)]
    pub exclude_series: Vec<String>,

    /// Allow burstable instance types, the provider decides when unset
    #[arg(long, value_name = "BOOL")]
    pub allow_burst: Option<bool>,

    /// Allow previous generation instance types, the provider decides when unset
    #[arg(long, value_name = "BOOL")]
    pub allow_older_gen: Option<bool>,
}

impl RecommendArgs {
    pub fn request(&self) -> ClusterRecommendationRequest {
        ClusterRecommendationRequest {
            sum_cpu: self.cpu,
            sum_mem: self.mem,
            sum_gpu: self.gpu,
            min_nodes: self.min_nodes,
            max_nodes: self.max_nodes,
            on_demand_pct: self.on_demand_pct,
            allow_burst: self.allow_burst,
            allow_older_gen: self.allow_older_gen,
            network_perf: self.network_perf.clone(),
            category: self.category.clone(),
            zone: self.zone.clone(),
            includes: self.includes.clone(),
            excludes: self.excludes.clone(),
            include_series: self.include_series.clone(),
            exclude_series: self.exclude_series.clone(),
        }
    }
}

/// Options for scaling out an existing cluster
#[derive(Args, Debug, Clone)]
pub struct ScaleOutArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// JSON file with the current node pools
    #[arg(long)]
    pub layout: PathBuf,

    /// Desired total number of CPUs after the scale out
    #[arg(long)]
    pub cpu: f64,

    /// Desired total memory in GiB after the scale out
    #[arg(long)]
    pub mem: f64,

    #[arg(long, default_value_t = 0)]
    pub gpu: u32,

    /// Desired percentage of regular (on-demand) resources
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub on_demand_pct: u8,

    #[arg(long)]
    pub zone: Option<String>,

    /// Never add nodes of these instance types (repeatable)
    #[arg(long = "exclude")]
    pub excludes: Vec<String>,
}

fn parse_network_perf(value: &str) -> Result<NetworkPerfCategory, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| format!("unknown network performance category '{value}'"))
}

/// Recommend a new cluster layout
pub async fn recommend(client: &ApiClient, args: &RecommendArgs, format: OutputFormat) -> Result<()> {
    let target = args.target.target();
    let rec: ClusterRecommendationResponse =
        client.post(&cluster_path(&target), &args.request()).await?;

    print_recommendation(&rec, format)
}

/// Recommend how to extend an existing layout
pub async fn scale_out(client: &ApiClient, args: &ScaleOutArgs, format: OutputFormat) -> Result<()> {
    let target = args.target.target();
    let req = ClusterScaleOutRequest {
        desired_cpu: args.cpu,
        desired_mem: args.mem,
        desired_gpu: args.gpu,
        on_demand_pct: args.on_demand_pct,
        zone: args.zone.clone(),
        excludes: args.excludes.clone(),
        actual_layout: load_layout(&args.layout)?,
    };

    let rec: ClusterRecommendationResponse = client.put(&cluster_path(&target), &req).await?;
    print_recommendation(&rec, format)
}

/// Rank cluster layouts across providers and regions
pub async fn multicloud(client: &ApiClient, request: &Path, format: OutputFormat) -> Result<()> {
    let req = load_multi_cluster_request(request)?;
    let recs: MultiClusterResponse = client.post(MULTICLOUD_PATH, &req).await?;

    if let OutputFormat::Json = format {
        return print_json(&recs);
    }

    if recs.is_empty() {
        print_info("No region could serve the request");
        return Ok(());
    }

    let mut services: Vec<_> = recs.keys().collect();
    services.sort();
    for service in services {
        print_ranked(service, &recs[service], format)?;
        println!();
    }
    println!(
        "Total: {} recommendations",
        recs.values().map(Vec::len).sum::<usize>().to_string().bold()
    );

    Ok(())
}
