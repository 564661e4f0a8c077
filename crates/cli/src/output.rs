//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use recommender_lib::{ClusterRecommendationResponse, ComponentStatus, NodePool, VmClass};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for node pool tables
#[derive(Tabled)]
struct NodePoolRow {
    #[tabled(rename = "Instance Type")]
    instance_type: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Nodes")]
    nodes: u32,
    #[tabled(rename = "CPUs/Node")]
    cpus: String,
    #[tabled(rename = "Mem/Node")]
    memory: String,
    #[tabled(rename = "Price/h")]
    price: String,
}

impl From<&NodePool> for NodePoolRow {
    fn from(pool: &NodePool) -> Self {
        Self {
            instance_type: pool.vm_type.instance_type.clone(),
            class: color_vm_class(pool.vm_class),
            nodes: pool.sum_nodes,
            cpus: format!("{}", pool.vm_type.cpus),
            memory: format_memory(pool.vm_type.memory),
            price: format_price(pool.price()),
        }
    }
}

/// Row for the cheapest layouts of a service
#[derive(Tabled)]
struct RegionRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Nodes")]
    nodes: u32,
    #[tabled(rename = "CPUs")]
    cpus: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Total/h")]
    total: String,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a single cluster recommendation
pub fn print_recommendation(
    rec: &ClusterRecommendationResponse,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        return print_json(rec);
    }

    println!(
        "{} {}/{}/{}",
        "Cluster Recommendation".bold(),
        rec.provider.cyan(),
        rec.service.cyan(),
        rec.region.cyan()
    );
    if !rec.zones.is_empty() {
        println!("Zones: {}", rec.zones.join(", "));
    }
    println!();

    if rec.node_pools.is_empty() {
        print_warning("No node pools recommended");
        return Ok(());
    }

    let rows: Vec<NodePoolRow> = rec.node_pools.iter().map(NodePoolRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();

    let acc = &rec.accuracy;
    println!("{}", "Summary".bold());
    println!("{}", "-".repeat(40));
    println!("CPUs:           {}", acc.rec_cpu);
    println!("Memory:         {}", format_memory(acc.rec_mem));
    println!(
        "Nodes:          {} ({} regular, {} spot)",
        acc.rec_nodes, acc.regular_nodes, acc.spot_nodes
    );
    println!("Regular price:  {}", format_price(acc.regular_price));
    println!("Spot price:     {}", format_price(acc.spot_price));
    println!(
        "{}    {}",
        "Total price:".bold(),
        format_price(acc.total_price).green().bold()
    );

    Ok(())
}

/// Print the ranked recommendations of one service
pub fn print_ranked(
    service: &str,
    recs: &[ClusterRecommendationResponse],
    format: OutputFormat,
) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        return print_json(recs);
    }

    println!("{} {}", "Service".bold(), service.cyan());
    if recs.is_empty() {
        print_warning("No recommendations for this service");
        return Ok(());
    }

    let rows: Vec<RegionRow> = recs
        .iter()
        .map(|rec| RegionRow {
            provider: rec.provider.clone(),
            region: rec.region.clone(),
            nodes: rec.accuracy.rec_nodes,
            cpus: format!("{}", rec.accuracy.rec_cpu),
            memory: format_memory(rec.accuracy.rec_mem),
            total: format_price(rec.accuracy.total_price),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Hourly price in dollars
pub fn format_price(price: f64) -> String {
    format!("${:.4}", price)
}

/// Memory in GiB, without trailing zeros
pub fn format_memory(gib: f64) -> String {
    if gib.fract() == 0.0 {
        format!("{}Gi", gib)
    } else {
        format!("{:.2}Gi", gib)
    }
}

pub fn color_vm_class(class: VmClass) -> String {
    match class {
        VmClass::Regular => class.as_str().blue().to_string(),
        VmClass::Spot => class.as_str().yellow().to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: ComponentStatus) -> String {
    match status {
        ComponentStatus::Healthy => "healthy".green().to_string(),
        ComponentStatus::Degraded => "degraded".yellow().to_string(),
        ComponentStatus::Unhealthy => "unhealthy".red().to_string(),
    }
}
