//! Service status CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ServerVersion};
use crate::output::{color_status, print_json, print_success, print_warning, OutputFormat};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

/// Show service health
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.status().await?;

    if let OutputFormat::Json = format {
        return print_json(&health);
    }

    println!("{}", "Recommender Status".bold());
    println!("{}", "=".repeat(50));
    println!("Status:  {}", color_status(health.status));
    println!("Version: {}", health.version);
    println!();

    let mut components: Vec<_> = health.components.iter().collect();
    components.sort_by(|a, b| a.0.cmp(b.0));

    let rows: Vec<ComponentRow> = components
        .into_iter()
        .map(|(name, component)| ComponentRow {
            name: name.clone(),
            status: color_status(component.status),
            message: component.message.clone().unwrap_or_else(|| "-".to_string()),
            last_check: chrono::DateTime::from_timestamp(component.last_check_timestamp, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    if !rows.is_empty() {
        let table = tabled::Table::new(rows)
            .with(tabled::settings::Style::rounded())
            .to_string();
        println!("{}", table);
    }

    if health.status.is_operational() {
        print_success("Recommender is operational");
    } else {
        print_warning("Recommender is not operational");
    }

    Ok(())
}

/// Show client and server versions
pub async fn show_version(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let server: ServerVersion = client.get("version").await?;

    if let OutputFormat::Json = format {
        return print_json(&serde_json::json!({
            "client": env!("CARGO_PKG_VERSION"),
            "server": server,
        }));
    }

    println!("Client: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "Server: {} {} ({})",
        server.name,
        server.version.cyan(),
        server.commit
    );
    Ok(())
}
