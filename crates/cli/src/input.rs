//! Request files read by the CLI

use anyhow::{Context, Result};
use recommender_lib::{MultiClusterRequest, NodePoolDescription};
use serde::de::DeserializeOwned;
use std::path::Path;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load an existing cluster layout, a JSON array of node pool descriptions
pub fn load_layout(path: &Path) -> Result<Vec<NodePoolDescription>> {
    let layout: Vec<NodePoolDescription> = read_json(path)?;
    if layout.is_empty() {
        anyhow::bail!("Layout file {} describes no node pools", path.display());
    }
    Ok(layout)
}

pub fn load_multi_cluster_request(path: &Path) -> Result<MultiClusterRequest> {
    read_json(path)
}
