//! Locating the engine's HTTP endpoint and waiting for it to come up

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use serde::Deserialize;

use crate::engine::EngineClient;

/// Environment variable overriding the coreProps.json location.
pub(crate) const COREPROPS_ENV: &str = "STEELSERIES_COREPROPS";

#[derive(Debug, Deserialize)]
struct CoreProps {
    address: String,
}

/// Resolve the engine's `host:port` address from its coreProps file.
/// Candidate order: explicit flag, environment variable, well-known
/// per-platform install paths.
pub(crate) fn engine_address(explicit: Option<&Path>) -> anyhow::Result<String> {
    let path = locate_core_props(explicit)?;
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let address = parse_address(&raw)
        .with_context(|| format!("Malformed coreProps file at {}", path.display()))?;
    info!("engine address {address} (coreProps: {})", path.display());
    Ok(address)
}

fn parse_address(raw: &str) -> anyhow::Result<String> {
    let props: CoreProps = serde_json::from_str(raw)?;
    if props.address.is_empty() {
        anyhow::bail!("coreProps has an empty address");
    }
    Ok(props.address)
}

fn locate_core_props(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(COREPROPS_ENV) {
        candidates.push(PathBuf::from(path));
    }
    candidates.extend(default_core_props_paths());
    candidates.into_iter().find(|p| p.exists()).ok_or_else(|| {
        anyhow::anyhow!(
            "coreProps.json not found; is the engine running? \
             Set {COREPROPS_ENV} or pass --core-props"
        )
    })
}

/// Install locations for both the old and new engine vintages.
fn default_core_props_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(r"C:\ProgramData\SteelSeries\SteelSeries Engine 3\coreProps.json"),
        PathBuf::from(r"C:\ProgramData\SteelSeries\SteelSeries GG\coreProps.json"),
        PathBuf::from("/Library/Application Support/SteelSeries Engine 3/coreProps.json"),
        PathBuf::from("/Library/Application Support/SteelSeries GG/coreProps.json"),
    ];
    if let Some(data) = dirs::data_dir() {
        paths.push(data.join("SteelSeries Engine 3/coreProps.json"));
        paths.push(data.join("SteelSeries GG/coreProps.json"));
    }
    paths
}

/// Block until the engine answers the metadata probe. The engine starts
/// independently of us, so this retries forever with periodic warnings
/// instead of failing fast.
pub(crate) async fn wait_for_engine(engine: &EngineClient, retry_interval: Duration) {
    while !engine.health_check().await {
        warn!(
            "engine not reachable at {}, retrying in {retry_interval:?}",
            engine.base_url()
        );
        tokio::time::sleep(retry_interval).await;
    }
    info!("connected to engine at {}", engine.base_url());
}
