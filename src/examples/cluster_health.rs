//! Cluster health check
//!
//! Loads `searchlink.json` (falling back to the local development settings),
//! asks the cluster for its health and lists the indices.
//!
//! Run with: cargo run -p searchlink-rs --example cluster_health

use anyhow::Result;
use searchlink::{
    build_request, format_duration, Client, ClientError, Config, Context, HeaderMap, Method, Response,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Default, Deserialize)]
struct ClusterHealth {
    cluster_name: String,
    status: String,
    number_of_nodes: u32,
    active_shards: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("searchlink=debug,searchlink_core=debug,cluster_health=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()?;

    let config = Config::load("searchlink.json").unwrap_or_else(|_| {
        tracing::warn!("Failed to load searchlink.json, using local development settings");
        Config::local_development()
    });
    tracing::info!("Connecting to {:?}", config.addresses);

    let client = Client::new(&config)?;
    let ctx = Context::with_timeout(Duration::from_secs(10));

    // Health, waiting up to 5s for yellow
    let params = HashMap::from([
        ("wait_for_status".to_string(), "yellow".to_string()),
        ("timeout".to_string(), format_duration(Duration::from_secs(5))),
    ]);
    let request = build_request(Method::GET, "/_cluster/health", None, &params, HeaderMap::new())?;

    let mut health = ClusterHealth::default();
    match client.execute(&ctx, request, Some(&mut health)).await {
        Ok(_) => {
            tracing::info!(
                "Cluster {}: status={}, nodes={}, active_shards={}",
                health.cluster_name,
                health.status,
                health.number_of_nodes,
                health.active_shards
            );
        }
        Err(ClientError::Api { status, error }) => {
            tracing::error!("Cluster rejected the health request ({}): {}", status, error);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    // Index listing as plain text
    let params = HashMap::from([("v".to_string(), "true".to_string())]);
    let request = build_request(Method::GET, "/_cat/indices", None, &params, HeaderMap::new())?;
    let mut response = client.send(&ctx, request).await?;
    if let Some(body) = response.body() {
        let text = body.read_all().await?;
        println!("{}", String::from_utf8_lossy(&text));
    }

    Ok(())
}
