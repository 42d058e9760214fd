//! Gradient Agent binary
//!
//! Configuration comes from the environment; see `AgentConfig`.

use anyhow::Context;
use gradient_agent::{AgentConfig, AgentNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gradient_agent=info,gradient=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env().context("loading configuration")?;
    tracing::info!("Starting Gradient agent {}", config.node_id);

    let node = AgentNode::new(config)
        .await
        .context("starting node")?;
    node.run().await?;

    Ok(())
}
