use anyhow::Context;
use clap::Parser;
use quorum_store::config::{Args, NodeConfig};
use quorum_store::server::Node;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let config = NodeConfig::from_args(&args)?;

    tracing::info!("Starting node on {}", config.bind_addr);
    for (i, node) in config.topology.nodes().iter().enumerate() {
        tracing::info!("  - node {} {}", i, node);
    }

    let node = Node::build(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;

    tracing::info!("Press Ctrl+C to shutdown");

    node.serve(listener, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        tracing::info!("Shutting down");
    })
    .await
}
