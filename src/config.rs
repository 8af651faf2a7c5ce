//! Node Configuration
//!
//! Command-line options and their validated form.

use crate::cluster::replicas::ReplicationSpec;
use crate::cluster::types::{ClusterConfig, normalize_url};
use crate::storage::local::SweepPolicy;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "quorum-store", about = "Quorum-replicated key-value node")]
pub struct Args {
    /// Port to listen on.
    #[arg(long)]
    pub port: u16,

    /// Address to bind the listener to.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Cluster node URL, repeated once per node. Order matters and must be
    /// identical on every node. Defaults to this node alone.
    #[arg(long = "node")]
    pub nodes: Vec<String>,

    /// This node's URL as it appears in `--node`.
    /// Defaults to `http://localhost:<port>`.
    #[arg(long)]
    pub advertise: Option<String>,

    /// Default `ack/from` spec for requests without `replicas`.
    /// Defaults to a majority of the cluster.
    #[arg(long)]
    pub replicas: Option<String>,

    /// Directory of the on-disk store. Keeps data in memory when omitted.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 60_000)]
    pub sweep_interval_ms: u64,

    /// Sweep records by age instead of by TTL. Tombstones are removed too,
    /// so this must exceed the longest replica outage: a replica that missed
    /// a delete would otherwise bring the value back once the tombstones
    /// are gone everywhere else.
    #[arg(long)]
    pub sweep_max_age_ms: Option<u64>,

    #[arg(long, default_value_t = 1_000)]
    pub peer_timeout_ms: u64,

    /// Lifetime of writes that carry no `TTL`. They never expire when omitted.
    #[arg(long)]
    pub default_ttl_ms: Option<u64>,

    /// How long tombstones are kept before sweeps may remove them.
    /// Kept forever when omitted. Must exceed the longest replica outage,
    /// or a replica that missed a delete can resurrect the value.
    #[arg(long)]
    pub tombstone_retention_ms: Option<u64>,

    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,
}

/// Everything a node needs to start, checked for consistency.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: String,
    pub topology: ClusterConfig,
    pub default_replicas: ReplicationSpec,
    pub data_dir: Option<PathBuf>,
    pub sweep_interval: Duration,
    pub sweep_policy: SweepPolicy,
    pub peer_timeout: Duration,
    pub default_ttl_ms: Option<u64>,
    pub tombstone_retention_ms: Option<u64>,
}

impl NodeConfig {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let advertise = args
            .advertise
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", args.port));
        let nodes = if args.nodes.is_empty() {
            vec![advertise.clone()]
        } else {
            args.nodes.clone()
        };

        let topology = ClusterConfig::new(nodes, &normalize_url(&advertise))
            .context("invalid cluster topology")?;

        let default_replicas = match &args.replicas {
            Some(spec) => ReplicationSpec::parse(spec, topology.size())
                .context("invalid default replicas")?,
            None => ReplicationSpec::majority(topology.size()),
        };

        anyhow::ensure!(args.sweep_interval_ms > 0, "sweep interval must be positive");
        anyhow::ensure!(args.peer_timeout_ms > 0, "peer timeout must be positive");

        let sweep_window = [args.tombstone_retention_ms, args.sweep_max_age_ms];
        if let Some(ms) = sweep_window.into_iter().flatten().min() {
            tracing::warn!(
                "Tombstones may be swept after {} ms; replicas down longer than that can resurrect deleted keys",
                ms
            );
        }

        let sweep_policy = match args.sweep_max_age_ms {
            Some(ms) => SweepPolicy::OlderThan(Duration::from_millis(ms)),
            None => SweepPolicy::Expired,
        };

        Ok(Self {
            bind_addr: format!("{}:{}", args.bind, args.port),
            topology,
            default_replicas,
            data_dir: args.data_dir.clone(),
            sweep_interval: Duration::from_millis(args.sweep_interval_ms),
            sweep_policy,
            peer_timeout: Duration::from_millis(args.peer_timeout_ms),
            default_ttl_ms: args.default_ttl_ms,
            tombstone_retention_ms: args.tombstone_retention_ms,
        })
    }
}
