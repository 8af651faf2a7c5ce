use std::fmt;
use thiserror::Error;

/// Position of a node within the cluster's ordered node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("cluster topology is empty")]
    Empty,
    #[error("node {0} is listed more than once")]
    Duplicate(String),
    #[error("this node ({0}) is not part of the topology")]
    SelfMissing(String),
}

/// The static cluster layout: an ordered list of node base URLs
/// (`http://host:port`) and which of them is this process.
///
/// Built once at startup and never mutated. Every node must be given the same
/// list in the same order, since replica placement depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    nodes: Vec<String>,
    local: NodeIndex,
}

impl ClusterConfig {
    pub fn new(nodes: Vec<String>, local_url: &str) -> Result<Self, TopologyError> {
        if nodes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let nodes: Vec<String> = nodes.into_iter().map(|n| normalize_url(&n)).collect();
        for (i, node) in nodes.iter().enumerate() {
            if nodes[..i].contains(node) {
                return Err(TopologyError::Duplicate(node.clone()));
            }
        }

        let local_url = normalize_url(local_url);
        let local = nodes
            .iter()
            .position(|n| *n == local_url)
            .map(NodeIndex)
            .ok_or(TopologyError::SelfMissing(local_url))?;

        Ok(Self { nodes, local })
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn local(&self) -> NodeIndex {
        self.local
    }

    pub fn is_local(&self, node: NodeIndex) -> bool {
        node == self.local
    }

    pub fn url(&self, node: NodeIndex) -> &str {
        &self.nodes[node.0]
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }
}

/// Trims trailing slashes and adds a scheme when one is missing, so
/// `localhost:8080/` and `http://localhost:8080` name the same node.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
