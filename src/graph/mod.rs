//! Interaction graph: per-server aggregation of who replies to whom.
//!
//! Nodes are authors weighted by how many messages they posted in the server;
//! edges are unordered author pairs weighted by how many replies passed
//! between them. Every call recomputes from the event store.

mod aggregate;

pub use aggregate::{aggregate, build_graph};
pub use crate::store::ReplyScope;

use serde::{Deserialize, Serialize};

/// An author in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Author display name; unique within a graph.
    pub name: String,
    /// Messages posted in the server. Zero for authors only seen as reply targets.
    pub weight: u64,
}

/// An undirected edge between two authors, stored with `source <= target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// Replies in either direction between the pair. Never zero.
    pub weight: u64,
}

/// Aggregated graph for one server, nodes sorted by name and edges by pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl InteractionGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Edge between two authors, in either order.
    pub fn edge(&self, a: &str, b: &str) -> Option<&GraphEdge> {
        let (source, target) = canonical_pair(a, b);
        self.edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }
}

/// Order a pair so (A, B) and (B, A) share one key.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
