//! Two-pass aggregation: message counts become node weights, resolved reply
//! links become canonical pair counters.

use std::collections::BTreeMap;

use super::{canonical_pair, GraphEdge, GraphNode, InteractionGraph, ReplyScope};
use crate::db::Db;
use crate::error::{Result, ReplygraphError};
use crate::store::{fetch_server_activity, MessageAuthor, ReplyLink};

/// Build the interaction graph of one server from the event store.
///
/// An unknown server yields an empty graph. Replies whose target cannot be
/// resolved are skipped. Only an empty `server_name` is an error.
pub async fn aggregate(db: &Db, server_name: &str, scope: ReplyScope) -> Result<InteractionGraph> {
    if server_name.is_empty() {
        return Err(ReplygraphError::InvalidInput(
            "server_name is required".to_string(),
        ));
    }

    let activity = fetch_server_activity(db, server_name, scope).await?;
    let graph = build_graph(&activity.authors, &activity.links);

    log::debug!(
        "Aggregated {}: {} messages, {} reply links -> {} nodes, {} edges",
        server_name,
        activity.authors.len(),
        activity.links.len(),
        graph.nodes.len(),
        graph.edges.len()
    );

    Ok(graph)
}

/// Aggregate already-fetched rows into a graph.
pub fn build_graph(authors: &[MessageAuthor], links: &[ReplyLink]) -> InteractionGraph {
    let mut weights: BTreeMap<&str, u64> = BTreeMap::new();
    for row in authors {
        *weights.entry(row.author_name.as_str()).or_insert(0) += 1;
    }

    let mut pairs: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    let mut dangling = 0usize;

    for link in links {
        let Some(partner) = link.partner_name.as_deref() else {
            dangling += 1;
            continue;
        };

        // Reply targets without in-scope messages still get a node.
        weights.entry(partner).or_insert(0);
        weights.entry(link.author_name.as_str()).or_insert(0);

        *pairs
            .entry(canonical_pair(link.author_name.as_str(), partner))
            .or_insert(0) += 1;
    }

    if dangling > 0 {
        log::debug!("Skipped {} reply links with unresolved targets", dangling);
    }

    InteractionGraph {
        nodes: weights
            .into_iter()
            .map(|(name, weight)| GraphNode {
                name: name.to_string(),
                weight,
            })
            .collect(),
        edges: pairs
            .into_iter()
            .map(|((source, target), weight)| GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
                weight,
            })
            .collect(),
    }
}
