//! Graph rendering: turns an aggregated [`InteractionGraph`] into a static
//! artifact the HTTP facade can serve.

mod html;

pub use html::HtmlRenderer;

use std::path::PathBuf;
use std::sync::Arc;

use crate::db::Db;
use crate::error::{Result, ReplygraphError};
use crate::graph::{aggregate, InteractionGraph, ReplyScope};

/// Sink for aggregated graphs, one artifact per server.
pub trait GraphRenderer: Send + Sync {
    /// Write the artifact for `server_name`, replacing any previous one.
    fn render(&self, server_name: &str, graph: &InteractionGraph) -> Result<PathBuf>;

    /// Where the artifact for `server_name` lives, whether or not it exists yet.
    fn artifact_path(&self, server_name: &str) -> PathBuf;
}

/// Outcome of a graph regeneration
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub path: PathBuf,
    pub nodes: usize,
    pub edges: usize,
}

/// Aggregate a server and hand the result to `renderer`.
///
/// Nothing is written unless aggregation succeeds. Rendering does file I/O,
/// so it runs on the blocking pool like store access does.
pub async fn render_server(
    db: &Db,
    renderer: Arc<dyn GraphRenderer>,
    server_name: &str,
    scope: ReplyScope,
) -> Result<RenderSummary> {
    let graph = aggregate(db, server_name, scope).await?;
    let nodes = graph.nodes.len();
    let edges = graph.edges.len();

    let name = server_name.to_string();
    let path = tokio::task::spawn_blocking(move || renderer.render(&name, &graph))
        .await
        .map_err(|e| ReplygraphError::Io(std::io::Error::other(format!("Render task failed: {}", e))))??;

    log::info!(
        "Rendered graph for {} ({} nodes, {} edges) to {}",
        server_name,
        nodes,
        edges,
        path.display()
    );

    Ok(RenderSummary { path, nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_db;
    use crate::store::{record_message, NewMessage};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_render_server_writes_artifact() {
        let (db, _temp) = migrated_db().await;
        for (id, name, reply_to) in [(1, "alice", None), (2, "bob", Some(1))] {
            let msg = NewMessage {
                message_id: id,
                author_id: id,
                author_name: name.to_string(),
                content: String::new(),
                channel_name: None,
                server_name: "S".to_string(),
                created_at: None,
            };
            record_message(&db, msg, reply_to).await.unwrap();
        }

        let out = TempDir::new().unwrap();
        let renderer = Arc::new(HtmlRenderer::new(out.path()));
        let summary = render_server(&db, renderer.clone(), "S", ReplyScope::Global).await.unwrap();

        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.edges, 1);
        assert_eq!(summary.path, renderer.artifact_path("S"));
        let page = std::fs::read_to_string(&summary.path).unwrap();
        assert!(page.contains("Interactions: 1"));
    }

    #[tokio::test]
    async fn test_render_server_invalid_name_writes_nothing() {
        let (db, _temp) = migrated_db().await;
        let out = TempDir::new().unwrap();
        let renderer = Arc::new(HtmlRenderer::new(out.path().join("graphs")));

        let result = render_server(&db, renderer, "", ReplyScope::Global).await;
        assert!(matches!(result, Err(ReplygraphError::InvalidInput(_))));
        assert!(!out.path().join("graphs").exists());
    }
}
