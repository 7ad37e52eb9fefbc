//! Self-contained vis-network page per server.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::GraphRenderer;
use crate::error::{Result, ReplygraphError};
use crate::graph::InteractionGraph;

const VIS_NETWORK_URL: &str = "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";
const ARTIFACT_SUFFIX: &str = "_interaction_graph.html";

#[derive(Serialize)]
struct VisNode<'a> {
    id: &'a str,
    label: &'a str,
    value: u64,
    title: String,
}

#[derive(Serialize)]
struct VisEdge<'a> {
    from: &'a str,
    to: &'a str,
    value: u64,
    title: String,
}

/// Writes `<output_dir>/<slug>-<hash>_interaction_graph.html`.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    output_dir: PathBuf,
}

impl HtmlRenderer {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn page(&self, server_name: &str, graph: &InteractionGraph) -> Result<String> {
        let nodes: Vec<VisNode> = graph
            .nodes
            .iter()
            .map(|n| VisNode {
                id: &n.name,
                label: &n.name,
                value: n.weight,
                title: format!("Messages: {}", n.weight),
            })
            .collect();
        let edges: Vec<VisEdge> = graph
            .edges
            .iter()
            .map(|e| VisEdge {
                from: &e.source,
                to: &e.target,
                value: e.weight,
                title: format!("Interactions: {}", e.weight),
            })
            .collect();

        let nodes_json = script_safe(
            serde_json::to_string(&nodes).map_err(|e| ReplygraphError::Render(e.to_string()))?,
        );
        let edges_json = script_safe(
            serde_json::to_string(&edges).map_err(|e| ReplygraphError::Render(e.to_string()))?,
        );
        let title = escape_html(server_name);

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title} interaction graph</title>
<script src="{VIS_NETWORK_URL}"></script>
<style>
  html, body {{ margin: 0; height: 100%; font-family: sans-serif; }}
  #graph {{ width: 100%; height: 100%; }}
</style>
</head>
<body>
<div id="graph"></div>
<script>
  var nodes = new vis.DataSet({nodes_json});
  var edges = new vis.DataSet({edges_json});
  var options = {{
    nodes: {{ shape: "dot", scaling: {{ min: 10, max: 40 }} }},
    edges: {{ smooth: false, scaling: {{ min: 1, max: 8 }} }},
    physics: {{ stabilization: {{ iterations: 200 }} }}
  }};
  new vis.Network(document.getElementById("graph"), {{ nodes: nodes, edges: edges }}, options);
</script>
</body>
</html>
"#
        ))
    }
}

impl GraphRenderer for HtmlRenderer {
    fn render(&self, server_name: &str, graph: &InteractionGraph) -> Result<PathBuf> {
        let page = self.page(server_name, graph)?;
        let path = self.artifact_path(server_name);

        fs::create_dir_all(&self.output_dir)?;

        // One temp file per write: concurrent renders of a server never share
        // it, and the rename into place only ever publishes a complete page.
        let mut tmp = NamedTempFile::new_in(&self.output_dir)?;
        tmp.write_all(page.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| ReplygraphError::Io(e.error))?;

        Ok(path)
    }

    fn artifact_path(&self, server_name: &str) -> PathBuf {
        self.output_dir.join(artifact_file_name(server_name))
    }
}

/// File name for a server's page. Server names are free text, so the name is
/// reduced to a safe slug and disambiguated by a hash of the full name.
pub fn artifact_file_name(server_name: &str) -> String {
    let slug: String = server_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(48)
        .collect();
    let digest = format!("{:x}", Sha256::digest(server_name.as_bytes()));

    format!("{}-{}{}", slug, &digest[..12], ARTIFACT_SUFFIX)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// Author names are user-controlled; keep them from closing the script tag.
fn script_safe(json: String) -> String {
    json.replace("</", "<\\/")
}
