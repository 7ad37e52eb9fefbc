pub mod config;
pub mod error;
pub mod db;
pub mod store;
pub mod graph;
pub mod render;
pub mod http;
pub mod bot;

pub use config::Config;
pub use error::{ReplygraphError, Result};
pub use graph::{aggregate, GraphEdge, GraphNode, InteractionGraph, ReplyScope};
