//! Event store access: message/reply writes from the listener and the
//! server-scoped reads the aggregator and API issue.

mod reader;
mod writer;

pub use reader::{
    fetch_server_activity, list_servers, query_message_authors, query_reply_links, server_stats,
};
pub use writer::{insert_interaction, insert_message, record_message};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as handed to the store by the ingestion listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub message_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub channel_name: Option<String>,
    pub server_name: String,
    /// Falls back to the column default (CURRENT_TIMESTAMP) when absent.
    pub created_at: Option<DateTime<Utc>>,
}

/// One in-scope message projected to what aggregation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAuthor {
    pub author_name: String,
    pub message_id: i64,
}

/// One in-scope reply interaction.
///
/// `partner_name` is the author of the replied-to message, or `None` when the
/// target is not in the store (or not in scope under [`ReplyScope::Server`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLink {
    pub author_name: String,
    pub partner_name: Option<String>,
}

/// A consistent read of one server's activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerActivity {
    pub authors: Vec<MessageAuthor>,
    pub links: Vec<ReplyLink>,
}

/// Where a reply's target message is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReplyScope {
    /// Against every stored message, whatever its server.
    #[default]
    Global,
    /// Only against messages from the server being aggregated.
    Server,
}

/// Per-server activity counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStats {
    pub server_name: String,
    pub messages: i64,
    pub authors: i64,
    pub interactions: i64,
    pub first_message_at: Option<String>,
    pub last_message_at: Option<String>,
}
