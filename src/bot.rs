//! Discord ingestion listener.
//!
//! Persists every non-bot guild message and, for replies, the link to the
//! replied-to message. Graphs are never regenerated from here; that is the
//! HTTP facade's job.

use serenity::all::{Context, EventHandler, GatewayIntents, GuildId, Message, Ready};
use serenity::async_trait;
use serenity::Client;

use crate::db::Db;
use crate::error::{Result, ReplygraphError};
use crate::store::{record_message, NewMessage};

/// The parts of a gateway message ingestion looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub message_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
    pub guild_id: Option<u64>,
    pub reply_to: Option<u64>,
    pub unix_timestamp: i64,
}

impl IncomingMessage {
    pub fn from_gateway(msg: &Message) -> Self {
        let reply_to = msg
            .referenced_message
            .as_ref()
            .map(|target| target.id)
            .or_else(|| msg.message_reference.as_ref().and_then(|r| r.message_id))
            .map(|id| id.get());

        Self {
            message_id: msg.id.get(),
            author_id: msg.author.id.get(),
            author_name: msg.author.name.clone(),
            author_is_bot: msg.author.bot,
            content: msg.content.clone(),
            guild_id: msg.guild_id.map(|id| id.get()),
            reply_to,
            unix_timestamp: msg.timestamp.unix_timestamp(),
        }
    }

    /// Bot authors (including this listener) and direct messages are not recorded.
    pub fn should_ingest(&self) -> bool {
        !self.author_is_bot && self.guild_id.is_some()
    }

    /// Build the store row once channel and server names are resolved.
    pub fn into_new_message(self, channel_name: Option<String>, server_name: String) -> Result<NewMessage> {
        Ok(NewMessage {
            message_id: snowflake(self.message_id)?,
            author_id: snowflake(self.author_id)?,
            author_name: self.author_name,
            content: self.content,
            channel_name,
            server_name,
            created_at: chrono::DateTime::from_timestamp(self.unix_timestamp, 0),
        })
    }

    pub fn reply_target(&self) -> Result<Option<i64>> {
        self.reply_to.map(snowflake).transpose()
    }
}

/// Discord ids are u64 snowflakes; SQLite integers are signed.
fn snowflake(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| ReplygraphError::InvalidInput(format!("snowflake {} out of range", id)))
}

/// Gateway event handler writing to the event store
pub struct IngestHandler {
    db: Db,
}

impl IngestHandler {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn ingest(&self, ctx: &Context, msg: &Message) -> Result<()> {
        let incoming = IncomingMessage::from_gateway(msg);
        if !incoming.should_ingest() {
            return Ok(());
        }
        let Some(guild_id) = msg.guild_id else {
            return Ok(());
        };

        let server_name = guild_name(ctx, guild_id).await?;
        let channel_name = match msg.channel_id.name(ctx).await {
            Ok(name) => Some(name),
            Err(e) => {
                log::warn!("Could not resolve channel {}: {}", msg.channel_id, e);
                None
            }
        };

        let reply_to = incoming.reply_target()?;
        let message_id = incoming.message_id;
        let new_message = incoming.into_new_message(channel_name, server_name)?;

        let stored = record_message(&self.db, new_message, reply_to).await?;
        log::debug!(
            "Message {} stored={} reply_to={:?}",
            message_id,
            stored,
            reply_to
        );
        Ok(())
    }
}

async fn guild_name(ctx: &Context, guild_id: GuildId) -> Result<String> {
    if let Some(name) = guild_id.name(&ctx.cache) {
        return Ok(name);
    }

    guild_id
        .to_partial_guild(ctx)
        .await
        .map(|guild| guild.name)
        .map_err(|e| ReplygraphError::Discord(format!("Failed to resolve guild {}: {}", guild_id, e)))
}

#[async_trait]
impl EventHandler for IngestHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        log::info!("Logged in as {} ({} guilds)", ready.user.name, ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = self.ingest(&ctx, &msg).await {
            log::error!("Failed to ingest message {}: {}", msg.id, e);
        }
    }
}

/// Connect to the Discord gateway and ingest messages until the client stops.
pub async fn run_bot(db: Db, token: &str) -> Result<()> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(token, intents)
        .event_handler(IngestHandler::new(db))
        .await
        .map_err(|e| ReplygraphError::Discord(format!("Failed to build client: {}", e)))?;

    log::info!("Starting Discord listener");
    client
        .start()
        .await
        .map_err(|e| ReplygraphError::Discord(format!("Gateway error: {}", e)))
}
