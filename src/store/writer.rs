use rusqlite::{params, Connection};

use super::NewMessage;
use crate::db::Db;
use crate::error::{Result, ReplygraphError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Insert a message row.
///
/// Returns `false` when a row with the same message_id already exists
/// (gateway redelivery); the stored row is left untouched.
pub fn insert_message(conn: &Connection, message: &NewMessage) -> Result<bool> {
    let timestamp = message
        .created_at
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string());

    let inserted = conn.execute(
        r#"
        INSERT INTO messages (
            message_id, user_id, user_name, content, channel_name, server_name, timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, CURRENT_TIMESTAMP))
        ON CONFLICT(message_id) DO NOTHING
        "#,
        params![
            message.message_id,
            message.author_id,
            message.author_name,
            message.content,
            message.channel_name,
            message.server_name,
            timestamp,
        ],
    )?;

    Ok(inserted > 0)
}

/// Insert a reply link and return its interaction_id.
pub fn insert_interaction(conn: &Connection, message_id: i64, reply_to_message_id: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO interactions (message_id, reply_to_message_id) VALUES (?1, ?2)",
        params![message_id, reply_to_message_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Persist a message and, when it is a reply, its reply link.
///
/// Both writes share one transaction that is committed before this returns.
/// A redelivered message is a no-op so its reply is never counted twice.
/// Returns whether the message was newly stored.
pub async fn record_message(db: &Db, message: NewMessage, reply_to: Option<i64>) -> Result<bool> {
    if message.server_name.is_empty() {
        return Err(ReplygraphError::InvalidInput(
            "server_name is required to record a message".to_string(),
        ));
    }

    db.with_connection(move |conn| {
        let tx = conn.transaction()?;

        if !insert_message(&tx, &message)? {
            log::debug!("Message {} already stored, skipping", message.message_id);
            return Ok(false);
        }

        if let Some(target) = reply_to {
            let interaction_id = insert_interaction(&tx, message.message_id, target)?;
            log::debug!(
                "Recorded interaction {}: {} -> {}",
                interaction_id,
                message.message_id,
                target
            );
        }

        tx.commit()?;
        Ok(true)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_db;
    use chrono::TimeZone;

    fn message(id: i64, author: &str, server: &str) -> NewMessage {
        NewMessage {
            message_id: id,
            author_id: 100 + id,
            author_name: author.to_string(),
            content: format!("message {}", id),
            channel_name: Some("general".to_string()),
            server_name: server.to_string(),
            created_at: None,
        }
    }

    async fn count(db: &Db, table: &'static str) -> i64 {
        db.with_connection(move |conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_record_plain_message() {
        let (db, _temp) = migrated_db().await;

        assert!(record_message(&db, message(1, "alice", "S"), None).await.unwrap());
        assert_eq!(count(&db, "messages").await, 1);
        assert_eq!(count(&db, "interactions").await, 0);
    }

    #[tokio::test]
    async fn test_record_reply_writes_interaction() {
        let (db, _temp) = migrated_db().await;

        record_message(&db, message(1, "alice", "S"), None).await.unwrap();
        record_message(&db, message(2, "bob", "S"), Some(1)).await.unwrap();

        let (msg_id, target): (i64, i64) = db
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT message_id, reply_to_message_id FROM interactions",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?)
            })
            .await
            .unwrap();
        assert_eq!((msg_id, target), (2, 1));
    }

    #[tokio::test]
    async fn test_reply_to_unknown_message_is_stored() {
        let (db, _temp) = migrated_db().await;

        record_message(&db, message(5, "bob", "S"), Some(999)).await.unwrap();
        assert_eq!(count(&db, "interactions").await, 1);
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let (db, _temp) = migrated_db().await;

        assert!(record_message(&db, message(1, "alice", "S"), None).await.unwrap());
        assert!(record_message(&db, message(2, "bob", "S"), Some(1)).await.unwrap());
        assert!(!record_message(&db, message(2, "bob", "S"), Some(1)).await.unwrap());

        assert_eq!(count(&db, "messages").await, 2);
        assert_eq!(count(&db, "interactions").await, 1);
    }

    #[tokio::test]
    async fn test_empty_server_name_rejected() {
        let (db, _temp) = migrated_db().await;

        let result = record_message(&db, message(1, "alice", ""), None).await;
        assert!(matches!(result, Err(ReplygraphError::InvalidInput(_))));
        assert_eq!(count(&db, "messages").await, 0);
    }

    #[tokio::test]
    async fn test_explicit_timestamp_is_stored() {
        let (db, _temp) = migrated_db().await;

        let mut msg = message(1, "alice", "S");
        msg.created_at = Some(chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
        record_message(&db, msg, None).await.unwrap();

        let ts: String = db
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT timestamp FROM messages WHERE message_id = 1", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(ts, "2024-03-01 12:30:00");
    }

    #[tokio::test]
    async fn test_interaction_requires_stored_message() {
        let (db, _temp) = migrated_db().await;

        // foreign key on interactions.message_id
        let result = db
            .with_connection(|conn| insert_interaction(conn, 42, 1))
            .await;
        assert!(matches!(result, Err(ReplygraphError::Database(_))));
    }
}
