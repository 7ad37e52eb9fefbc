use rusqlite::{params, Connection};

use super::{MessageAuthor, ReplyLink, ReplyScope, ServerActivity, ServerStats};
use crate::db::Db;
use crate::error::{Result, ReplygraphError};

/// Distinct server names present in the store, sorted.
pub async fn list_servers(db: &Db) -> Result<Vec<String>> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT server_name FROM messages \
             WHERE server_name IS NOT NULL ORDER BY server_name",
        )?;
        let servers = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .map_err(ReplygraphError::Database)?;
        Ok(servers)
    })
    .await
}

/// All messages of one server as (author_name, message_id).
pub fn query_message_authors(conn: &Connection, server_name: &str) -> Result<Vec<MessageAuthor>> {
    let mut stmt = conn.prepare(
        "SELECT user_name, message_id FROM messages \
         WHERE server_name = ?1 ORDER BY message_id",
    )?;
    let rows = stmt.query_map(params![server_name], |row| {
        Ok(MessageAuthor {
            author_name: row.get(0)?,
            message_id: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(ReplygraphError::Database)?);
    }
    Ok(out)
}

/// Reply interactions whose replying message belongs to `server_name`,
/// with the replied-to author resolved according to `scope`.
pub fn query_reply_links(conn: &Connection, server_name: &str, scope: ReplyScope) -> Result<Vec<ReplyLink>> {
    let query = match scope {
        ReplyScope::Global => {
            "SELECT m.user_name, t.user_name \
             FROM interactions i \
             JOIN messages m ON m.message_id = i.message_id \
             LEFT JOIN messages t ON t.message_id = i.reply_to_message_id \
             WHERE m.server_name = ?1 \
             ORDER BY i.interaction_id"
        }
        ReplyScope::Server => {
            "SELECT m.user_name, t.user_name \
             FROM interactions i \
             JOIN messages m ON m.message_id = i.message_id \
             LEFT JOIN messages t ON t.message_id = i.reply_to_message_id AND t.server_name = ?1 \
             WHERE m.server_name = ?1 \
             ORDER BY i.interaction_id"
        }
    };

    let mut stmt = conn.prepare(query)?;
    let rows = stmt.query_map(params![server_name], |row| {
        Ok(ReplyLink {
            author_name: row.get(0)?,
            partner_name: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(ReplygraphError::Database)?);
    }
    Ok(out)
}

/// Read a server's messages and reply links inside one read transaction so
/// both come from the same snapshot.
pub async fn fetch_server_activity(db: &Db, server_name: &str, scope: ReplyScope) -> Result<ServerActivity> {
    let server_name = server_name.to_string();
    db.with_connection(move |conn| {
        let tx = conn.transaction()?;
        let authors = query_message_authors(&tx, &server_name)?;
        let links = query_reply_links(&tx, &server_name, scope)?;
        tx.commit()?;
        Ok(ServerActivity { authors, links })
    })
    .await
}

/// Message, author and interaction counts per server.
pub async fn server_stats(db: &Db) -> Result<Vec<ServerStats>> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT
                m.server_name,
                COUNT(*) AS messages,
                COUNT(DISTINCT m.user_name) AS authors,
                (SELECT COUNT(*) FROM interactions i
                    JOIN messages r ON r.message_id = i.message_id
                    WHERE r.server_name = m.server_name) AS interactions,
                MIN(m.timestamp) AS first_message_at,
                MAX(m.timestamp) AS last_message_at
            FROM messages m
            WHERE m.server_name IS NOT NULL
            GROUP BY m.server_name
            ORDER BY messages DESC, m.server_name
            "#,
        )?;

        let mut rows = stmt.query([])?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(ServerStats {
                server_name: row.get(0)?,
                messages: row.get(1)?,
                authors: row.get(2)?,
                interactions: row.get(3)?,
                first_message_at: row.get(4)?,
                last_message_at: row.get(5)?,
            });
        }
        Ok(results)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::migrated_db;
    use crate::store::{record_message, NewMessage};

    async fn seed(db: &Db, id: i64, author: &str, server: &str, reply_to: Option<i64>) {
        let msg = NewMessage {
            message_id: id,
            author_id: id * 10,
            author_name: author.to_string(),
            content: String::new(),
            channel_name: None,
            server_name: server.to_string(),
            created_at: None,
        };
        record_message(db, msg, reply_to).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_servers_distinct_sorted() {
        let (db, _temp) = migrated_db().await;
        seed(&db, 1, "alice", "zeta", None).await;
        seed(&db, 2, "bob", "alpha", None).await;
        seed(&db, 3, "carol", "zeta", None).await;

        assert_eq!(list_servers(&db).await.unwrap(), vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_list_servers_empty_store() {
        let (db, _temp) = migrated_db().await;
        assert!(list_servers(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_message_authors_scoped() {
        let (db, _temp) = migrated_db().await;
        seed(&db, 1, "alice", "S", None).await;
        seed(&db, 2, "bob", "T", None).await;
        seed(&db, 3, "alice", "S", None).await;

        let rows = fetch_server_activity(&db, "S", ReplyScope::Global).await.unwrap().authors;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.author_name == "alice"));
        assert_eq!(rows[1].message_id, 3);
    }

    #[tokio::test]
    async fn test_reply_links_global_resolves_across_servers() {
        let (db, _temp) = migrated_db().await;
        seed(&db, 1, "dave", "T", None).await;
        seed(&db, 2, "bob", "S", Some(1)).await;

        let links = fetch_server_activity(&db, "S", ReplyScope::Global).await.unwrap().links;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].partner_name.as_deref(), Some("dave"));
    }

    #[tokio::test]
    async fn test_reply_links_server_scope_drops_foreign_target() {
        let (db, _temp) = migrated_db().await;
        seed(&db, 1, "dave", "T", None).await;
        seed(&db, 2, "bob", "S", Some(1)).await;

        let links = fetch_server_activity(&db, "S", ReplyScope::Server).await.unwrap().links;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].partner_name, None);
    }

    #[tokio::test]
    async fn test_reply_links_dangling_target() {
        let (db, _temp) = migrated_db().await;
        seed(&db, 2, "bob", "S", Some(77)).await;

        let links = fetch_server_activity(&db, "S", ReplyScope::Global).await.unwrap().links;
        assert_eq!(links[0].author_name, "bob");
        assert_eq!(links[0].partner_name, None);
    }

    #[tokio::test]
    async fn test_server_stats() {
        let (db, _temp) = migrated_db().await;
        seed(&db, 1, "alice", "S", None).await;
        seed(&db, 2, "bob", "S", Some(1)).await;
        seed(&db, 3, "bob", "S", Some(1)).await;
        seed(&db, 4, "carol", "T", None).await;

        let stats = server_stats(&db).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].server_name, "S");
        assert_eq!(stats[0].messages, 3);
        assert_eq!(stats[0].authors, 2);
        assert_eq!(stats[0].interactions, 2);
        assert_eq!(stats[1].server_name, "T");
        assert_eq!(stats[1].interactions, 0);
        assert!(stats[1].first_message_at.is_some());
    }
}
