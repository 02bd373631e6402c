use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{CanonicalMessage, MessageId, RoomId, UserId};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Upserts the whole batch inside one transaction: either every record is
    /// visible afterward or none are. The upsert key is the message id;
    /// an existing record with the same id is replaced wholesale.
    pub async fn upsert_messages(&self, messages: &[CanonicalMessage]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for message in messages {
            sqlx::query(
                "INSERT INTO messages (id, room_id, body, author_id, author_username, author_display, message_type, sent_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    room_id = excluded.room_id,
                    body = excluded.body,
                    author_id = excluded.author_id,
                    author_username = excluded.author_username,
                    author_display = excluded.author_display,
                    message_type = excluded.message_type,
                    sent_at = excluded.sent_at,
                    updated_at = excluded.updated_at",
            )
            .bind(message.id.as_str())
            .bind(message.room_id.as_str())
            .bind(&message.body)
            .bind(message.author_id.as_str())
            .bind(message.author_username.as_deref())
            .bind(&message.author_display)
            .bind(message.message_type.as_deref())
            .bind(message.sent_at)
            .bind(message.updated_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert message {}", message.id))?;
        }

        tx.commit().await.context("failed to commit history batch")?;
        Ok(())
    }

    pub async fn message(&self, id: &MessageId) -> Result<Option<CanonicalMessage>> {
        let row = sqlx::query(
            "SELECT id, room_id, body, author_id, author_username, author_display, message_type, sent_at, updated_at
             FROM messages
             WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_message))
    }

    /// Messages for a room, oldest first, limited to `limit` and optionally
    /// restricted to records sent strictly before `before`.
    pub async fn list_room_messages(
        &self,
        room_id: &RoomId,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<CanonicalMessage>> {
        let mut rows = if let Some(before) = before {
            sqlx::query(
                "SELECT id, room_id, body, author_id, author_username, author_display, message_type, sent_at, updated_at
                 FROM messages
                 WHERE room_id = ? AND sent_at < ?
                 ORDER BY sent_at DESC
                 LIMIT ?",
            )
            .bind(room_id.as_str())
            .bind(before)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, room_id, body, author_id, author_username, author_display, message_type, sent_at, updated_at
                 FROM messages
                 WHERE room_id = ?
                 ORDER BY sent_at DESC
                 LIMIT ?",
            )
            .bind(room_id.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        rows.reverse();
        Ok(rows.into_iter().map(row_to_message).collect())
    }

    pub async fn count_room_messages(&self, room_id: &RoomId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE room_id = ?")
            .bind(room_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn row_to_message(r: SqliteRow) -> CanonicalMessage {
    CanonicalMessage {
        id: MessageId(r.get::<String, _>(0)),
        room_id: RoomId(r.get::<String, _>(1)),
        body: r.get::<String, _>(2),
        author_id: UserId(r.get::<String, _>(3)),
        author_username: r.get::<Option<String>, _>(4),
        author_display: r.get::<String, _>(5),
        message_type: r.get::<Option<String>, _>(6),
        sent_at: r.get::<DateTime<Utc>, _>(7),
        updated_at: r.get::<Option<DateTime<Utc>>, _>(8),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
