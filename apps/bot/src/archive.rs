//! Archive Store: append-only record of which posts were saved for whom.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::saved_post::SavedPostRow;

/// One archived post. `owner_did` is the user who asked for the save, never
/// the post's author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedEntry {
    pub cid: String,
    pub uri: String,
    pub owner_did: String,
}

#[async_trait]
pub trait ArchiveStore: Send + Sync {
    async fn insert(&self, entry: &ArchivedEntry) -> Result<(), sqlx::Error>;

    /// Entries owned by `owner_did`, oldest first.
    async fn select_by_owner(&self, owner_did: &str) -> Result<Vec<SavedPostRow>, sqlx::Error>;
}

#[derive(Clone)]
pub struct SqliteArchiveStore {
    pool: SqlitePool,
}

impl SqliteArchiveStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArchiveStore for SqliteArchiveStore {
    /// Append-only: rows are inserted, never updated or deleted.
    async fn insert(&self, entry: &ArchivedEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO saved_posts (cid, uri, saved_by_did, saved_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&entry.cid)
        .bind(&entry.uri)
        .bind(&entry.owner_did)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select_by_owner(&self, owner_did: &str) -> Result<Vec<SavedPostRow>, sqlx::Error> {
        sqlx::query_as::<_, SavedPostRow>(
            "SELECT * FROM saved_posts WHERE saved_by_did = ? ORDER BY id ASC",
        )
        .bind(owner_did)
        .fetch_all(&self.pool)
        .await
    }
}
