use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedPostRow {
    pub id: i64,
    pub cid: String,
    pub uri: String,
    pub saved_by_did: String,
    pub saved_at: DateTime<Utc>,
}
