//! Typed shapes of the XRPC payloads the bot consumes and produces.
//!
//! Required fields are plain (non-`Option`) so a response missing them fails
//! deserialization instead of surfacing half-populated values. Record
//! `createdAt` values are written by whichever client made the post and are
//! not guaranteed to be RFC 3339, so they are kept as raw strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::atproto::richtext::Facet;
use crate::atproto::uri::AtUri;
use crate::atproto::XrpcError;

pub const POST_COLLECTION: &str = "app.bsky.feed.post";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ProfileView {
    /// Display name if set and non-blank, otherwise the handle.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.handle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationReason {
    Mention,
    Reply,
    Like,
    Repost,
    Follow,
    Quote,
    StarterpackJoined,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub uri: String,
    pub cid: String,
    pub author: ProfileView,
    pub reason: NotificationReason,
    pub is_read: bool,
    pub indexed_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_actionable(&self) -> bool {
        self.reason == NotificationReason::Mention && !self.is_read
    }
}

/// One page of `app.bsky.notification.listNotifications`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl NotificationPage {
    /// Continuation token, treating an empty string as end-of-feed.
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// `{uri, cid}` pair naming one immutable record revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

impl StrongRef {
    fn validate(&self, field: &str) -> Result<(), XrpcError> {
        if self.cid.is_empty() {
            return Err(XrpcError::InvalidRecord(format!("{field}.cid is empty")));
        }
        self.uri
            .parse::<AtUri>()
            .map_err(|e| XrpcError::InvalidRecord(format!("{field}.uri: {e}")))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub root: StrongRef,
    pub parent: StrongRef,
}

/// The `app.bsky.feed.post` record body as stored in a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
    pub created_at: String,
}

/// Output of `com.atproto.repo.getRecord`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordOutput<T> {
    pub uri: String,
    #[serde(default)]
    pub cid: Option<String>,
    pub value: T,
}

/// A post fetched from its author's repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub uri: String,
    pub cid: String,
    pub author_did: String,
    pub text: String,
    pub reply: Option<ReplyRef>,
    pub created_at: String,
}

impl Post {
    pub fn strong_ref(&self) -> StrongRef {
        StrongRef {
            uri: self.uri.clone(),
            cid: self.cid.clone(),
        }
    }

    /// Validates a raw record into a `Post`. `expected_cid` backfills the cid
    /// when the server omits it from the envelope.
    pub fn from_record(
        output: RecordOutput<PostRecord>,
        expected_cid: &str,
    ) -> Result<Self, XrpcError> {
        let cid = output.cid.unwrap_or_else(|| expected_cid.to_string());
        let uri: AtUri = output
            .uri
            .parse()
            .map_err(|e| XrpcError::InvalidRecord(format!("uri: {e}")))?;
        if cid.is_empty() {
            return Err(XrpcError::InvalidRecord("cid is empty".to_string()));
        }
        if let Some(reply) = &output.value.reply {
            reply.root.validate("reply.root")?;
            reply.parent.validate("reply.parent")?;
        }

        Ok(Post {
            uri: output.uri,
            cid,
            author_did: uri.authority,
            text: output.value.text,
            reply: output.value.reply,
            created_at: output.value.created_at,
        })
    }
}

/// A post to be written with `com.atproto.repo.createRecord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
    pub created_at: DateTime<Utc>,
}

/// The `record` of a hydrated post view. Only the fields the viewer renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostViewRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: String,
}

/// Hydrated post from `app.bsky.feed.getPosts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: ProfileView,
    pub record: PostViewRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PostsOutput {
    pub posts: Vec<PostView>,
}
