//! Action Responder: acknowledges a save with a threaded reply, then records it.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::archive::{ArchiveStore, ArchivedEntry};
use crate::atproto::richtext::RichTextBuilder;
use crate::atproto::types::{NewPost, Notification, ReplyRef};
use crate::atproto::FeedSource;
use crate::bot::error::ItemError;
use crate::bot::resolver::Resolution;

pub struct Responder {
    domain: String,
}

impl Responder {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    /// Link to the author's bookmark page on the viewer.
    pub fn bookmarks_url(&self, handle: &str) -> String {
        format!("https://{}/view/{}", self.domain, handle)
    }

    /// Builds the acknowledgement reply. It is threaded under the mentioning
    /// post, keeping that post's root when it is itself a reply.
    pub fn compose(
        &self,
        notification: &Notification,
        resolution: &Resolution,
        now: DateTime<Utc>,
    ) -> NewPost {
        let author = &notification.author;
        let (text, facets) = RichTextBuilder::new()
            .text("👋 Hey ")
            .mention(&author.handle, &author.did)
            .text(", just saved that for you!\n\nView your bookmarks here: ")
            .link(&self.bookmarks_url(&author.handle))
            .build();

        let parent = resolution.mention.strong_ref();
        let root = match &resolution.mention.reply {
            Some(reply) => reply.root.clone(),
            None => parent.clone(),
        };

        NewPost {
            text,
            facets,
            reply: Some(ReplyRef { root, parent }),
            created_at: now,
        }
    }

    /// Publishes the reply, then inserts the archive row. Neither step is
    /// retried; a failed insert leaves the reply in place.
    pub async fn respond(
        &self,
        feed: &dyn FeedSource,
        store: &dyn ArchiveStore,
        notification: &Notification,
        resolution: &Resolution,
    ) -> Result<ArchivedEntry, ItemError> {
        let reply = self.compose(notification, resolution, Utc::now());
        let published = feed.publish_post(&reply).await.map_err(ItemError::Publish)?;

        let entry = ArchivedEntry {
            cid: resolution.target.cid.clone(),
            uri: resolution.target.uri.clone(),
            owner_did: notification.author.did.clone(),
        };
        store
            .insert(&entry)
            .await
            .map_err(|source| ItemError::Persistence {
                reply_uri: published.uri.clone(),
                source,
            })?;

        info!(
            "Saved {} for {} (reply {})",
            entry.uri, notification.author.handle, published.uri
        );
        Ok(entry)
    }
}
