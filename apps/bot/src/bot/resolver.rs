//! Content Resolver: turns a mention notification into the post to archive.

use crate::atproto::types::{Notification, Post, StrongRef, POST_COLLECTION};
use crate::atproto::uri::AtUri;
use crate::atproto::FeedSource;
use crate::bot::error::ResolutionError;

/// The mentioning post and the record to archive on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub mention: Post,
    pub target: StrongRef,
}

/// Fetches the post behind `notification`. A mention inside a reply targets
/// the reply's parent; a mention in a top-level post targets the post itself.
pub async fn resolve(
    feed: &dyn FeedSource,
    notification: &Notification,
) -> Result<Resolution, ResolutionError> {
    let uri: AtUri = notification.uri.parse()?;
    if uri.collection != POST_COLLECTION {
        return Err(ResolutionError::UnexpectedCollection(uri.collection));
    }

    let mention = feed
        .get_post(&notification.cid, &uri.authority, &uri.rkey)
        .await
        .map_err(ResolutionError::Fetch)?;

    let target = match &mention.reply {
        Some(reply) => reply.parent.clone(),
        None => mention.strong_ref(),
    };

    Ok(Resolution { mention, target })
}
