use thiserror::Error;

use crate::atproto::uri::AtUriError;
use crate::atproto::XrpcError;

/// Feed-level failure. Aborts the current walk; the next cycle starts over
/// from the feed head.
#[derive(Debug, Error)]
pub enum FeedFetchError {
    #[error("failed to list notifications: {0}")]
    ListNotifications(#[source] XrpcError),

    #[error("failed to mark notifications seen: {0}")]
    MarkSeen(#[source] XrpcError),
}

/// The notification's post could not be turned into an archive target.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error(transparent)]
    MalformedUri(#[from] AtUriError),

    #[error("expected a post, got a record in '{0}'")]
    UnexpectedCollection(String),

    #[error("failed to fetch post: {0}")]
    Fetch(#[source] XrpcError),
}

/// Failure while handling a single notification. Logged at the item boundary;
/// never aborts the walk.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("failed to publish reply: {0}")]
    Publish(#[source] XrpcError),

    /// The reply went out but the archive row was not written.
    #[error("reply published as {reply_uri} but archive insert failed: {source}")]
    Persistence {
        reply_uri: String,
        #[source]
        source: sqlx::Error,
    },
}
