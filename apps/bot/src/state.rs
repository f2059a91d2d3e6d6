use std::sync::Arc;

use crate::archive::ArchiveStore;
use crate::atproto::FeedSource;

/// Shared application state injected into all route handlers via Axum extractors.
/// The same feed client and store are driven by the notification walker.
#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<dyn FeedSource>,
    pub store: Arc<dyn ArchiveStore>,
    /// Handle of the bot account, shown on the index page.
    pub bot_handle: String,
}
