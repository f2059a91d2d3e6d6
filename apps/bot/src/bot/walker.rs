//! Notification Cursor Walker.
//!
//! One walk pages through the notification feed from its head, handles every
//! unread mention, and then advances the server-side seen marker once. Item
//! failures are logged and skipped; only listing and seen-marking failures end
//! a walk early.
//!
//! The seen marker is set to the time the walk started listing, so a walk
//! spread over several cycles by the page cap never marks as seen anything
//! that arrived at the feed head after its first page.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::archive::ArchiveStore;
use crate::atproto::types::Notification;
use crate::atproto::FeedSource;
use crate::bot::error::{FeedFetchError, ItemError};
use crate::bot::resolver::resolve;
use crate::bot::responder::Responder;

/// Notifications requested per page.
pub const PAGE_SIZE: u8 = 100;

/// Counters for one cycle of a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub pages: usize,
    pub fetched: usize,
    pub selected: usize,
    pub archived: usize,
    pub failed: usize,
    pub duplicates: usize,
    /// False when the page cap cut the walk short; it resumes next cycle.
    pub completed: bool,
}

pub struct NotificationWalker {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn ArchiveStore>,
    responder: Responder,
    max_pages: usize,
    /// Continuation token of a walk deferred by the page cap.
    resume_cursor: Option<String>,
    /// When the deferred walk fetched its first page.
    walk_started: Option<DateTime<Utc>>,
    /// Notification uris handled since the last completed walk.
    handled: HashSet<String>,
}

impl NotificationWalker {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn ArchiveStore>,
        responder: Responder,
        max_pages: usize,
    ) -> Self {
        Self {
            feed,
            store,
            responder,
            max_pages: max_pages.max(1),
            resume_cursor: None,
            walk_started: None,
            handled: HashSet::new(),
        }
    }

    /// Runs one cycle: a full walk, or the next `max_pages` pages of a walk
    /// that was deferred. Exclusive borrow keeps cycles from overlapping.
    pub async fn run_cycle(&mut self) -> Result<WalkReport, FeedFetchError> {
        let result = self.walk().await;
        if result.is_err() {
            // The next cycle starts over from the feed head. `handled` is kept
            // because nothing was marked seen, so earlier pages come back unread.
            self.resume_cursor = None;
            self.walk_started = None;
        }
        result
    }

    async fn walk(&mut self) -> Result<WalkReport, FeedFetchError> {
        let mut report = WalkReport::default();
        let mut cursor = self.resume_cursor.take();
        let started = self.walk_started.take().unwrap_or_else(Utc::now);
        if let Some(c) = &cursor {
            debug!("Resuming deferred walk at cursor {c}");
        }

        loop {
            if report.pages == self.max_pages {
                warn!(
                    "Page cap of {} reached, deferring the rest of the feed to the next cycle",
                    self.max_pages
                );
                self.resume_cursor = cursor;
                self.walk_started = Some(started);
                return Ok(report);
            }

            let page = self
                .feed
                .list_notifications(PAGE_SIZE, cursor.as_deref())
                .await
                .map_err(FeedFetchError::ListNotifications)?;
            report.pages += 1;
            report.fetched += page.notifications.len();

            for notification in page.notifications.iter().filter(|n| n.is_actionable()) {
                report.selected += 1;
                if !self.handled.insert(notification.uri.clone()) {
                    debug!("Skipping {}, already handled", notification.uri);
                    report.duplicates += 1;
                    continue;
                }

                match self.process(notification).await {
                    Ok(()) => report.archived += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!("Failed to handle mention {}: {e}", notification.uri);
                    }
                }
            }

            cursor = page.next_cursor().map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        self.feed
            .mark_seen(started)
            .await
            .map_err(FeedFetchError::MarkSeen)?;

        self.handled.clear();
        report.completed = true;
        Ok(report)
    }

    async fn process(&self, notification: &Notification) -> Result<(), ItemError> {
        debug!("Mentioned by {}", notification.author.label());

        let resolution = resolve(self.feed.as_ref(), notification).await?;
        debug!(
            "Mention in post by {} ({:?}), archive target {}",
            resolution.mention.author_did, resolution.mention.text, resolution.target.uri
        );

        self.responder
            .respond(
                self.feed.as_ref(),
                self.store.as_ref(),
                notification,
                &resolution,
            )
            .await?;
        Ok(())
    }
}

/// Logs the outcome of a cycle at a level matching what happened.
pub fn log_report(report: &WalkReport) {
    if report.selected == 0 {
        debug!(
            "Walk cycle: {} pages, {} notifications, nothing to do",
            report.pages, report.fetched
        );
        return;
    }
    info!(
        "Walk cycle: {} pages, {} mentions, {} archived, {} failed, {} duplicates{}",
        report.pages,
        report.selected,
        report.archived,
        report.failed,
        report.duplicates,
        if report.completed { "" } else { " (deferred)" }
    );
}
