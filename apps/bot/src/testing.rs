//! Recording fakes of the feed and the archive store, plus fixture builders.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::archive::{ArchiveStore, ArchivedEntry};
use crate::atproto::types::{
    NewPost, Notification, NotificationPage, NotificationReason, Post, PostView, PostViewRecord,
    ProfileView, ReplyRef, StrongRef,
};
use crate::atproto::{FeedSource, XrpcError, MAX_GET_POSTS_URIS};
use crate::models::saved_post::SavedPostRow;

const FIXED_TIME: &str = "2024-11-20T10:00:00Z";

fn fixed_time() -> DateTime<Utc> {
    FIXED_TIME.parse().unwrap()
}

fn not_found(what: &str) -> XrpcError {
    XrpcError::Api {
        status: 400,
        error: Some("NotFound".to_string()),
        message: format!("{what} not found"),
    }
}

fn unavailable() -> XrpcError {
    XrpcError::Api {
        status: 503,
        error: None,
        message: "upstream unavailable".to_string(),
    }
}

pub fn profile(name: &str) -> ProfileView {
    ProfileView {
        did: format!("did:plc:{name}"),
        handle: format!("{name}.test"),
        display_name: None,
    }
}

/// Unread mention by `author` in the post at `uri`.
pub fn mention(id: &str, author: &str, uri: &str) -> Notification {
    Notification {
        uri: uri.to_string(),
        cid: format!("cid-{id}"),
        author: profile(author),
        reason: NotificationReason::Mention,
        is_read: false,
        indexed_at: fixed_time(),
    }
}

pub fn notification(id: &str, reason: NotificationReason, is_read: bool) -> Notification {
    Notification {
        reason,
        is_read,
        ..mention(id, "zoe", &format!("at://did:plc:zoe/app.bsky.feed.post/{id}"))
    }
}

pub fn post(uri: &str, cid: &str) -> Post {
    let authority = uri
        .trim_start_matches("at://")
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string();
    Post {
        uri: uri.to_string(),
        cid: cid.to_string(),
        author_did: authority,
        text: "something worth keeping".to_string(),
        reply: None,
        created_at: FIXED_TIME.to_string(),
    }
}

pub fn reply_post(uri: &str, cid: &str, root: (&str, &str), parent: (&str, &str)) -> Post {
    let strong = |(uri, cid): (&str, &str)| StrongRef {
        uri: uri.to_string(),
        cid: cid.to_string(),
    };
    Post {
        reply: Some(ReplyRef {
            root: strong(root),
            parent: strong(parent),
        }),
        ..post(uri, cid)
    }
}

pub fn post_view(uri: &str) -> PostView {
    PostView {
        uri: uri.to_string(),
        cid: format!("cid-{}", uri.rsplit('/').next().unwrap_or_default()),
        author: profile("carol"),
        record: PostViewRecord {
            text: format!("text of {uri}"),
            created_at: FIXED_TIME.to_string(),
        },
    }
}

#[derive(Default)]
struct FeedState {
    /// Pages keyed by the cursor that requests them.
    pages: HashMap<Option<String>, NotificationPage>,
    posts: HashMap<String, Post>,
    views: HashMap<String, PostView>,
    profiles: HashMap<String, ProfileView>,
    fail_list_at: Option<Option<String>>,
    fail_mark_seen: bool,
    fail_publish: bool,
    fail_get_posts: bool,
    list_calls: Vec<Option<String>>,
    mark_seen_calls: Vec<DateTime<Utc>>,
    get_post_calls: Vec<(String, String, String)>,
    get_posts_calls: Vec<Vec<String>>,
    published: Vec<NewPost>,
    call_log: Vec<String>,
}

/// In-memory `FeedSource`. Marking seen flips every listed notification to
/// read, as the real seen marker does.
#[derive(Default)]
pub struct MockFeed {
    state: Mutex<FeedState>,
}

impl MockFeed {
    /// Page `i` is served for cursor `c{i}` (`None` for the first) and points
    /// at `c{i+1}`; the last page has no cursor.
    pub fn set_pages(&self, pages: Vec<Vec<Notification>>) {
        let count = pages.len();
        let mut state = self.state.lock().unwrap();
        state.pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, notifications)| {
                let key = (i > 0).then(|| format!("c{i}"));
                let cursor = (i + 1 < count).then(|| format!("c{}", i + 1));
                (
                    key,
                    NotificationPage {
                        notifications,
                        cursor,
                    },
                )
            })
            .collect();
    }

    pub fn add_post(&self, post: Post) {
        self.state.lock().unwrap().posts.insert(post.uri.clone(), post);
    }

    pub fn add_view(&self, view: PostView) {
        self.state.lock().unwrap().views.insert(view.uri.clone(), view);
    }

    pub fn add_profile(&self, profile: ProfileView) {
        self.state
            .lock()
            .unwrap()
            .profiles
            .insert(profile.handle.clone(), profile);
    }

    /// Fail `list_notifications` when called with this cursor.
    pub fn fail_list_at(&self, cursor: Option<&str>) {
        self.state.lock().unwrap().fail_list_at = cursor.map(|c| Some(c.to_string()));
    }

    pub fn fail_mark_seen(&self, fail: bool) {
        self.state.lock().unwrap().fail_mark_seen = fail;
    }

    pub fn fail_publish(&self, fail: bool) {
        self.state.lock().unwrap().fail_publish = fail;
    }

    pub fn fail_get_posts(&self, fail: bool) {
        self.state.lock().unwrap().fail_get_posts = fail;
    }

    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().list_calls.clone()
    }

    pub fn mark_seen_calls(&self) -> Vec<DateTime<Utc>> {
        self.state.lock().unwrap().mark_seen_calls.clone()
    }

    pub fn get_post_calls(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().get_post_calls.clone()
    }

    pub fn get_posts_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().get_posts_calls.clone()
    }

    pub fn published(&self) -> Vec<NewPost> {
        self.state.lock().unwrap().published.clone()
    }

    /// Names of the calls made, in order.
    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().unwrap().call_log.clone()
    }
}

#[async_trait]
impl FeedSource for MockFeed {
    async fn list_notifications(
        &self,
        _limit: u8,
        cursor: Option<&str>,
    ) -> Result<NotificationPage, XrpcError> {
        let mut state = self.state.lock().unwrap();
        let key = cursor.map(str::to_string);
        state.list_calls.push(key.clone());
        state.call_log.push("list_notifications".to_string());
        if state.fail_list_at.as_ref() == Some(&key) {
            return Err(unavailable());
        }
        Ok(state.pages.get(&key).cloned().unwrap_or_default())
    }

    async fn mark_seen(&self, seen_at: DateTime<Utc>) -> Result<(), XrpcError> {
        let mut state = self.state.lock().unwrap();
        state.call_log.push("mark_seen".to_string());
        if state.fail_mark_seen {
            return Err(unavailable());
        }
        state.mark_seen_calls.push(seen_at);
        for page in state.pages.values_mut() {
            for n in page.notifications.iter_mut() {
                n.is_read = true;
            }
        }
        Ok(())
    }

    async fn get_post(&self, cid: &str, repo: &str, rkey: &str) -> Result<Post, XrpcError> {
        let mut state = self.state.lock().unwrap();
        state.call_log.push("get_post".to_string());
        state
            .get_post_calls
            .push((cid.to_string(), repo.to_string(), rkey.to_string()));
        let uri = format!("at://{repo}/app.bsky.feed.post/{rkey}");
        state.posts.get(&uri).cloned().ok_or_else(|| not_found("Record"))
    }

    async fn get_posts(&self, uris: &[String]) -> Result<Vec<PostView>, XrpcError> {
        let mut state = self.state.lock().unwrap();
        state.call_log.push("get_posts".to_string());
        state.get_posts_calls.push(uris.to_vec());
        if uris.len() > MAX_GET_POSTS_URIS {
            return Err(XrpcError::BatchTooLarge {
                len: uris.len(),
                max: MAX_GET_POSTS_URIS,
            });
        }
        if state.fail_get_posts {
            return Err(unavailable());
        }
        Ok(uris
            .iter()
            .filter_map(|u| state.views.get(u).cloned())
            .collect())
    }

    async fn publish_post(&self, post: &NewPost) -> Result<StrongRef, XrpcError> {
        let mut state = self.state.lock().unwrap();
        state.call_log.push("publish_post".to_string());
        if state.fail_publish {
            return Err(unavailable());
        }
        state.published.push(post.clone());
        let n = state.published.len();
        Ok(StrongRef {
            uri: format!("at://did:plc:savebot/app.bsky.feed.post/reply{n}"),
            cid: format!("cid-reply{n}"),
        })
    }

    async fn get_profile(&self, actor: &str) -> Result<ProfileView, XrpcError> {
        let state = self.state.lock().unwrap();
        state
            .profiles
            .get(actor)
            .cloned()
            .ok_or_else(|| not_found("Profile"))
    }
}

#[derive(Default)]
struct StoreState {
    entries: Vec<ArchivedEntry>,
    fail_inserts: bool,
}

#[derive(Default)]
pub struct MockStore {
    state: Mutex<StoreState>,
}

impl MockStore {
    pub fn fail_inserts(&self, fail: bool) {
        self.state.lock().unwrap().fail_inserts = fail;
    }

    pub fn entries(&self) -> Vec<ArchivedEntry> {
        self.state.lock().unwrap().entries.clone()
    }
}

#[async_trait]
impl ArchiveStore for MockStore {
    async fn insert(&self, entry: &ArchivedEntry) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_inserts {
            return Err(sqlx::Error::PoolClosed);
        }
        state.entries.push(entry.clone());
        Ok(())
    }

    async fn select_by_owner(&self, owner_did: &str) -> Result<Vec<SavedPostRow>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.owner_did == owner_did)
            .map(|(i, e)| SavedPostRow {
                id: i as i64 + 1,
                cid: e.cid.clone(),
                uri: e.uri.clone(),
                saved_by_did: e.owner_did.clone(),
                saved_at: fixed_time(),
            })
            .collect())
    }
}
