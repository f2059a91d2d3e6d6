use askama::Template;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::atproto::types::PostView;
use crate::atproto::uri::AtUri;

/// One rendered bookmark. Fields are pre-formatted; the template only escapes.
pub struct BookmarkView {
    pub uri: String,
    pub cid: String,
    pub text: String,
    pub author_label: String,
    pub author_handle: String,
    pub profile_url: String,
    pub post_url: String,
    pub created: String,
}

impl From<&PostView> for BookmarkView {
    fn from(post: &PostView) -> Self {
        let profile_url = format!("https://bsky.app/profile/{}", post.author.did);
        let post_url = match post.uri.parse::<AtUri>() {
            Ok(uri) => format!("{profile_url}/post/{}", uri.rkey),
            Err(_) => profile_url.clone(),
        };
        let author_label = match post.author.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("@{}", post.author.handle),
        };

        BookmarkView {
            uri: post.uri.clone(),
            cid: post.cid.clone(),
            text: post.record.text.clone(),
            author_label,
            author_handle: post.author.handle.clone(),
            profile_url,
            post_url,
            created: format_created(&post.record.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "bookmarks.html")]
struct BookmarksPage<'a> {
    handle: &'a str,
    bookmarks: Vec<BookmarkView>,
}

/// e.g. `November 20, 2024 at 10:00 AM`
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y at %-I:%M %p").to_string()
}

/// Formats a record's `createdAt`. Timestamps without an offset are read as
/// UTC; anything else unparseable is shown verbatim.
pub fn format_created(raw: &str) -> String {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return format_date(at.with_timezone(&Utc));
    }
    match raw.parse::<NaiveDateTime>() {
        Ok(naive) => format_date(naive.and_utc()),
        Err(_) => raw.to_string(),
    }
}

pub fn render_bookmarks_page(handle: &str, posts: &[PostView]) -> Result<String, askama::Error> {
    BookmarksPage {
        handle,
        bookmarks: posts.iter().map(BookmarkView::from).collect(),
    }
    .render()
}
