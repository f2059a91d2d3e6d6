use std::collections::HashMap;

use crate::atproto::types::PostView;
use crate::atproto::{FeedSource, XrpcError, MAX_GET_POSTS_URIS};

/// Hydrates `uris` in batches the AppView accepts. Results follow the order of
/// `uris`; posts that no longer exist are dropped.
pub async fn fetch_all_posts(
    feed: &dyn FeedSource,
    uris: &[String],
) -> Result<Vec<PostView>, XrpcError> {
    let mut posts = Vec::with_capacity(uris.len());
    for chunk in uris.chunks(MAX_GET_POSTS_URIS) {
        posts.extend(feed.get_posts(chunk).await?);
    }

    let position: HashMap<&str, usize> = uris
        .iter()
        .enumerate()
        .rev()
        .map(|(i, uri)| (uri.as_str(), i))
        .collect();
    posts.sort_by_key(|p| position.get(p.uri.as_str()).copied().unwrap_or(usize::MAX));
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{post_view, MockFeed};

    fn uris(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("at://did:plc:carol/app.bsky.feed.post/p{i}"))
            .collect()
    }

    #[tokio::test]
    async fn test_57_uris_fetched_in_three_chunks() {
        let feed = MockFeed::default();
        let uris = uris(57);
        for uri in &uris {
            feed.add_view(post_view(uri));
        }

        let posts = fetch_all_posts(&feed, &uris).await.unwrap();

        let sizes: Vec<_> = feed.get_posts_calls().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![25, 25, 7]);
        let returned: Vec<_> = posts.iter().map(|p| p.uri.clone()).collect();
        assert_eq!(returned, uris);
    }

    #[tokio::test]
    async fn test_no_uris_makes_no_calls() {
        let feed = MockFeed::default();
        let posts = fetch_all_posts(&feed, &[]).await.unwrap();
        assert!(posts.is_empty());
        assert!(feed.get_posts_calls().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_posts_are_skipped() {
        let feed = MockFeed::default();
        let uris = uris(3);
        feed.add_view(post_view(&uris[0]));
        feed.add_view(post_view(&uris[2]));

        let posts = fetch_all_posts(&feed, &uris).await.unwrap();
        let returned: Vec<_> = posts.iter().map(|p| p.uri.as_str()).collect();
        assert_eq!(returned, vec![uris[0].as_str(), uris[2].as_str()]);
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let feed = MockFeed::default();
        feed.fail_get_posts(true);
        assert!(fetch_all_posts(&feed, &uris(2)).await.is_err());
    }
}
