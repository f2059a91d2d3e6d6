/// AT Protocol client: the single point of entry for all network calls the bot makes.
///
/// Everything upstream goes through the `FeedSource` trait so the pipeline and
/// the viewer can be driven by a recording mock in tests.
///
/// Queries (GET) are retried on 429/5xx with exponential backoff. Procedures
/// (POST) are sent once, since replaying `createRecord` would publish twice.
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub mod richtext;
pub mod types;
pub mod uri;

use types::{
    NewPost, NotificationPage, Post, PostRecord, PostView, PostsOutput, ProfileView,
    RecordOutput, StrongRef, POST_COLLECTION,
};

/// Upper bound `app.bsky.feed.getPosts` accepts per call.
pub const MAX_GET_POSTS_URIS: usize = 25;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum XrpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XRPC error (status {status}, {}): {message}", .error.as_deref().unwrap_or("unknown"))]
    Api {
        status: u16,
        error: Option<String>,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("no active session")]
    NotAuthenticated,

    #[error("batch of {len} exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },
}

impl XrpcError {
    /// True for 4xx responses, i.e. the request itself was rejected.
    pub fn is_client_error(&self) -> bool {
        matches!(self, XrpcError::Api { status, .. } if (400..500).contains(status))
    }

    fn is_expired_token(&self) -> bool {
        matches!(self, XrpcError::Api { error: Some(e), .. } if e == "ExpiredToken")
    }
}

/// The upstream social network as seen by the bot.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn list_notifications(
        &self,
        limit: u8,
        cursor: Option<&str>,
    ) -> Result<NotificationPage, XrpcError>;

    async fn mark_seen(&self, seen_at: DateTime<Utc>) -> Result<(), XrpcError>;

    async fn get_post(&self, cid: &str, repo: &str, rkey: &str) -> Result<Post, XrpcError>;

    /// Hydrates at most `MAX_GET_POSTS_URIS` posts. Unresolvable uris are omitted.
    async fn get_posts(&self, uris: &[String]) -> Result<Vec<PostView>, XrpcError>;

    async fn publish_post(&self, post: &NewPost) -> Result<StrongRef, XrpcError>;

    async fn get_profile(&self, actor: &str) -> Result<ProfileView, XrpcError>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    refresh_jwt: String,
    did: String,
    handle: String,
}

#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct PostRecordBody<'a> {
    #[serde(rename = "$type")]
    record_type: &'static str,
    #[serde(flatten)]
    post: &'a NewPost,
}

/// Session-holding XRPC client for a PDS.
pub struct AtpClient {
    client: Client,
    service: Url,
    session: RwLock<Option<Session>>,
}

impl AtpClient {
    pub fn new(service: Url) -> Result<Self, XrpcError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            service,
            session: RwLock::new(None),
        })
    }

    /// Opens a session with `com.atproto.server.createSession`. Returns the
    /// handle the server reports for the account.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<String, XrpcError> {
        let response = self
            .client
            .post(self.endpoint("com.atproto.server.createSession"))
            .json(&json!({ "identifier": identifier, "password": password }))
            .send()
            .await?;
        let session: Session = decode(response).await?;
        let handle = session.handle.clone();
        info!("Logged in as {} ({})", session.handle, session.did);
        *self.session.write().await = Some(session);
        Ok(handle)
    }

    async fn refresh(&self) -> Result<(), XrpcError> {
        let refresh_jwt = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_jwt.clone())
            .ok_or(XrpcError::NotAuthenticated)?;

        let response = self
            .client
            .post(self.endpoint("com.atproto.server.refreshSession"))
            .bearer_auth(refresh_jwt)
            .send()
            .await?;
        let session: Session = decode(response).await?;
        debug!("Refreshed session for {}", session.did);
        *self.session.write().await = Some(session);
        Ok(())
    }

    fn endpoint(&self, nsid: &str) -> Url {
        let mut url = self.service.clone();
        url.set_path(&format!("/xrpc/{nsid}"));
        url
    }

    async fn access_token(&self) -> Result<String, XrpcError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_jwt.clone())
            .ok_or(XrpcError::NotAuthenticated)
    }

    async fn did(&self) -> Result<String, XrpcError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.did.clone())
            .ok_or(XrpcError::NotAuthenticated)
    }

    /// Sends an authenticated request, refreshing the session once if the
    /// access token has expired.
    async fn send<T, F>(&self, build: F) -> Result<T, XrpcError>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.access_token().await?;
        match decode(build(token.as_str()).send().await?).await {
            Err(e) if e.is_expired_token() => {
                self.refresh().await?;
                let token = self.access_token().await?;
                decode(build(token.as_str()).send().await?).await
            }
            other => other,
        }
    }

    /// GET `/xrpc/{nsid}`, retried on rate limiting and server errors.
    async fn query<T: DeserializeOwned>(
        &self,
        nsid: &str,
        params: &[(&str, String)],
    ) -> Result<T, XrpcError> {
        let url = self.endpoint(nsid);
        let mut last_error: Option<XrpcError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s
                let delay = std::time::Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "{nsid} attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let result = self
                .send(|token| {
                    self.client
                        .request(Method::GET, url.clone())
                        .bearer_auth(token)
                        .query(params)
                })
                .await;

            match result {
                Err(e @ XrpcError::Http(_)) => last_error = Some(e),
                Err(XrpcError::Api {
                    status,
                    error,
                    message,
                }) if status == 429 || status >= 500 => {
                    last_error = Some(XrpcError::Api {
                        status,
                        error,
                        message,
                    })
                }
                other => return other,
            }
        }

        Err(last_error.unwrap_or(XrpcError::Api {
            status: 429,
            error: None,
            message: format!("{nsid} failed after {MAX_RETRIES} attempts"),
        }))
    }

    /// POST `/xrpc/{nsid}` with a JSON body. Never retried.
    async fn procedure<T, B>(&self, nsid: &str, body: &B) -> Result<T, XrpcError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(nsid);
        self.send(|token| {
            self.client
                .request(Method::POST, url.clone())
                .bearer_auth(token)
                .json(body)
        })
        .await
    }
}

/// Maps a response to `T`, or to `XrpcError::Api` for non-2xx statuses.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, XrpcError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let parsed = serde_json::from_str::<XrpcErrorBody>(&body).ok();
        let (error, message) = match parsed {
            Some(b) => (b.error, b.message.unwrap_or(body)),
            None => (None, body),
        };
        return Err(XrpcError::Api {
            status: status.as_u16(),
            error,
            message,
        });
    }

    // Procedures such as updateSeen answer with an empty body.
    let body = if body.trim().is_empty() { "null" } else { &body };
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl FeedSource for AtpClient {
    async fn list_notifications(
        &self,
        limit: u8,
        cursor: Option<&str>,
    ) -> Result<NotificationPage, XrpcError> {
        let mut params = vec![("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        self.query("app.bsky.notification.listNotifications", &params)
            .await
    }

    async fn mark_seen(&self, seen_at: DateTime<Utc>) -> Result<(), XrpcError> {
        let body = json!({ "seenAt": seen_at.to_rfc3339_opts(SecondsFormat::Millis, true) });
        let _: Option<serde_json::Value> = self
            .procedure("app.bsky.notification.updateSeen", &body)
            .await?;
        Ok(())
    }

    async fn get_post(&self, cid: &str, repo: &str, rkey: &str) -> Result<Post, XrpcError> {
        let params = [
            ("repo", repo.to_string()),
            ("collection", POST_COLLECTION.to_string()),
            ("rkey", rkey.to_string()),
            ("cid", cid.to_string()),
        ];
        let output: RecordOutput<PostRecord> =
            self.query("com.atproto.repo.getRecord", &params).await?;
        Post::from_record(output, cid)
    }

    async fn get_posts(&self, uris: &[String]) -> Result<Vec<PostView>, XrpcError> {
        if uris.len() > MAX_GET_POSTS_URIS {
            return Err(XrpcError::BatchTooLarge {
                len: uris.len(),
                max: MAX_GET_POSTS_URIS,
            });
        }
        if uris.is_empty() {
            return Ok(Vec::new());
        }
        let params: Vec<_> = uris.iter().map(|u| ("uris", u.clone())).collect();
        let output: PostsOutput = self.query("app.bsky.feed.getPosts", &params).await?;
        Ok(output.posts)
    }

    async fn publish_post(&self, post: &NewPost) -> Result<StrongRef, XrpcError> {
        let repo = self.did().await?;
        let record = PostRecordBody {
            record_type: POST_COLLECTION,
            post,
        };
        let body = json!({
            "repo": repo,
            "collection": POST_COLLECTION,
            "record": record,
        });
        self.procedure("com.atproto.repo.createRecord", &body).await
    }

    async fn get_profile(&self, actor: &str) -> Result<ProfileView, XrpcError> {
        self.query("app.bsky.actor.getProfile", &[("actor", actor.to_string())])
            .await
    }
}
