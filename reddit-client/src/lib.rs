pub mod api;
pub mod config;
pub mod rate_limiter;
pub mod retry;


pub use api::{RedditApiClient, MAX_PAGE_SIZE};
pub use config::RedditCredentials;
pub use retry::{RetryConfig, RetryExecutor, RetryStats};

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError};
use oauth2::{TokenResponse, TokenUrl};
use scraper_core::{Comment, CoreError, RedditApiError, Submission, TimeFilter};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens this close to expiry are refreshed before use.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AppToken {
    pub access_token: String,
    pub expires_at: Instant,
}

impl AppToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .checked_sub(TOKEN_EXPIRY_MARGIN)
            .map_or(true, |refresh_at| Instant::now() >= refresh_at)
    }
}

/// Authenticated handle to the Reddit API using the application-only
/// (client credentials) grant. The token is fetched on first use.
#[derive(Debug)]
pub struct RedditClient {
    oauth_client: BasicClient,
    http_client: reqwest::Client,
    api: RedditApiClient,
    retry: RetryExecutor,
    token: Mutex<Option<AppToken>>,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self, CoreError> {
        let http_client = reqwest::Client::builder()
            .user_agent(&credentials.user_agent)
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let api = RedditApiClient::new(http_client.clone())?;
        Self::with_api(credentials, http_client, api)
    }

    pub fn with_api(
        credentials: RedditCredentials,
        http_client: reqwest::Client,
        api: RedditApiClient,
    ) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            CoreError::InvalidInput {
                message: format!("invalid authorization URL: {}", e),
            }
        })?;
        let token_url = TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(|e| {
            CoreError::InvalidInput {
                message: format!("invalid token URL: {}", e),
            }
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id),
            Some(ClientSecret::new(credentials.client_secret)),
            auth_url,
            Some(token_url),
        );

        debug!("Reddit client created for {}", credentials.user_agent);
        Ok(Self {
            oauth_client,
            http_client,
            api,
            retry: RetryExecutor::new(RetryConfig::reddit()),
            token: Mutex::new(None),
        })
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token
            .lock()
            .await
            .as_ref()
            .is_some_and(|token| !token.is_expired())
    }

    pub async fn set_token(&self, token: AppToken) {
        *self.token.lock().await = Some(token);
    }

    /// Return a valid bearer token, requesting a new one if none is cached or
    /// the cached one is about to expire.
    pub async fn access_token(&self) -> Result<String, CoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| !token.is_expired()) {
            return Ok(token.access_token.clone());
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn request_token(&self) -> Result<AppToken, CoreError> {
        info!("Requesting application-only access token from Reddit");
        let response = self
            .oauth_client
            .exchange_client_credentials()
            .request_async(|request| send_oauth_request(&self.http_client, request))
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(response) => {
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                        reason: response.to_string(),
                    })
                }
                RequestTokenError::Request(e) => CoreError::Network(e),
                other => CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: other.to_string(),
                }),
            })?;

        let lifetime = response
            .expires_in()
            .unwrap_or_else(|| Duration::from_secs(3600));
        debug!("Access token valid for {:?}", lifetime);

        Ok(AppToken {
            access_token: response.access_token().secret().clone(),
            expires_at: Instant::now() + lifetime,
        })
    }

    /// Search `scope` (or all of Reddit) for `query`, newest first, following
    /// pagination until `limit` posts are collected or results run out.
    pub async fn search_submissions(
        &self,
        scope: Option<&str>,
        query: &str,
        time_filter: TimeFilter,
        limit: u32,
    ) -> Result<Vec<Submission>, CoreError> {
        let scope = scope.unwrap_or("all");
        let limit = limit as usize;
        let mut submissions = Vec::new();
        let mut after: Option<String> = None;

        while submissions.len() < limit {
            let remaining = (limit - submissions.len()) as u32;
            let page_after = after.as_deref();
            let listing = self
                .retry
                .execute("search", move || async move {
                    let token = self.access_token().await?;
                    self.api
                        .search_page(&token, scope, query, time_filter, remaining, page_after)
                        .await
                })
                .await?;

            let page_len = listing.data.children.len();
            submissions.extend(
                listing
                    .data
                    .children
                    .into_iter()
                    .map(|child| Submission::from(child.data)),
            );

            after = listing.data.after;
            if page_len == 0 || after.is_none() {
                break;
            }
        }

        submissions.truncate(limit);
        Ok(submissions)
    }

    /// Comments delivered with the post, breadth-first. "Load more"
    /// placeholders are dropped, not fetched.
    pub async fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>, CoreError> {
        let roots = self
            .retry
            .execute("comments", move || async move {
                let token = self.access_token().await?;
                self.api.get_comments(&token, post_id).await
            })
            .await?;

        Ok(api::flatten_comment_tree(roots)
            .into_iter()
            .map(Comment::from)
            .collect())
    }

    pub fn retry_stats(&self) -> RetryStats {
        self.retry.stats()
    }
}

/// Sends the token request through our own client so the User-Agent header
/// Reddit requires is present.
async fn send_oauth_request(
    http_client: &reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http_client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
