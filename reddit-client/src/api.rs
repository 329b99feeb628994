use crate::rate_limiter::{RateLimitConfig, RateLimiter, ServerQuota};
use reqwest::{Client, Method, Response, StatusCode};
use scraper_core::{Comment, CoreError, RedditApiError, Submission, TimeFilter};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};
use url::Url;

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Reddit caps listing pages at 100 items.
pub const MAX_PAGE_SIZE: u32 = 100;

const COMMENT_LIMIT: &str = "2048";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: Option<String>,
    pub subreddit: String,
    #[serde(default)]
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub replies: Option<RedditReplies>,
}

/// A "load more comments" placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditMoreData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentThing {
    #[serde(rename = "t1")]
    Comment(RedditCommentData),
    #[serde(rename = "more")]
    More(RedditMoreData),
}

/// Comment listings carry the `kind`/`data` envelope inside each child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentListing {
    pub kind: String,
    pub data: CommentListingData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentListingData {
    pub children: Vec<CommentThing>,
    pub after: Option<String>,
    pub before: Option<String>,
}

/// Reddit sends `""` instead of a listing for comments without replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedditReplies {
    Listing(CommentListing),
    Empty(String),
}

/// Flatten a comment forest breadth-first, dropping "load more" placeholders
/// instead of fetching them.
pub fn flatten_comment_tree(roots: Vec<CommentThing>) -> Vec<RedditCommentData> {
    let mut queue: VecDeque<CommentThing> = roots.into();
    let mut comments = Vec::new();
    let mut skipped_placeholders = 0u32;

    while let Some(thing) = queue.pop_front() {
        match thing {
            CommentThing::Comment(mut comment) => {
                if let Some(RedditReplies::Listing(listing)) = comment.replies.take() {
                    queue.extend(listing.data.children);
                }
                comments.push(comment);
            }
            CommentThing::More(more) => {
                skipped_placeholders += more.count;
            }
        }
    }

    if skipped_placeholders > 0 {
        debug!(
            "Skipped {} comments hidden behind 'load more' placeholders",
            skipped_placeholders
        );
    }
    comments
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: Url,
    rate_limiter: RateLimiter,
}

impl RedditApiClient {
    pub fn new(http_client: Client) -> Result<Self, CoreError> {
        let base_url = Url::parse(REDDIT_API_BASE).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid API base URL: {}", e),
        })?;
        Ok(Self::with_base_url(http_client, base_url))
    }

    pub fn with_base_url(http_client: Client, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
            rate_limiter: RateLimiter::new(RateLimitConfig::reddit_oauth()),
        }
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, CoreError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| CoreError::InvalidInput {
                message: format!("invalid endpoint {}: {}", endpoint, e),
            })
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = self.endpoint_url(endpoint)?;

        let waited = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} {} after {:?}",
            method, endpoint, waited
        );

        let request_builder = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(access_token)
            .query(query_params);

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = request_builder.send().await.map_err(|e| {
            error!("Network error for {} {}: {}", method, endpoint, e);
            if e.is_timeout() {
                CoreError::RedditApi(RedditApiError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        if let Some(quota) = ServerQuota::from_headers(response.headers()) {
            self.rate_limiter.observe_quota(quota).await;
        }

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        Err(CoreError::RedditApi(status_error(status, &response, endpoint)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        let response = self
            .make_request(Method::GET, endpoint, access_token, query_params)
            .await?;

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse response from {}", endpoint),
            })
        })
    }

    /// Fetch one page of `/r/{scope}/search`, newest first.
    pub async fn search_page(
        &self,
        access_token: &str,
        scope: &str,
        query: &str,
        time_filter: TimeFilter,
        limit: u32,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/search", scope);
        let limit_str = limit.min(MAX_PAGE_SIZE).to_string();
        let mut params = vec![
            ("q", query),
            ("sort", "new"),
            ("t", time_filter.as_str()),
            ("limit", limit_str.as_str()),
            ("restrict_sr", "on"),
            ("syntax", "lucene"),
            ("raw_json", "1"),
        ];
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let listing: RedditListing<RedditPostData> = self
            .get_json(&endpoint, access_token, &params)
            .await
            .map_err(|e| match e {
                CoreError::RedditApi(RedditApiError::NotFound { .. }) => {
                    CoreError::RedditApi(RedditApiError::SubredditNotFound {
                        subreddit: scope.to_string(),
                    })
                }
                other => other,
            })?;

        info!(
            "Retrieved {} posts from r/{} for {}",
            listing.data.children.len(),
            scope,
            query
        );
        Ok(listing)
    }

    /// Fetch the comment forest of a post as delivered in a single response.
    pub async fn get_comments(
        &self,
        access_token: &str,
        post_id: &str,
    ) -> Result<Vec<CommentThing>, CoreError> {
        let endpoint = format!("/comments/{}", post_id);
        let params = [
            ("sort", "confidence"),
            ("limit", COMMENT_LIMIT),
            ("raw_json", "1"),
        ];

        let (_post, comments): (IgnoredAny, CommentListing) = self
            .get_json(&endpoint, access_token, &params)
            .await
            .map_err(|e| match e {
                CoreError::RedditApi(RedditApiError::NotFound { .. }) => {
                    CoreError::RedditApi(RedditApiError::PostNotFound {
                        post_id: post_id.to_string(),
                    })
                }
                other => other,
            })?;

        debug!(
            "Retrieved {} top-level comment entries for {}",
            comments.data.children.len(),
            post_id
        );
        Ok(comments.data.children)
    }
}

fn status_error(status: StatusCode, response: &Response, endpoint: &str) -> RedditApiError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(60);
            warn!("Rate limited, retry after {} seconds", retry_after);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        StatusCode::UNAUTHORIZED => RedditApiError::InvalidToken,
        StatusCode::FORBIDDEN => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        StatusCode::NOT_FOUND => RedditApiError::NotFound {
            resource: endpoint.to_string(),
        },
        // Searches in unknown subreddits redirect to the subreddit search page
        status if status.is_redirection() => RedditApiError::NotFound {
            resource: endpoint.to_string(),
        },
        status if status.is_server_error() => RedditApiError::ServerError {
            status_code: status.as_u16(),
        },
        status => RedditApiError::UnexpectedStatus {
            status_code: status.as_u16(),
            endpoint: endpoint.to_string(),
        },
    }
}

impl From<RedditPostData> for Submission {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            id: post_data.id,
            title: post_data.title,
            author: known_author(post_data.author),
            subreddit: post_data.subreddit,
            score: post_data.score,
            permalink: post_data.permalink,
            created_utc: post_data.created_utc,
            is_self: post_data.is_self,
            selftext: post_data.selftext,
        }
    }
}

impl From<RedditCommentData> for Comment {
    fn from(comment_data: RedditCommentData) -> Self {
        Self {
            id: comment_data.id,
            author: known_author(comment_data.author),
            body: comment_data.body,
            score: comment_data.score,
            created_utc: comment_data.created_utc,
        }
    }
}

fn known_author(author: Option<String>) -> Option<String> {
    author.filter(|name| !name.is_empty() && name != "[deleted]")
}
