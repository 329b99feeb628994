use crate::error::*;
use std::time::Duration;
use tracing::{error, warn};

/// Logging and classification helpers shared by every error type.
pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    /// Whether repeating the same request may succeed.
    fn is_retryable(&self) -> bool;
    /// Delay the server asked for before the next attempt.
    fn retry_after(&self) -> Option<Duration>;
    /// Message shown to the person running the tool.
    fn user_friendly_message(&self) -> String;
    /// Stable identifier attached to log events.
    fn error_code(&self) -> &'static str;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        match self {
            CoreError::RedditApi(e) => {
                error!(code = self.error_code(), detail = ?e, "{}", self);
            }
            CoreError::Config(e) => {
                error!(code = self.error_code(), detail = ?e, "{}", self);
            }
            _ => error!(code = self.error_code(), "{}", self),
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Could not reach Reddit. Check your internet connection.".to_string()
            }
            CoreError::Io(e) => format!("Could not access the file system: {}", e),
            CoreError::Csv(e) => format!("Could not write the CSV output: {}", e),
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::Serialization(_) => {
                "Reddit returned data in an unexpected format.".to_string()
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API",
            CoreError::Config(_) => "CONFIG",
            CoreError::Io(_) => "IO",
            CoreError::Csv(_) => "CSV",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!(code = self.error_code(), "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            RedditApiError::RateLimitExceeded { .. }
                | RedditApiError::RequestTimeout
                | RedditApiError::ServerError { .. }
                // Reddit occasionally serves truncated or HTML bodies under load
                | RedditApiError::InvalidResponse { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } | RedditApiError::InvalidToken => {
                "Reddit rejected the app credentials. Check REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET."
                    .to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Reddit is rate limiting requests. Wait {} seconds and try again.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => format!(
                "Access denied to {}. The subreddit may be private or quarantined.",
                resource
            ),
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("Subreddit r/{} does not exist or is private.", subreddit)
            }
            RedditApiError::PostNotFound { post_id } => {
                format!("Post {} is gone. It may have been removed.", post_id)
            }
            RedditApiError::RequestTimeout => {
                "Reddit did not answer in time. Try again later.".to_string()
            }
            other => format!("Reddit request failed: {}", other),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED",
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT",
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN",
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND",
            RedditApiError::PostNotFound { .. } => "REDDIT_POST_NOT_FOUND",
            RedditApiError::NotFound { .. } => "REDDIT_NOT_FOUND",
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN",
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT",
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE",
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR",
            RedditApiError::UnexpectedStatus { .. } => "REDDIT_UNEXPECTED_STATUS",
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!(code = self.error_code(), "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "{} is not set. Export it or add it to a .env file.",
                var_name
            ),
            ConfigError::InvalidValue { field, value } => {
                format!("'{}' is not a valid value for {}.", value, field)
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
        }
    }
}
