use scraper_core::{ConfigError, CoreError, ErrorExt, RedditApiError};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "REDDIT_CLIENT_ID".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let input_error = CoreError::InvalidInput {
        message: "bad".to_string(),
    };
    assert_eq!(input_error.error_code(), "INVALID_INPUT");

    assert_eq!(
        RedditApiError::SubredditNotFound {
            subreddit: "nope".to_string()
        }
        .error_code(),
        "REDDIT_SUBREDDIT_NOT_FOUND"
    );
}

#[test]
fn test_retryable_errors() {
    let retryable_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert!(retryable_error.is_retryable());

    let server_error = CoreError::RedditApi(RedditApiError::ServerError { status_code: 503 });
    assert!(server_error.is_retryable());

    let auth_error = CoreError::RedditApi(RedditApiError::AuthenticationFailed {
        reason: "invalid_client".to_string(),
    });
    assert!(!auth_error.is_retryable());

    let non_retryable_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "REDDIT_CLIENT_SECRET".to_string(),
    });
    assert!(!non_retryable_error.is_retryable());
}

#[test]
fn test_network_style_errors_are_retryable() {
    assert!(CoreError::RedditApi(RedditApiError::RequestTimeout).is_retryable());
    assert!(CoreError::RedditApi(RedditApiError::InvalidResponse {
        details: "truncated body".to_string()
    })
    .is_retryable());

    let forbidden = CoreError::RedditApi(RedditApiError::Forbidden {
        resource: "/r/private/search".to_string(),
    });
    assert!(!forbidden.is_retryable());
    assert_eq!(forbidden.retry_after(), None);

    let rate_limited = CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(60)));

    let io_error = CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
    assert!(!io_error.is_retryable());
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::AuthenticationFailed {
        reason: "401".to_string(),
    });
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("REDDIT_CLIENT_ID"));

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "REDDIT_CLIENT_SECRET".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("REDDIT_CLIENT_SECRET"));

    let missing = CoreError::RedditApi(RedditApiError::SubredditNotFound {
        subreddit: "doesnotexist".to_string(),
    });
    assert!(missing.user_friendly_message().contains("r/doesnotexist"));
}

#[test]
fn test_log_helpers_return_self() {
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);
    // Only checks that logging without a subscriber is harmless
    assert_eq!(error.log_error().error_code(), "REDDIT_API");
    assert_eq!(error.log_warn().error_code(), "REDDIT_API");
}
