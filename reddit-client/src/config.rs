use scraper_core::{ConfigError, CoreError};
use std::env;

pub const CLIENT_ID_VAR: &str = "REDDIT_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "REDDIT_CLIENT_SECRET";
pub const USER_AGENT_VAR: &str = "REDDIT_USER_AGENT";
pub const DEFAULT_USER_AGENT: &str = "KeywordScraper v1.0 by /u/YourUsername";

/// Credentials for Reddit's application-only OAuth flow.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl RedditCredentials {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client_id,
            client_secret,
            user_agent,
        }
    }

    /// Load credentials from the process environment, reading a `.env` file
    /// first when one exists.
    pub fn from_env() -> Result<Self, CoreError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                    var_name: name.to_string(),
                })
        };

        let client_id = required(CLIENT_ID_VAR)?;
        let client_secret = required(CLIENT_SECRET_VAR)?;
        let user_agent = lookup(USER_AGENT_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Ok(Self::new(client_id, client_secret, user_agent))
    }
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
