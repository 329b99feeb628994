use crate::error::CoreError;
use std::fmt;
use std::str::FromStr;

/// A post returned by a search, reduced to the fields the scraper reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    /// `None` when the account was deleted or suspended.
    pub author: Option<String>,
    pub subreddit: String,
    pub score: i64,
    pub permalink: String,
    pub created_utc: f64,
    pub is_self: bool,
    pub selftext: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    pub score: i64,
    pub created_utc: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Submission,
    Comment,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Submission => "submission",
            ContentType::Comment => "comment",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output row: either a matched post or a matching comment under it.
///
/// Comment rows carry the comment's own id in `post_id`, not the parent
/// post's id, so ids are only unique per `content_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub keyword: String,
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub score: i64,
    pub url: String,
    pub created_utc: String,
    pub post_id: String,
    pub is_self_post: bool,
    pub content: String,
    pub content_type: ContentType,
}

/// Recency window accepted by the search endpoint's `t` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    Hour,
    Day,
    #[default]
    Week,
    Month,
    Year,
    All,
}

impl TimeFilter {
    pub const ALL: [TimeFilter; 6] = [
        TimeFilter::Hour,
        TimeFilter::Day,
        TimeFilter::Week,
        TimeFilter::Month,
        TimeFilter::Year,
        TimeFilter::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Hour => "hour",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
            TimeFilter::All => "all",
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeFilter::ALL
            .into_iter()
            .find(|filter| filter.as_str() == s)
            .ok_or_else(|| CoreError::InvalidInput {
                message: format!(
                    "unknown time filter '{}', expected one of hour, day, week, month, year, all",
                    s
                ),
            })
    }
}

/// What the pipeline does when a keyword search or comment expansion fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Propagate the first failure and discard everything collected so far.
    #[default]
    Abort,
    /// Log the failure, count it and move on to the next item.
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Community to search in; `None` searches all of Reddit.
    pub subreddit: Option<String>,
    /// Maximum number of posts per keyword.
    pub limit: u32,
    pub time_filter: TimeFilter,
    pub failure_policy: FailurePolicy,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            subreddit: None,
            limit: 100,
            time_filter: TimeFilter::Week,
            failure_policy: FailurePolicy::Abort,
        }
    }
}
