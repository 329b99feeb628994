use chrono::{DateTime, Local, TimeZone};
use scraper_core::{Comment, ContentType, FlatRecord, Submission};
use std::fmt::Display;

pub const REDDIT_WEB_BASE: &str = "https://www.reddit.com";
pub const DELETED_AUTHOR: &str = "[deleted]";
pub const EXTERNAL_LINK_CONTENT: &str = "[External link]";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` in `tz`. Sub-second parts
/// are dropped; out-of-range values render as an empty string.
pub fn format_timestamp<Tz>(created_utc: f64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::from_timestamp(created_utc.floor() as i64, 0)
        .map(|utc| utc.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

pub fn keyword_matches(keyword: &str, text: &str) -> bool {
    text.to_lowercase().contains(&keyword.to_lowercase())
}

fn author_or_deleted(author: &Option<String>) -> String {
    author
        .clone()
        .unwrap_or_else(|| DELETED_AUTHOR.to_string())
}

/// Builds records with timestamps rendered in a fixed time zone.
#[derive(Debug, Clone)]
pub struct RecordBuilder<Tz: TimeZone = Local> {
    tz: Tz,
}

impl RecordBuilder<Local> {
    pub fn local() -> Self {
        Self { tz: Local }
    }
}

impl<Tz> RecordBuilder<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn with_timezone(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn post_record(&self, keyword: &str, submission: &Submission) -> FlatRecord {
        let content = if submission.is_self && !submission.selftext.is_empty() {
            submission.selftext.clone()
        } else {
            EXTERNAL_LINK_CONTENT.to_string()
        };

        FlatRecord {
            keyword: keyword.to_string(),
            title: submission.title.clone(),
            author: author_or_deleted(&submission.author),
            subreddit: submission.subreddit.clone(),
            score: submission.score,
            url: format!("{}{}", REDDIT_WEB_BASE, submission.permalink),
            created_utc: format_timestamp(submission.created_utc, &self.tz),
            post_id: submission.id.clone(),
            is_self_post: submission.is_self,
            content,
            content_type: ContentType::Submission,
        }
    }

    /// The comment's own id goes into `post_id`; the parent post is only
    /// identifiable through `url`.
    pub fn comment_record(
        &self,
        keyword: &str,
        submission: &Submission,
        comment: &Comment,
    ) -> FlatRecord {
        FlatRecord {
            keyword: keyword.to_string(),
            title: submission.title.clone(),
            author: author_or_deleted(&comment.author),
            subreddit: submission.subreddit.clone(),
            score: comment.score,
            url: format!("{}{}{}/", REDDIT_WEB_BASE, submission.permalink, comment.id),
            created_utc: format_timestamp(comment.created_utc, &self.tz),
            post_id: comment.id.clone(),
            is_self_post: true,
            content: comment.body.clone(),
            content_type: ContentType::Comment,
        }
    }
}
