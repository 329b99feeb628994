pub mod flatten;

pub use flatten::{format_timestamp, keyword_matches, RecordBuilder};

use chrono::{Local, TimeZone};
use reddit_client::RedditClient;
use scraper_core::{
    Comment, ContentType, CoreError, ErrorExt, FailurePolicy, FlatRecord, RedditApiError,
    SearchOptions, Submission, TimeFilter,
};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Where search results and comment trees come from.
#[allow(async_fn_in_trait)]
pub trait SearchSource {
    /// Posts matching `query`, newest first, at most `limit` of them.
    async fn search(
        &self,
        scope: Option<&str>,
        query: &str,
        time_filter: TimeFilter,
        limit: u32,
    ) -> Result<Vec<Submission>, CoreError>;

    /// Comments delivered with `submission`, without expanding "load more"
    /// placeholders.
    async fn comments(&self, submission: &Submission) -> Result<Vec<Comment>, CoreError>;
}

impl SearchSource for RedditClient {
    async fn search(
        &self,
        scope: Option<&str>,
        query: &str,
        time_filter: TimeFilter,
        limit: u32,
    ) -> Result<Vec<Submission>, CoreError> {
        self.search_submissions(scope, query, time_filter, limit)
            .await
    }

    async fn comments(&self, submission: &Submission) -> Result<Vec<Comment>, CoreError> {
        self.fetch_comments(&submission.id).await
    }
}

#[derive(Debug, Default)]
pub struct SearchResults {
    pub records: Vec<FlatRecord>,
    /// Keyword searches or comment expansions skipped under
    /// `FailurePolicy::Continue`.
    pub failures: usize,
}

impl SearchResults {
    pub fn post_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.content_type == ContentType::Submission)
            .count()
    }
}

/// Errors that no later keyword or post can recover from.
fn aborts_run(error: &CoreError) -> bool {
    matches!(
        error,
        CoreError::RedditApi(
            RedditApiError::AuthenticationFailed { .. } | RedditApiError::InvalidToken
        ) | CoreError::Config(_)
    )
}

pub fn exact_phrase_query(keyword: &str) -> String {
    format!("\"{}\"", keyword)
}

pub struct KeywordSearch<'a, S, Tz: TimeZone = Local> {
    source: &'a S,
    options: SearchOptions,
    records: RecordBuilder<Tz>,
}

impl<'a, S: SearchSource> KeywordSearch<'a, S, Local> {
    pub fn new(source: &'a S, options: SearchOptions) -> Self {
        Self {
            source,
            options,
            records: RecordBuilder::local(),
        }
    }
}

impl<'a, S, Tz> KeywordSearch<'a, S, Tz>
where
    S: SearchSource,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn with_record_builder(
        source: &'a S,
        options: SearchOptions,
        records: RecordBuilder<Tz>,
    ) -> Self {
        Self {
            source,
            options,
            records,
        }
    }

    /// Search every keyword in order and flatten posts and matching comments.
    pub async fn run(&self, keywords: &[String]) -> Result<SearchResults, CoreError> {
        let mut results = SearchResults::default();

        for keyword in keywords {
            self.search_keyword(keyword, &mut results).await?;
        }

        info!(
            "Collected {} records ({} posts) for {} keywords",
            results.records.len(),
            results.post_count(),
            keywords.len()
        );
        Ok(results)
    }

    async fn search_keyword(
        &self,
        keyword: &str,
        results: &mut SearchResults,
    ) -> Result<(), CoreError> {
        let query = exact_phrase_query(keyword);
        let scope = self.options.subreddit.as_deref();
        info!(
            "Searching r/{} for {} (time: {}, limit: {})",
            scope.unwrap_or("all"),
            query,
            self.options.time_filter,
            self.options.limit
        );

        let submissions = match self
            .source
            .search(scope, &query, self.options.time_filter, self.options.limit)
            .await
        {
            Ok(submissions) => submissions,
            Err(error) => {
                return self.tolerate(error, results, || {
                    format!("search for keyword '{}'", keyword)
                })
            }
        };

        for submission in &submissions {
            results
                .records
                .push(self.records.post_record(keyword, submission));

            let comments = match self.source.comments(submission).await {
                Ok(comments) => comments,
                Err(error) => {
                    self.tolerate(error, results, || {
                        format!("comments of post {}", submission.id)
                    })?;
                    continue;
                }
            };

            let before = results.records.len();
            results.records.extend(
                comments
                    .iter()
                    .filter(|comment| keyword_matches(keyword, &comment.body))
                    .map(|comment| self.records.comment_record(keyword, submission, comment)),
            );
            debug!(
                "Post {}: {} of {} comments mention '{}'",
                submission.id,
                results.records.len() - before,
                comments.len(),
                keyword
            );
        }

        Ok(())
    }

    fn tolerate<F>(
        &self,
        error: CoreError,
        results: &mut SearchResults,
        describe: F,
    ) -> Result<(), CoreError>
    where
        F: FnOnce() -> String,
    {
        match self.options.failure_policy {
            FailurePolicy::Abort => Err(error),
            FailurePolicy::Continue if aborts_run(&error) => Err(error),
            FailurePolicy::Continue => {
                error.log_warn();
                warn!("Skipping {}", describe());
                results.failures += 1;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests;
