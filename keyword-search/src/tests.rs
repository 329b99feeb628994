use crate::flatten::DELETED_AUTHOR;
use crate::{KeywordSearch, RecordBuilder, SearchSource};
use chrono::Utc;
use scraper_core::{
    Comment, ContentType, CoreError, FailurePolicy, RedditApiError, SearchOptions, Submission,
    TimeFilter,
};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct FakeSource {
    posts: HashMap<String, Vec<Submission>>,
    comments: HashMap<String, Vec<Comment>>,
    failing_queries: Vec<String>,
    failing_posts: Vec<String>,
    rejects_credentials: bool,
    searches: Mutex<Vec<(Option<String>, String, TimeFilter, u32)>>,
}

impl FakeSource {
    fn with_posts(mut self, query: &str, posts: Vec<Submission>) -> Self {
        self.posts.insert(query.to_string(), posts);
        self
    }

    fn with_comments(mut self, post_id: &str, comments: Vec<Comment>) -> Self {
        self.comments.insert(post_id.to_string(), comments);
        self
    }
}

impl SearchSource for FakeSource {
    async fn search(
        &self,
        scope: Option<&str>,
        query: &str,
        time_filter: TimeFilter,
        limit: u32,
    ) -> Result<Vec<Submission>, CoreError> {
        self.searches.lock().unwrap().push((
            scope.map(str::to_string),
            query.to_string(),
            time_filter,
            limit,
        ));
        if self.rejects_credentials {
            return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: "invalid_client".to_string(),
            }));
        }
        if self.failing_queries.iter().any(|q| q == query) {
            return Err(CoreError::RedditApi(RedditApiError::ServerError {
                status_code: 503,
            }));
        }
        let mut posts = self.posts.get(query).cloned().unwrap_or_default();
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn comments(&self, submission: &Submission) -> Result<Vec<Comment>, CoreError> {
        if self.failing_posts.contains(&submission.id) {
            return Err(CoreError::RedditApi(RedditApiError::PostNotFound {
                post_id: submission.id.clone(),
            }));
        }
        Ok(self
            .comments
            .get(&submission.id)
            .cloned()
            .unwrap_or_default())
    }
}

fn post(id: &str, author: Option<&str>) -> Submission {
    Submission {
        id: id.to_string(),
        title: format!("Title {}", id),
        author: author.map(str::to_string),
        subreddit: "programming".to_string(),
        score: 7,
        permalink: format!("/r/programming/comments/{}/title/", id),
        created_utc: 1640995200.0,
        is_self: true,
        selftext: format!("Body of {}", id),
    }
}

fn comment(id: &str, body: &str) -> Comment {
    Comment {
        id: id.to_string(),
        author: Some("commenter".to_string()),
        body: body.to_string(),
        score: 1,
        created_utc: 1640995260.0,
    }
}

fn keywords(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

fn options(limit: u32, time_filter: TimeFilter) -> SearchOptions {
    SearchOptions {
        subreddit: None,
        limit,
        time_filter,
        failure_policy: FailurePolicy::Abort,
    }
}

fn search<'a>(source: &'a FakeSource, options: SearchOptions) -> KeywordSearch<'a, FakeSource, Utc> {
    KeywordSearch::with_record_builder(source, options, RecordBuilder::with_timezone(Utc))
}

#[tokio::test]
async fn test_foo_bar_scenario() {
    let source = FakeSource::default()
        .with_posts("\"foo\"", vec![post("p1", Some("a")), post("p2", Some("b")), post("p3", None)])
        .with_posts("\"bar\"", vec![post("p4", Some("c"))])
        .with_comments(
            "p1",
            vec![comment("c1", "FOO is great"), comment("c2", "unrelated")],
        )
        .with_comments("p4", vec![comment("c3", "a BaR walks in"), comment("c4", "foo only")]);

    let results = search(&source, options(2, TimeFilter::Day))
        .run(&keywords(&["foo", "bar"]))
        .await
        .unwrap();

    assert!(results.post_count() <= 2 * 2);
    assert_eq!(results.post_count(), 3);
    assert_eq!(results.failures, 0);

    for record in results
        .records
        .iter()
        .filter(|r| r.content_type == ContentType::Comment)
    {
        assert!(record
            .content
            .to_lowercase()
            .contains(&record.keyword.to_lowercase()));
    }

    let summary: Vec<(&str, &str, ContentType)> = results
        .records
        .iter()
        .map(|r| (r.keyword.as_str(), r.post_id.as_str(), r.content_type))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("foo", "p1", ContentType::Submission),
            ("foo", "c1", ContentType::Comment),
            ("foo", "p2", ContentType::Submission),
            ("bar", "p4", ContentType::Submission),
            ("bar", "c3", ContentType::Comment),
        ]
    );

    let searches = source.searches.lock().unwrap();
    assert_eq!(
        *searches,
        vec![
            (None, "\"foo\"".to_string(), TimeFilter::Day, 2),
            (None, "\"bar\"".to_string(), TimeFilter::Day, 2),
        ]
    );
}

#[tokio::test]
async fn test_subreddit_scope_is_passed_through() {
    let source = FakeSource::default();
    let mut opts = options(10, TimeFilter::Week);
    opts.subreddit = Some("rust".to_string());

    let results = search(&source, opts).run(&keywords(&["x"])).await.unwrap();

    assert!(results.records.is_empty());
    let searches = source.searches.lock().unwrap();
    assert_eq!(searches[0].0.as_deref(), Some("rust"));
}

#[tokio::test]
async fn test_duplicate_keywords_are_not_deduplicated() {
    let source = FakeSource::default()
        .with_posts("\"rust\"", vec![post("p1", Some("a"))])
        .with_comments("p1", vec![comment("c1", "rust")]);

    let results = search(&source, options(5, TimeFilter::All))
        .run(&keywords(&["rust", "rust"]))
        .await
        .unwrap();

    assert_eq!(results.records.len(), 4);
    assert_eq!(results.post_count(), 2);
}

#[tokio::test]
async fn test_deleted_post_author_never_fails() {
    let source = FakeSource::default().with_posts("\"ghost\"", vec![post("p1", None)]);

    let results = search(&source, options(5, TimeFilter::Week))
        .run(&keywords(&["ghost"]))
        .await
        .unwrap();

    assert_eq!(results.records[0].author, DELETED_AUTHOR);
}

#[tokio::test]
async fn test_failure_aborts_by_default() {
    let mut source = FakeSource::default()
        .with_posts("\"ok\"", vec![post("p1", Some("a"))])
        .with_posts("\"later\"", vec![post("p2", Some("b"))]);
    source.failing_queries.push("\"broken\"".to_string());

    let error = search(&source, options(5, TimeFilter::Week))
        .run(&keywords(&["ok", "broken", "later"]))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CoreError::RedditApi(RedditApiError::ServerError { status_code: 503 })
    ));
    // Nothing is searched after the failing keyword
    assert_eq!(source.searches.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_keep_going_skips_failed_items() {
    let mut source = FakeSource::default()
        .with_posts("\"ok\"", vec![post("p1", Some("a")), post("p2", Some("b"))])
        .with_posts("\"later\"", vec![post("p3", Some("c"))])
        .with_comments("p2", vec![comment("c1", "ok then")]);
    source.failing_queries.push("\"broken\"".to_string());
    source.failing_posts.push("p1".to_string());

    let mut opts = options(5, TimeFilter::Week);
    opts.failure_policy = FailurePolicy::Continue;

    let results = search(&source, opts)
        .run(&keywords(&["ok", "broken", "later"]))
        .await
        .unwrap();

    assert_eq!(results.failures, 2);
    let ids: Vec<&str> = results.records.iter().map(|r| r.post_id.as_str()).collect();
    // p1's post row survives even though its comments could not be loaded
    assert_eq!(ids, vec!["p1", "p2", "c1", "p3"]);
}

#[tokio::test]
async fn test_keep_going_still_stops_on_rejected_credentials() {
    let source = FakeSource {
        rejects_credentials: true,
        ..Default::default()
    };
    let mut opts = options(5, TimeFilter::Week);
    opts.failure_policy = FailurePolicy::Continue;

    let error = search(&source, opts)
        .run(&keywords(&["foo", "bar"]))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CoreError::RedditApi(RedditApiError::AuthenticationFailed { .. })
    ));
    assert_eq!(source.searches.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_keep_going_stops_on_invalid_token_during_comments() {
    let source = FakeSource::default()
        .with_posts("\"foo\"", vec![post("p1", Some("a")), post("p2", Some("b"))]);
    let source = ExpiringTokenSource(source);
    let mut opts = options(5, TimeFilter::Week);
    opts.failure_policy = FailurePolicy::Continue;

    let error = KeywordSearch::with_record_builder(&source, opts, RecordBuilder::with_timezone(Utc))
        .run(&keywords(&["foo"]))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CoreError::RedditApi(RedditApiError::InvalidToken)
    ));
}

/// Searches succeed but every comment fetch reports a rejected token.
struct ExpiringTokenSource(FakeSource);

impl SearchSource for ExpiringTokenSource {
    async fn search(
        &self,
        scope: Option<&str>,
        query: &str,
        time_filter: TimeFilter,
        limit: u32,
    ) -> Result<Vec<Submission>, CoreError> {
        self.0.search(scope, query, time_filter, limit).await
    }

    async fn comments(&self, _submission: &Submission) -> Result<Vec<Comment>, CoreError> {
        Err(CoreError::RedditApi(RedditApiError::InvalidToken))
    }
}

#[tokio::test]
async fn test_zero_limit_yields_no_records() {
    let source = FakeSource::default().with_posts("\"foo\"", vec![post("p1", Some("a"))]);

    let results = search(&source, options(0, TimeFilter::Week))
        .run(&keywords(&["foo"]))
        .await
        .unwrap();

    assert!(results.records.is_empty());
    assert_eq!(results.failures, 0);
}

#[tokio::test]
async fn test_empty_keyword_matches_every_comment() {
    let source = FakeSource::default()
        .with_posts("\"\"", vec![post("p1", Some("a"))])
        .with_comments("p1", vec![comment("c1", "one"), comment("c2", "two")]);

    let results = search(&source, options(5, TimeFilter::Week))
        .run(&keywords(&[""]))
        .await
        .unwrap();

    assert_eq!(results.records.len(), 3);
}
