mod cli;

use clap::Parser;
use cli::Args;
use csv_export::{save_to_csv, ExportOutcome};
use keyword_search::KeywordSearch;
use reddit_client::{RedditClient, RedditCredentials};
use scraper_core::{CoreError, ErrorExt};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "reddit_keyword_scraper=info,scraper_core=info,reddit_client=info,keyword_search=info,csv_export=info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Reddit keyword scraper");

    if let Err(error) = run(args).await {
        error.log_error();
        anyhow::bail!(error.user_friendly_message());
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), CoreError> {
    let keywords = args.keyword_list();
    let options = args.search_options();

    println!("Searching Reddit for: {}", keywords.join(", "));
    match &options.subreddit {
        Some(subreddit) => println!("In subreddit: r/{}", subreddit),
        None => println!("Across all of Reddit"),
    }

    let credentials = RedditCredentials::from_env()?;
    let client = RedditClient::new(credentials)?;

    let results = KeywordSearch::new(&client, options).run(&keywords).await?;

    let stats = client.retry_stats();
    tracing::debug!(
        "Retries: {} total, {} recovered, {} exhausted",
        stats.total_retries,
        stats.successful_retries,
        stats.exhausted
    );
    if results.failures > 0 {
        tracing::warn!("{} searches or comment fetches were skipped", results.failures);
    }

    println!("Found {} mentions", results.records.len());

    match save_to_csv(&results.records, &args.output)? {
        ExportOutcome::NoResults => println!("No results found."),
        ExportOutcome::Written { path, .. } => println!("Results saved to {}", path.display()),
    }

    Ok(())
}
