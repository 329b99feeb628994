use clap::Parser;
use csv_export::DEFAULT_OUTPUT_PATH;
use scraper_core::{FailurePolicy, SearchOptions, TimeFilter};
use std::path::PathBuf;

/// Search Reddit for keyword mentions and save them to CSV.
#[derive(Debug, Parser)]
#[command(name = "reddit-keyword-scraper", version, about)]
pub struct Args {
    /// Comma-separated list of keywords to search for
    #[arg(short, long)]
    pub keywords: String,

    /// Limit the search to one subreddit
    #[arg(short, long)]
    pub subreddit: Option<String>,

    /// Maximum number of posts per keyword
    #[arg(short, long, default_value_t = 100)]
    pub limit: u32,

    /// Time window: hour, day, week, month, year or all
    #[arg(short, long = "time", default_value = "week")]
    pub time_filter: TimeFilter,

    /// Output CSV file
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Skip keywords or posts that fail instead of stopping
    #[arg(long)]
    pub keep_going: bool,
}

impl Args {
    pub fn keyword_list(&self) -> Vec<String> {
        parse_keywords(&self.keywords)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            subreddit: self.subreddit.clone(),
            limit: self.limit,
            time_filter: self.time_filter,
            failure_policy: if self.keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            },
        }
    }
}

/// Splits on commas and trims each entry. Empty entries are kept.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',').map(|k| k.trim().to_string()).collect()
}
