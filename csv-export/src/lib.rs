use scraper_core::{CoreError, FlatRecord};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_OUTPUT_PATH: &str = "reddit_keyword_results.csv";

/// A row that knows its own named fields. Records in one export may expose
/// different field sets; missing fields become empty cells.
pub trait TabularRecord {
    fn fields(&self) -> Vec<(&'static str, String)>;
}

impl TabularRecord for FlatRecord {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("keyword", self.keyword.clone()),
            ("title", self.title.clone()),
            ("author", self.author.clone()),
            ("subreddit", self.subreddit.clone()),
            ("score", self.score.to_string()),
            ("url", self.url.clone()),
            ("created_utc", self.created_utc.clone()),
            ("post_id", self.post_id.clone()),
            ("is_self_post", render_bool(self.is_self_post).to_string()),
            ("content", self.content.clone()),
            ("content_type", self.content_type.as_str().to_string()),
        ]
    }
}

/// Booleans are written as `True`/`False` so existing consumers of the
/// output keep parsing it.
pub fn render_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    NoResults,
    Written {
        path: PathBuf,
        rows: usize,
        columns: Vec<String>,
    },
}

/// Union of the field names of all records, sorted.
pub fn column_names<R: TabularRecord>(records: &[R]) -> Vec<&'static str> {
    records
        .iter()
        .flat_map(|record| record.fields().into_iter().map(|(name, _)| name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Write `records` to `path` as CSV with a sorted header row. Nothing is
/// written when there are no records.
pub fn save_to_csv<R: TabularRecord>(
    records: &[R],
    path: impl AsRef<Path>,
) -> Result<ExportOutcome, CoreError> {
    let path = path.as_ref();
    if records.is_empty() {
        info!("No records to export, skipping {}", path.display());
        return Ok(ExportOutcome::NoResults);
    }

    let columns = column_names(records);
    debug!("Exporting {} columns: {:?}", columns.len(), columns);

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_path(path)?;
    writer.write_record(&columns)?;

    for record in records {
        let mut values: HashMap<&'static str, String> = record.fields().into_iter().collect();
        let row: Vec<String> = columns
            .iter()
            .map(|column| values.remove(column).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(ExportOutcome::Written {
        path: path.to_path_buf(),
        rows: records.len(),
        columns: columns.into_iter().map(str::to_string).collect(),
    })
}
