use serde::Serialize;

use crate::config::ColumnConfig;
use crate::csv_records::{parse_line, split_records, ColumnMapping};

/// Bucket for comments without a usable category
pub const UNCATEGORIZED: &str = "sem_categoria";

/// Slash-separated category: the first entry is primary, the rest secondary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPath {
  pub primary: String,
  pub secondary: Vec<String>,
}

impl CategoryPath {
  pub fn parse(raw: &str) -> Self {
    let lowered: String = raw.trim().to_lowercase();
    let mut parts = lowered.split('/').map(str::trim);
    let primary: String = parts.next().filter(|p| !p.is_empty()).unwrap_or(UNCATEGORIZED).to_string();
    let secondary: Vec<String> = parts.filter(|s| !s.is_empty()).map(String::from).collect();
    Self { primary, secondary }
  }

  pub fn uncategorized() -> Self {
    Self { primary: UNCATEGORIZED.to_string(), secondary: Vec::new() }
  }
}

/// One comment of a feedback export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackRow {
  pub comment: String,
  pub category: CategoryPath,
}

/// Parse Feedback Csv
/// Reads a delimited export with a header row, picking the comment and
/// category columns from header keywords. Short comments are dropped and
/// missing or overlong categories fall into the uncategorized bucket.
pub fn parse_feedback_csv(raw: &str, columns: &ColumnConfig) -> Vec<FeedbackRow> {
  let records: Vec<String> = split_records(raw);
  tracing::info!("{} feedback records", records.len());
  if records.len() < 2 {
    return Vec::new();
  }

  let header: Vec<String> = parse_line(&records[0], columns.delimiter);
  let mapping: ColumnMapping = ColumnMapping::detect(&header, &columns.rules);

  let mut rows: Vec<FeedbackRow> = Vec::new();
  for record in &records[1..] {
    let cols: Vec<String> = parse_line(record, columns.delimiter);

    let comment: String = cols.get(mapping.comment).map(|c| trim_field(c)).unwrap_or_default();
    if comment.chars().count() <= columns.min_comment_chars {
      continue;
    }

    let category_raw: String = mapping
      .category
      .and_then(|idx| cols.get(idx))
      .map(|c| trim_field(c).to_lowercase())
      .unwrap_or_default();
    let category: CategoryPath = if category_raw.is_empty() || category_raw.chars().count() > columns.max_category_chars {
      CategoryPath::uncategorized()
    } else {
      CategoryPath::parse(&category_raw)
    };

    rows.push(FeedbackRow { comment, category });
  }

  tracing::info!("{} feedback comments parsed", rows.len());
  rows
}

fn trim_field(field: &str) -> String {
  field.trim().trim_matches('"').trim().to_string()
}
