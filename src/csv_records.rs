use serde::{Deserialize, Serialize};

/// Split Records
/// Breaks raw text into logical records. Line breaks inside a quoted field
/// belong to the record; blank records are dropped. Quotes are kept.
pub fn split_records(raw: &str) -> Vec<String> {
  let mut records: Vec<String> = Vec::new();
  let mut current: String = String::new();
  let mut in_quotes: bool = false;

  for ch in raw.chars() {
    match ch {
      '"' => {
        in_quotes = !in_quotes;
        current.push(ch);
      }
      '\n' | '\r' if !in_quotes => {
        if !current.trim().is_empty() { records.push(std::mem::take(&mut current)); }
        current.clear();
      }
      _ => current.push(ch),
    }
  }
  if !current.trim().is_empty() { records.push(current); }

  records
}

/// Parse Line
/// Splits one record on `delimiter` outside quotes. Quote characters toggle
/// the quoted state and are dropped from the field text.
pub fn parse_line(record: &str, delimiter: char) -> Vec<String> {
  let mut columns: Vec<String> = Vec::new();
  let mut column: String = String::new();
  let mut in_quotes: bool = false;

  for ch in record.chars() {
    if ch == '"' {
      in_quotes = !in_quotes;
    } else if ch == delimiter && !in_quotes {
      columns.push(std::mem::take(&mut column));
    } else {
      column.push(ch);
    }
  }
  columns.push(column);

  columns
}

/// Glues lines that do not open with a sentiment label onto the previous
/// record, for training files whose comments break lines without quoting.
pub fn join_unlabeled_lines(records: Vec<String>) -> Vec<String> {
  let mut joined: Vec<String> = Vec::with_capacity(records.len());
  for record in records {
    let continues: bool = !crate::label::starts_with_label(&record);
    match joined.last_mut() {
      Some(previous) if continues => {
        previous.push(' ');
        previous.push_str(record.trim());
      }
      _ => joined.push(record.trim().to_string()),
    }
  }
  joined
}

/// Ordered fallback policy for `label<sep>text` training lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
  /// `label,text`: everything after the first comma is text, commas included
  TwoColumnCsv,
  /// `label;text`: split on the first semicolon only
  SemicolonFallback,
}

impl ParseStrategy {
  pub const ORDER: [ParseStrategy; 2] = [ParseStrategy::TwoColumnCsv, ParseStrategy::SemicolonFallback];

  /// Raw `(label, text)` halves, or `None` when the line lacks the delimiter
  pub fn split(self, line: &str) -> Option<(String, String)> {
    match self {
      ParseStrategy::TwoColumnCsv => {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 2 { return None; }
        Some((fields[0].trim().to_string(), fields[1..].join(",").trim().to_string()))
      }
      ParseStrategy::SemicolonFallback => line
        .split_once(';')
        .map(|(label, text)| (label.trim().to_string(), text.trim().to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
  Comment,
  Category,
}

/// Header keywords that mark a column as playing `role`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRule {
  pub role: ColumnRole,
  pub keywords: Vec<String>,
}

impl ColumnRule {
  pub fn new(role: ColumnRole, keywords: &[&str]) -> Self {
    Self { role, keywords: keywords.iter().map(|k| k.to_string()).collect() }
  }

  /// Default header heuristics for hospital feedback exports
  pub fn defaults() -> Vec<ColumnRule> {
    vec![
      ColumnRule::new(ColumnRole::Comment, &["coment", "texto", "reclama"]),
      ColumnRule::new(ColumnRole::Category, &["categ", "class", "label"]),
    ]
  }

  fn matches(&self, header: &str) -> bool {
    self.keywords.iter().any(|k| header.contains(&k.to_lowercase()))
  }
}

/// Column indices detected from a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
  pub comment: usize,
  pub category: Option<usize>,
}

impl ColumnMapping {
  /// Detect Columns
  /// First header containing one of a role's keywords wins (case-insensitive).
  /// No comment match means column 0; no category match means no category.
  pub fn detect<S: AsRef<str>>(header: &[S], rules: &[ColumnRule]) -> Self {
    let headers: Vec<String> = header.iter().map(|h| h.as_ref().trim().to_lowercase()).collect();
    let find = |role: ColumnRole| -> Option<usize> {
      let role_rules: Vec<&ColumnRule> = rules.iter().filter(|r| r.role == role).collect();
      headers.iter().position(|h| role_rules.iter().any(|r| r.matches(h)))
    };

    let mapping: ColumnMapping = ColumnMapping {
      comment: find(ColumnRole::Comment).unwrap_or(0),
      category: find(ColumnRole::Category),
    };
    tracing::debug!(comment = mapping.comment, category = ?mapping.category, "detected feedback columns");
    mapping
  }
}
