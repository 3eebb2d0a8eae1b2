use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bigrams::augment;
use crate::config::PreprocessingConfig;
use crate::csv_records::{join_unlabeled_lines, split_records, ParseStrategy};
use crate::error::Result;
use crate::label::SentimentLabel;
use crate::normalize::{normalize, strip_quotes};
use crate::tokenize::{tokenize, Language};

/// Training example with canonical label and cleaned text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
  pub label: SentimentLabel,
  pub text: String,
}

/// Ordered diagnostics gathered while processing a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessLog {
  lines: Vec<String>,
}

impl ProcessLog {
  pub fn info(&mut self, msg: impl Into<String>) {
    let msg: String = msg.into();
    tracing::info!("{}", msg);
    self.lines.push(msg);
  }

  pub fn skip(&mut self, msg: impl Into<String>) {
    let msg: String = msg.into();
    tracing::warn!("{}", msg);
    self.lines.push(msg);
  }

  pub fn lines(&self) -> &[String] {
    &self.lines
  }
}

/// Result of preparing a training file
#[derive(Debug, Clone)]
pub struct PreparedDataset {
  pub language: Language,
  pub examples: Vec<LabeledExample>,
  pub label_counts: BTreeMap<SentimentLabel, usize>,
  pub log: ProcessLog,
}

impl PreparedDataset {
  /// First `n` examples, label and up to 80 characters of text
  pub fn preview(&self, n: usize) -> Vec<String> {
    self
      .examples
      .iter()
      .take(n)
      .map(|ex| format!("{} - {}", ex.label, ex.text.chars().take(80).collect::<String>()))
      .collect()
  }

  /// Cleaned dataset as pretty JSON `[{label, text}]`
  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(&self.examples)?)
  }
}

/// Why a training line was not turned into an example
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRejection {
  NoDelimiter,
  UnknownLabel(String),
  EmptyAfterCleaning,
}

/// Preprocess Text
/// Full cleaning pipeline for one comment: normalize, drop stopwords, add bigrams.
/// Returns the space-joined tokens, possibly empty.
pub fn preprocess_text(raw: &str, language: Language, keep_short: bool) -> String {
  preprocess_tokens(raw, language, keep_short).join(" ")
}

pub fn preprocess_tokens(raw: &str, language: Language, keep_short: bool) -> Vec<String> {
  let normalized: String = normalize(strip_quotes(raw));
  augment(tokenize(&normalized, language, keep_short))
}

pub struct DataPreprocessor {
  pub config: PreprocessingConfig,
}

impl DataPreprocessor {
  pub fn new(config: PreprocessingConfig) -> Self {
    Self { config }
  }

  /// Entry function for data preprocessing
  /// Turns a raw training file into labeled examples. Bad lines are logged
  /// and skipped; only an undetectable language is an error.
  pub fn process(&self, raw: &str) -> Result<PreparedDataset> {
    let mut log: ProcessLog = ProcessLog::default();

    let mut records: Vec<String> = split_records(raw);
    if self.config.join_unlabeled_lines {
      records = join_unlabeled_lines(records);
    }

    let language: Language = match self.config.language {
      Some(language) => language,
      None => {
        let detected: Language = Language::detect(&records)?;
        log.info(format!("Detected language: {:?}", detected));
        detected
      }
    };
    log.info(format!("File loaded. {} data lines.", records.len()));

    let mut examples: Vec<LabeledExample> = Vec::new();
    let mut label_counts: BTreeMap<SentimentLabel, usize> = BTreeMap::new();

    for (i, line) in records.iter().enumerate() {
      match self.parse_training_line(line.trim(), language) {
        Ok(example) => {
          *label_counts.entry(example.label).or_insert(0) += 1;
          examples.push(example);
        }
        Err(LineRejection::NoDelimiter) => {
          log.skip(format!("Line {} skipped: needs \"sentiment,comment\" or \"sentiment;comment\" format", i + 1));
        }
        Err(LineRejection::UnknownLabel(label)) => {
          log.skip(format!("Line {} skipped: unknown label \"{}\"", i + 1, label));
        }
        Err(LineRejection::EmptyAfterCleaning) => {
          log.skip(format!("Line {} skipped: empty after cleaning", i + 1));
        }
      }
    }

    log.info(format!("Processing finished. {} valid examples.", examples.len()));
    for (label, count) in &label_counts {
      log.info(format!("  {}: {}", label, count));
    }

    Ok(PreparedDataset { language, examples, label_counts, log })
  }

  /// Tries each strategy in order; the first whose label is canonical wins.
  /// An unknown label is reported from the first strategy that could split.
  pub fn parse_training_line(&self, line: &str, language: Language) -> std::result::Result<LabeledExample, LineRejection> {
    let mut first_label: Option<String> = None;

    for strategy in ParseStrategy::ORDER {
      let (label_raw, text_raw) = match strategy.split(line) {
        Some(parts) => parts,
        None => continue,
      };
      let label: SentimentLabel = match SentimentLabel::canonicalize(&label_raw) {
        Some(label) => label,
        None => {
          first_label.get_or_insert(label_raw.to_lowercase());
          continue;
        }
      };

      let text: String = preprocess_text(&text_raw, language, self.config.keep_short_tokens);
      if text.trim().is_empty() {
        return Err(LineRejection::EmptyAfterCleaning);
      }
      return Ok(LabeledExample { label, text });
    }

    match first_label {
      Some(label) => Err(LineRejection::UnknownLabel(label)),
      None => Err(LineRejection::NoDelimiter),
    }
  }
}

/// Perform train, test, split on your data, keeping input order
pub fn train_test_split<T: Clone>(data: &[T], train_size: f32) -> (Vec<T>, Vec<T>) {
  let train_len: usize = ((data.len() as f32 * train_size).floor() as usize).min(data.len());
  (data[..train_len].to_vec(), data[train_len..].to_vec())
}
