use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

use crate::config::ReportConfig;
use crate::error::Result;
use crate::feedback::FeedbackRow;
use crate::label::SentimentLabel;
use crate::model::Prediction;
use crate::tokenize::display_tokens;

/// Bucket collecting every category outside the top N
pub const OTHERS: &str = "outros";

/// A feedback comment with its predicted sentiment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRow {
  pub comment: String,
  pub category: String,
  pub predicted: SentimentLabel,
  pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
  pub negative: usize,
  pub neutral: usize,
  pub positive: usize,
}

impl SentimentCounts {
  pub fn add(&mut self, label: SentimentLabel) {
    match label {
      SentimentLabel::Negative => self.negative += 1,
      SentimentLabel::Neutral => self.neutral += 1,
      SentimentLabel::Positive => self.positive += 1,
    }
  }

  pub fn merge(&mut self, other: &SentimentCounts) {
    self.negative += other.negative;
    self.neutral += other.neutral;
    self.positive += other.positive;
  }

  pub fn total(&self) -> usize {
    self.negative + self.neutral + self.positive
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
  pub label: String,
  pub sentiment: SentimentCounts,
  pub secondary_mentions: usize,
  /// Share of all analysed comments, 0 to 100
  pub percent: f32,
}

impl CategorySummary {
  pub fn total(&self) -> usize {
    self.sentiment.total()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCount {
  pub word: String,
  pub count: usize,
}

/// Sentiment per category of a classified feedback export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackReport {
  pub total_comments: usize,
  pub overall: SentimentCounts,
  /// Largest first, with the `outros` bucket always last
  pub categories: Vec<CategorySummary>,
  pub rows: Vec<ClassifiedRow>,
}

impl FeedbackReport {
  /// Build Report
  /// Pairs rows with their predictions (rows without one are left out),
  /// counts sentiment per primary category and folds everything after the
  /// top categories into `outros`.
  pub fn build(rows: &[FeedbackRow], predictions: &[Option<Prediction>], config: &ReportConfig) -> Self {
    let mut overall: SentimentCounts = SentimentCounts::default();
    let mut order: Vec<String> = Vec::new();
    let mut per_category: HashMap<String, SentimentCounts> = HashMap::new();
    let mut secondary: HashMap<String, usize> = HashMap::new();
    let mut classified: Vec<ClassifiedRow> = Vec::new();

    for (row, prediction) in rows.iter().zip(predictions) {
      let prediction: &Prediction = match prediction {
        Some(p) => p,
        None => continue,
      };
      let primary: &str = row.category.primary.as_str();

      overall.add(prediction.label);
      if !per_category.contains_key(primary) {
        order.push(primary.to_string());
      }
      per_category.entry(primary.to_string()).or_default().add(prediction.label);
      for cat in &row.category.secondary {
        *secondary.entry(cat.clone()).or_insert(0) += 1;
      }

      classified.push(ClassifiedRow {
        comment: row.comment.clone(),
        category: primary.to_string(),
        predicted: prediction.label,
        confidence: prediction.confidence,
      });
    }

    let total_comments: usize = rows.len();
    let percent = |count: usize| -> f32 {
      if total_comments == 0 { 0.0 } else { count as f32 / total_comments as f32 * 100.0 }
    };

    let mut all: Vec<CategorySummary> = order
      .into_iter()
      .filter(|label| !label.trim().is_empty())
      .map(|label| {
        let sentiment: SentimentCounts = per_category[&label];
        CategorySummary {
          secondary_mentions: secondary.get(&label).copied().unwrap_or(0),
          percent: percent(sentiment.total()),
          sentiment,
          label,
        }
      })
      .collect();
    all.sort_by(|a, b| b.total().cmp(&a.total()));

    let rest: Vec<CategorySummary> = if all.len() > config.top_categories {
      all.split_off(config.top_categories)
    } else {
      Vec::new()
    };
    if !rest.is_empty() {
      let mut others: SentimentCounts = SentimentCounts::default();
      rest.iter().for_each(|cat| others.merge(&cat.sentiment));
      all.push(CategorySummary {
        label: OTHERS.to_string(),
        sentiment: others,
        secondary_mentions: 0,
        percent: percent(others.total()),
      });
    }

    tracing::info!("{} comments analysed in {} categories", classified.len(), all.len());
    FeedbackReport { total_comments, overall, categories: all, rows: classified }
  }

  /// Write Csv
  /// Classified rows with a `comment,category,predicted,confidence` header,
  /// in input order.
  pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
    let mut writer: csv::Writer<W> = csv::Writer::from_writer(out);
    for row in &self.rows {
      writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
  }

  /// Categories with the most negative comments, largest first
  pub fn most_negative(&self, n: usize) -> Vec<&CategorySummary> {
    let mut ranked: Vec<&CategorySummary> = self
      .categories
      .iter()
      .filter(|cat| cat.label != OTHERS && cat.sentiment.negative > 0)
      .collect();
    ranked.sort_by(|a, b| b.sentiment.negative.cmp(&a.sentiment.negative));
    ranked.truncate(n);
    ranked
  }
}

/// Negative Word Frequencies
/// Ranks display tokens of comments predicted negative, skipping stopwords.
/// Ties keep the order in which words were first seen.
pub fn negative_word_frequencies(rows: &[ClassifiedRow], stopwords: &[String], top: usize) -> Vec<WordCount> {
  let mut counts: Vec<WordCount> = Vec::new();
  let mut position: HashMap<String, usize> = HashMap::new();

  let negative = rows.iter().filter(|row| row.predicted == SentimentLabel::Negative);
  for row in negative {
    for word in display_tokens(&row.comment) {
      if stopwords.iter().any(|s| *s == word) { continue; }
      match position.get(&word) {
        Some(&idx) => counts[idx].count += 1,
        None => {
          position.insert(word.clone(), counts.len());
          counts.push(WordCount { word, count: 1 });
        }
      }
    }
  }

  counts.sort_by(|a, b| b.count.cmp(&a.count));
  counts.truncate(top);
  counts
}
