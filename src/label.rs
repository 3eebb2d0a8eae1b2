use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::strip_quotes;

/// Canonical sentiment of a comment.
/// Serialized with the Portuguese names the training files use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentimentLabel {
  #[serde(rename = "negativo")]
  Negative,
  #[serde(rename = "neutro")]
  Neutral,
  #[serde(rename = "positivo")]
  Positive,
}

/// Accepted spellings after trimming, lowercasing and dropping a trailing period
const LABEL_VARIANTS: [(&str, SentimentLabel); 6] = [
  ("negativo", SentimentLabel::Negative),
  ("neutro", SentimentLabel::Neutral),
  ("positivo", SentimentLabel::Positive),
  ("negative", SentimentLabel::Negative),
  ("neutral", SentimentLabel::Neutral),
  ("positive", SentimentLabel::Positive),
];

impl SentimentLabel {
  pub const ALL: [SentimentLabel; 3] = [SentimentLabel::Negative, SentimentLabel::Neutral, SentimentLabel::Positive];

  /// Canonicalize
  /// Maps a free-form label onto one of the three canonical values.
  /// Anything outside the variant table is rejected, never guessed.
  pub fn canonicalize(raw: &str) -> Option<Self> {
    let lowered: String = strip_quotes(raw).to_lowercase();
    let key: &str = lowered.strip_suffix('.').unwrap_or(&lowered).trim_end();
    LABEL_VARIANTS.iter().find(|(variant, _)| *variant == key).map(|(_, label)| *label)
  }

  /// Output slot of this label in a classifier
  pub fn index(self) -> usize {
    match self {
      SentimentLabel::Negative => 0,
      SentimentLabel::Neutral => 1,
      SentimentLabel::Positive => 2,
    }
  }

  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }

  pub fn as_str(self) -> &'static str {
    match self {
      SentimentLabel::Negative => "negativo",
      SentimentLabel::Neutral => "neutro",
      SentimentLabel::Positive => "positivo",
    }
  }
}

impl fmt::Display for SentimentLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// True when the text before the first `,` or `;` canonicalizes to a label
pub fn starts_with_label(line: &str) -> bool {
  match line.find(|c: char| c == ',' || c == ';') {
    Some(idx) => SentimentLabel::canonicalize(&line[..idx]).is_some(),
    None => false,
  }
}
