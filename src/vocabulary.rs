use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::normalize::normalize;
use crate::preprocessing::LabeledExample;

/// Ordered set of distinct tokens. A token's position is its feature index,
/// so a vocabulary never changes once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vocabulary {
  tokens: Vec<String>,
  index: HashMap<String, usize>,
}

/// One entry of the published vocabulary file
#[derive(Debug, Serialize, Deserialize)]
struct VocabularyEntry {
  token: String,
}

/// Binary presence vector aligned to a vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector {
  bits: Vec<u8>,
}

/// How many tokens of an encoded text matched the vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeStats {
  pub matched: usize,
  pub out_of_vocabulary: usize,
}

impl Vocabulary {
  /// Build Vocabulary
  /// Collects the distinct whitespace-separated tokens of already cleaned
  /// examples in first-seen order.
  pub fn build(examples: &[LabeledExample]) -> Self {
    Self::from_texts(examples.iter().map(|ex| ex.text.as_str()))
  }

  pub fn from_texts<'a, I>(texts: I) -> Self
  where
    I: IntoIterator<Item = &'a str>,
  {
    Self::from_tokens(texts.into_iter().flat_map(str::split_whitespace))
  }

  /// Keeps the first occurrence of every token
  pub fn from_tokens<I, S>(tokens: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut vocab: Vocabulary = Vocabulary::default();
    for token in tokens {
      let token: &str = token.as_ref();
      if token.is_empty() || vocab.index.contains_key(token) { continue; }
      vocab.index.insert(token.to_string(), vocab.tokens.len());
      vocab.tokens.push(token.to_string());
    }
    vocab
  }

  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  pub fn index_of(&self, token: &str) -> Option<usize> {
    self.index.get(token).copied()
  }

  pub fn tokens(&self) -> &[String] {
    &self.tokens
  }

  /// Encode
  /// Re-normalizes raw text and marks every vocabulary token it contains.
  /// Unknown tokens contribute nothing.
  pub fn encode(&self, text: &str) -> FeatureVector {
    self.encode_with_stats(text).0
  }

  pub fn encode_with_stats(&self, text: &str) -> (FeatureVector, EncodeStats) {
    let cleaned: String = normalize(text);
    self.encode_tokens_with_stats(cleaned.split_whitespace())
  }

  /// Encodes tokens that are already cleaned, without touching them
  pub fn encode_tokens<I, S>(&self, tokens: I) -> FeatureVector
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.encode_tokens_with_stats(tokens).0
  }

  fn encode_tokens_with_stats<I, S>(&self, tokens: I) -> (FeatureVector, EncodeStats)
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut bits: Vec<u8> = vec![0; self.tokens.len()];
    let mut stats: EncodeStats = EncodeStats::default();
    for token in tokens {
      match self.index_of(token.as_ref()) {
        Some(idx) => {
          bits[idx] = 1;
          stats.matched += 1;
        }
        None => stats.out_of_vocabulary += 1,
      }
    }
    (FeatureVector { bits }, stats)
  }

  /// Publish format: `[{"token": "..."}, ...]` in index order
  pub fn to_json(&self) -> Result<String> {
    let entries: Vec<VocabularyEntry> = self
      .tokens
      .iter()
      .map(|token| VocabularyEntry { token: token.clone() })
      .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
  }

  pub fn from_json(json: &str) -> Result<Self> {
    let entries: Vec<VocabularyEntry> = serde_json::from_str(json)?;
    Ok(Self::from_tokens(entries.into_iter().map(|entry| entry.token)))
  }
}

impl FeatureVector {
  pub fn len(&self) -> usize {
    self.bits.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bits.is_empty()
  }

  pub fn as_slice(&self) -> &[u8] {
    &self.bits
  }

  /// Number of set positions
  pub fn ones(&self) -> usize {
    self.bits.iter().filter(|&&b| b == 1).count()
  }

  pub fn to_array(&self) -> Array1<f32> {
    self.bits.iter().map(|&b| f32::from(b)).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::label::SentimentLabel;
  use proptest::prelude::*;

  fn example(label: SentimentLabel, text: &str) -> LabeledExample {
    LabeledExample { label, text: text.to_string() }
  }

  #[test]
  fn it_builds_in_first_seen_order() {
    let examples: Vec<LabeledExample> = vec![
      example(SentimentLabel::Positive, "bom atendimento bom_atendimento"),
      example(SentimentLabel::Negative, "atendimento lento"),
    ];
    let vocab: Vocabulary = Vocabulary::build(&examples);
    assert_eq!(vocab.tokens(), &["bom", "atendimento", "bom_atendimento", "lento"]);
    assert_eq!(vocab.index_of("lento"), Some(3));
    assert_eq!(vocab.index_of("rápido"), None);
  }

  #[test]
  fn it_encodes_the_documented_scenario() {
    let examples: Vec<LabeledExample> = vec![
      example(SentimentLabel::Positive, "bom atendimento"),
      example(SentimentLabel::Negative, "muito mau"),
    ];
    let vocab: Vocabulary = Vocabulary::build(&examples);
    let vector: FeatureVector = vocab.encode("atendimento mau");

    assert_eq!(vector.len(), vocab.len());
    assert_eq!(vector.ones(), 2);
    assert_eq!(vector.as_slice()[vocab.index_of("atendimento").unwrap()], 1);
    assert_eq!(vector.as_slice()[vocab.index_of("mau").unwrap()], 1);
  }

  #[test]
  fn it_counts_presence_not_frequency() {
    let vocab: Vocabulary = Vocabulary::from_tokens(["dor", "espera"]);
    let (vector, stats) = vocab.encode_with_stats("Dor, dor e mais DOR!");
    assert_eq!(vector.as_slice(), &[1, 0]);
    assert_eq!(stats, EncodeStats { matched: 3, out_of_vocabulary: 2 });
  }

  #[test]
  fn unknown_text_yields_a_zero_vector() {
    let vocab: Vocabulary = Vocabulary::from_tokens(["dor", "espera"]);
    let vector: FeatureVector = vocab.encode("tudo excelente");
    assert_eq!(vector.ones(), 0);
    assert_eq!(vector.len(), 2);
  }

  #[test]
  fn encode_tokens_keeps_bigrams() {
    let vocab: Vocabulary = Vocabulary::from_tokens(["bom", "bom_atendimento"]);
    assert_eq!(vocab.encode_tokens(["bom", "bom_atendimento"]).as_slice(), &[1, 1]);
    // the raw-text path splits underscores during normalization
    assert_eq!(vocab.encode("bom_atendimento").as_slice(), &[1, 0]);
  }

  #[test]
  fn it_publishes_and_reloads_json() {
    let vocab: Vocabulary = Vocabulary::from_tokens(["não", "gostei", "não_gostei"]);
    let json: String = vocab.to_json().unwrap();
    assert!(json.contains("\"token\": \"não_gostei\""));
    assert_eq!(Vocabulary::from_json(&json).unwrap(), vocab);
  }

  #[test]
  fn feature_vector_converts_to_array() {
    let vocab: Vocabulary = Vocabulary::from_tokens(["a1", "b2", "c3"]);
    let array: Array1<f32> = vocab.encode("c3 a1").to_array();
    assert_eq!(array.to_vec(), vec![1.0, 0.0, 1.0]);
  }

  proptest! {
    #[test]
    fn vector_length_matches_vocabulary(
      tokens in proptest::collection::vec("[a-z]{1,6}", 0..30),
      text in "[a-z ]{0,60}",
    ) {
      let vocab: Vocabulary = Vocabulary::from_tokens(&tokens);
      prop_assert_eq!(vocab.encode(&text).len(), vocab.len());
    }
  }
}
