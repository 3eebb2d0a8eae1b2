use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::{Result, SentimentError};

const STOPWORDS_PT: &[&str] = &[
  "a", "o", "e", "as", "os", "um", "uma", "uns", "umas", "de", "do", "da", "dos", "das", "em", "no", "na", "nos", "nas",
  "por", "para", "com", "sem", "sob", "sobre", "entre", "até", "ao", "aos", "à", "às", "que", "quem", "onde",
  "como", "quando", "se", "mais", "menos", "também", "já", "muito", "muita", "muitos", "muitas", "me", "te",
  "vos", "lhe", "lhes", "sou", "é", "era", "foi", "foram", "ser", "estar", "está", "estavam", "tem", "têm",
  "isso", "isto", "aquele", "aquela", "aquilo", "há", "porquê", "não",
];

const STOPWORDS_EN: &[&str] = &[
  "a", "an", "the", "and", "or", "but", "if", "in", "on", "to", "with", "is", "are", "was", "were", "be", "been",
  "of", "for", "as", "at", "by", "from", "that", "this", "these", "those", "it", "its", "he", "she", "they", "we",
  "you", "i", "me", "my", "mine", "your", "yours", "our", "ours", "their", "theirs", "have", "has", "had", "do",
  "does", "did", "so", "such", "too", "very", "no", "not", "than", "then", "there", "here", "when", "where", "why", "how",
];

/// Language of a training file, selecting stopwords and the negation marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  #[value(alias = "portugues", alias = "português")]
  Pt,
  #[value(alias = "english")]
  En,
}

impl Language {
  pub fn stopwords(self) -> &'static HashSet<&'static str> {
    static PT: OnceLock<HashSet<&'static str>> = OnceLock::new();
    static EN: OnceLock<HashSet<&'static str>> = OnceLock::new();
    match self {
      Language::Pt => PT.get_or_init(|| STOPWORDS_PT.iter().copied().collect()),
      Language::En => EN.get_or_init(|| STOPWORDS_EN.iter().copied().collect()),
    }
  }

  /// Word that flips polarity and therefore always survives stopword removal
  pub fn negation(self) -> &'static str {
    match self {
      Language::Pt => "não",
      Language::En => "not",
    }
  }

  /// Detect
  /// A language named in the first record wins, otherwise the sentiment
  /// labels found anywhere in the file decide (Portuguese first).
  pub fn detect<S: AsRef<str>>(records: &[S]) -> Result<Self> {
    let first: String = match records.first() {
      Some(line) => line.as_ref().to_lowercase(),
      None => return Err(SentimentError::UnknownLanguage),
    };
    let first_words: Vec<&str> = first.split(|c: char| !c.is_alphabetic()).collect();
    if first_words.iter().any(|w| matches!(*w, "pt" | "português" | "portugues")) {
      return Ok(Language::Pt);
    }
    if first_words.iter().any(|w| matches!(*w, "en" | "english")) {
      return Ok(Language::En);
    }

    let mentions = |words: &[&str]| {
      records.iter().any(|line| {
        let lowered: String = line.as_ref().to_lowercase();
        words.iter().any(|w| lowered.contains(w))
      })
    };
    if mentions(&["negativo", "positivo", "neutro"][..]) {
      Ok(Language::Pt)
    } else if mentions(&["negative", "positive", "neutral"][..]) {
      Ok(Language::En)
    } else {
      Err(SentimentError::UnknownLanguage)
    }
  }
}

/// Tokenize
/// Splits normalized text on whitespace and removes stopwords, keeping the
/// language's negation marker. One-letter tokens go too unless `keep_short`.
pub fn tokenize(normalized: &str, language: Language, keep_short: bool) -> Vec<String> {
  let stopwords: &HashSet<&str> = language.stopwords();
  let negation: &str = language.negation();

  normalized
    .split_whitespace()
    .filter(|tok| *tok == negation || !stopwords.contains(tok))
    .filter(|tok| keep_short || tok.chars().count() > 1)
    .map(String::from)
    .collect()
}

/// Display Tokens
/// Words longer than two letters for frequency lists. Digits and punctuation
/// separate words, and no negation exception applies.
pub fn display_tokens(text: &str) -> Vec<String> {
  text
    .to_lowercase()
    .split(|c: char| !c.is_alphabetic())
    .filter(|tok| tok.chars().count() > 2)
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn it_keeps_portuguese_negation() {
    let tokens: Vec<String> = tokenize("não gostei", Language::Pt, false);
    assert_eq!(tokens, vec!["não", "gostei"]);
  }

  #[test]
  fn it_keeps_english_negation() {
    let tokens: Vec<String> = tokenize("the nurse was not kind", Language::En, false);
    assert_eq!(tokens, vec!["nurse", "not", "kind"]);
  }

  #[test]
  fn it_removes_stopwords_per_language() {
    let tokens: Vec<String> = tokenize("o atendimento foi muito lento", Language::Pt, false);
    assert_eq!(tokens, vec!["atendimento", "lento"]);
    // English stopwords do not apply to Portuguese text
    let tokens: Vec<String> = tokenize("the atendimento", Language::Pt, false);
    assert_eq!(tokens, vec!["the", "atendimento"]);
  }

  #[test]
  fn it_drops_short_tokens_unless_kept() {
    assert_eq!(tokenize("x ray 5 dias", Language::Pt, false), vec!["ray", "dias"]);
    assert_eq!(tokenize("x ray 5 dias", Language::Pt, true), vec!["x", "ray", "5", "dias"]);
  }

  #[test]
  fn it_counts_characters_not_bytes() {
    // "ã" is two bytes but a single character
    assert_eq!(tokenize("ã dor", Language::Pt, false), vec!["dor"]);
  }

  #[test]
  fn display_tokens_use_a_length_cutoff_without_negation() {
    let tokens: Vec<String> = display_tokens("Não fui atendido em 3 HORAS!");
    assert_eq!(tokens, vec!["não", "fui", "atendido", "horas"]);
    let tokens: Vec<String> = display_tokens("no, mau");
    assert_eq!(tokens, vec!["mau"]);
  }

  #[test]
  fn it_parses_language_names_from_the_command_line() {
    assert_eq!(Language::from_str("pt", true).unwrap(), Language::Pt);
    assert_eq!(Language::from_str("English", true).unwrap(), Language::En);
    assert_eq!(Language::from_str("português", true).unwrap(), Language::Pt);
    assert!(Language::from_str("fr", true).is_err());
  }

  #[test]
  fn it_detects_language_from_the_first_line() {
    let records = ["sentimento,comentario pt", "positivo,bom"];
    assert_eq!(Language::detect(&records).unwrap(), Language::Pt);
    let records = ["label,text (English)", "positivo,bom"];
    assert_eq!(Language::detect(&records).unwrap(), Language::En);
  }

  #[test]
  fn it_detects_language_from_labels() {
    let records = ["negative,slow service", "positive,kind staff"];
    assert_eq!(Language::detect(&records).unwrap(), Language::En);
    // "paciente" contains "en" but is not a language marker
    let records = ["negativo,paciente esperou", "positivo,ok"];
    assert_eq!(Language::detect(&records).unwrap(), Language::Pt);
  }

  #[test]
  fn it_fails_detection_without_clues() {
    let records = ["foo,bar"];
    assert!(matches!(Language::detect(&records), Err(SentimentError::UnknownLanguage)));
    let empty: [&str; 0] = [];
    assert!(Language::detect(&empty).is_err());
  }

  proptest! {
    #[test]
    fn tokens_never_contain_whitespace(s in "[a-zãéí \t\n]{0,60}", keep in any::<bool>()) {
      for tok in tokenize(&s, Language::Pt, keep) {
        prop_assert!(!tok.chars().any(char::is_whitespace));
        prop_assert!(!tok.is_empty());
      }
    }
  }
}
