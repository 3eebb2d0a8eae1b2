use tokenizers::normalizers::{Lowercase, NFC};
use tokenizers::tokenizer::{NormalizedString, Normalizer};

/// Straight and curly quotes stripped from the ends of a field
pub const QUOTE_CHARS: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Normalize
/// Turns raw feedback into lowercase words separated by single spaces.
/// Accented letters survive, punctuation does not.
pub fn normalize(raw: &str) -> String {
  let composed: String = compose_lowercase(raw);
  let unquoted: &str = strip_quotes(&composed);
  collapse_to_words(unquoted)
}

/// Strips runs of whitespace and quote-like characters from both ends
pub fn strip_quotes(text: &str) -> &str {
  text.trim_matches(|c: char| c.is_whitespace() || QUOTE_CHARS.contains(&c))
}

/// Unicode composition and lowercasing through the tokenizers normalizers.
/// A failing normalizer leaves us with the trimmed input instead.
fn compose_lowercase(raw: &str) -> String {
  let mut normalized: NormalizedString = NormalizedString::from(raw);
  let outcome = NFC
    .normalize(&mut normalized)
    .and_then(|_| Lowercase.normalize(&mut normalized));

  match outcome {
    Ok(()) => normalized.get().trim().to_string(),
    Err(e) => {
      tracing::debug!("unicode normalization failed, falling back to trim: {}", e);
      raw.trim().to_lowercase()
    }
  }
}

/// Every run of characters that is neither a letter nor a number becomes one space
fn collapse_to_words(text: &str) -> String {
  let mut out: String = String::with_capacity(text.len());
  let words = text
    .split(|c: char| !(c.is_alphabetic() || c.is_numeric()))
    .filter(|w| !w.is_empty());

  for word in words {
    if !out.is_empty() { out.push(' '); }
    out.push_str(word);
  }
  out
}
