use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::csv_records::ColumnRule;
use crate::error::Result;
use crate::tokenize::Language;

pub const EPOCHS: usize = 320;
pub const LEARNING_RATE: f32 = 0.01;
pub const TRAIN_FRACTION: f32 = 0.8;
pub const HIDDEN_UNITS: usize = 128; // first dense layer, capped at twice the vocabulary
pub const SECOND_HIDDEN_UNITS: usize = 64; // second dense layer, capped at the vocabulary
pub const TOP_CATEGORIES: usize = 10;
pub const TOP_WORDS: usize = 25;
pub const ENV_PREFIX: &str = "FEEDBACK";

/// Everything tunable about ingestion, training and reporting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub preprocessing: PreprocessingConfig,
  pub columns: ColumnConfig,
  pub model: ModelConfig,
  pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
  /// Skips detection when set
  pub language: Option<Language>,
  pub keep_short_tokens: bool,
  /// Lines not opening with a label continue the previous comment
  pub join_unlabeled_lines: bool,
}

impl Default for PreprocessingConfig {
  fn default() -> Self {
    Self { language: None, keep_short_tokens: false, join_unlabeled_lines: true }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
  pub rules: Vec<ColumnRule>,
  pub delimiter: char,
  pub min_comment_chars: usize,
  pub max_category_chars: usize,
}

impl Default for ColumnConfig {
  fn default() -> Self {
    Self {
      rules: ColumnRule::defaults(),
      delimiter: ';',
      min_comment_chars: 2,
      max_category_chars: 40,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
  pub epochs: usize,
  pub learning_rate: f32,
  pub seed: u64,
  pub hidden_units: usize,
  pub second_hidden_units: usize,
  /// Leading share of examples trained on, the rest is held out for evaluation
  pub train_fraction: f32,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      epochs: EPOCHS,
      learning_rate: LEARNING_RATE,
      seed: 42,
      hidden_units: HIDDEN_UNITS,
      second_hidden_units: SECOND_HIDDEN_UNITS,
      train_fraction: TRAIN_FRACTION,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
  pub top_categories: usize,
  pub top_words: usize,
  pub cloud_stopwords: Vec<String>,
}

impl Default for ReportConfig {
  fn default() -> Self {
    let cloud_stopwords: Vec<String> = [
      "nao", "não", "de", "da", "do", "das", "dos", "que", "para", "por", "com", "uma", "numa", "num",
      "no", "na", "ao", "aos", "as", "os", "meu", "minha", "seu", "sua", "dele", "dela", "dia", "mas",
      "tinha", "fui", "fazer", "ter", "este", "estava", "depois", "qualquer", "nada", "mesmo", "esta", "ainda",
      "hospital", "hospitais", "consulta", "consultas", "medico", "médico", "médica", "paciente", "pacientes", "luz",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect();

    Self { top_categories: TOP_CATEGORIES, top_words: TOP_WORDS, cloud_stopwords }
  }
}

impl PipelineConfig {
  /// Load Config
  /// Defaults, then the optional file (any format the config crate reads),
  /// then `FEEDBACK__SECTION__KEY` environment overrides.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut builder = config::Config::builder()
      .add_source(config::Config::try_from(&PipelineConfig::default())?);

    if let Some(path) = path {
      builder = builder.add_source(config::File::from(path));
    }

    let settings: config::Config = builder
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("__")
          .separator("__")
          .try_parsing(true),
      )
      .build()?;

    let loaded: PipelineConfig = settings.try_deserialize()?;
    tracing::debug!(?loaded, "pipeline configuration loaded");
    Ok(loaded)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::csv_records::ColumnRole;
  use std::io::Write;

  #[test]
  fn it_defaults_to_the_dashboard_settings() {
    let config: PipelineConfig = PipelineConfig::default();
    assert_eq!(config.model.epochs, 320);
    assert_eq!(config.model.train_fraction, 0.8);
    assert_eq!(config.columns.delimiter, ';');
    assert_eq!(config.report.top_categories, 10);
    assert!(!config.preprocessing.keep_short_tokens);
    assert!(config.preprocessing.join_unlabeled_lines);
    assert!(config.columns.rules.iter().any(|r| r.role == ColumnRole::Category));
  }

  #[test]
  fn it_fills_missing_sections_from_json() {
    let json: &str = r#"{ "preprocessing": { "language": "en" }, "model": { "epochs": 12 } }"#;
    let config: PipelineConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.preprocessing.language, Some(Language::En));
    assert_eq!(config.model.epochs, 12);
    assert_eq!(config.model.seed, 42);
    assert_eq!(config.report, ReportConfig::default());
  }

  #[test]
  fn it_loads_overrides_from_a_file() {
    let path: std::path::PathBuf = std::env::temp_dir().join("feedback_sentiment_config_test.json");
    let mut file: std::fs::File = std::fs::File::create(&path).unwrap();
    writeln!(file, r#"{{ "report": {{ "top_words": 5 }}, "columns": {{ "delimiter": "," }} }}"#).unwrap();

    let config: PipelineConfig = PipelineConfig::load(Some(&path)).unwrap();
    assert_eq!(config.report.top_words, 5);
    assert_eq!(config.columns.delimiter, ',');
    assert_eq!(config.model.epochs, EPOCHS);
    std::fs::remove_file(&path).ok();
  }
}
