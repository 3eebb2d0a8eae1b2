pub mod bigrams;
pub mod config;
pub mod csv_records;
pub mod error;
pub mod feedback;
pub mod label;
pub mod model;
pub mod normalize;
pub mod preprocessing;
pub mod report;
pub mod session;
pub mod tokenize;
pub mod vocabulary;

pub use config::PipelineConfig;
pub use error::{Result, SentimentError};
pub use label::SentimentLabel;
pub use model::{Classifier, NeuralNetwork, Prediction, TrainingReport};
pub use preprocessing::{DataPreprocessor, LabeledExample, PreparedDataset};
pub use report::FeedbackReport;
pub use session::Session;
pub use tokenize::Language;
pub use vocabulary::{FeatureVector, Vocabulary};

use feedback::{parse_feedback_csv, FeedbackRow};
use model::EpochLog;
use preprocessing::train_test_split;

/// A session trained on the leading part of a prepared file
pub struct TrainingRun {
  pub session: Session,
  pub dataset: PreparedDataset,
  pub report: TrainingReport,
  /// Examples kept out of training, in file order
  pub held_out: Vec<LabeledExample>,
}

impl TrainingRun {
  /// Accuracy on the held-out examples, `None` when nothing was held out
  pub fn held_out_accuracy(&self) -> Result<Option<f32>> {
    if self.held_out.is_empty() {
      return Ok(None);
    }
    Ok(Some(self.session.evaluate(&self.held_out)?))
  }
}

/// Train From Csv
/// Prepares a raw training file, splits it with `model.train_fraction` and
/// trains a session on the leading part. A split leaving nothing to train on
/// trains on everything instead.
pub fn train_from_csv(raw: &str, config: &PipelineConfig, on_epoch: &mut dyn FnMut(EpochLog)) -> Result<TrainingRun> {
  let preprocessor: DataPreprocessor = DataPreprocessor::new(config.preprocessing.clone());
  let dataset: PreparedDataset = preprocessor.process(raw)?;

  let (mut train, mut held_out) = train_test_split(&dataset.examples, config.model.train_fraction);
  if train.is_empty() {
    train = std::mem::take(&mut held_out);
  }
  tracing::info!("{} training examples, {} held out", train.len(), held_out.len());

  let (session, report) = Session::train(&train, dataset.language, config, on_epoch)?;
  Ok(TrainingRun { session, dataset, report, held_out })
}

/// Analyze Feedback
/// Classifies every comment of a feedback export and aggregates by category
pub fn analyze_feedback(session: &Session, raw: &str, config: &PipelineConfig) -> Result<FeedbackReport> {
  let rows: Vec<FeedbackRow> = parse_feedback_csv(raw, &config.columns);
  let comments: Vec<&str> = rows.iter().map(|row| row.comment.as_str()).collect();
  let predictions: Vec<Option<Prediction>> = session.classify_batch(&comments)?;
  Ok(FeedbackReport::build(&rows, &predictions, &config.report))
}
