use thiserror::Error;

pub type Result<T> = std::result::Result<T, SentimentError>;

#[derive(Debug, Error)]
pub enum SentimentError {
  #[error("feature vector has {actual} entries but the model expects {expected}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("no training examples were provided")]
  EmptyTrainingSet,

  #[error("the model has not been trained yet")]
  Untrained,

  #[error("could not detect the dataset language, add \"pt\" or \"en\" to the first line")]
  UnknownLanguage,

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Csv(#[from] csv::Error),

  #[error(transparent)]
  Config(#[from] config::ConfigError),
}
