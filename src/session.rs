use crate::config::PipelineConfig;
use crate::error::{Result, SentimentError};
use crate::model::{Classifier, EpochLog, NeuralNetwork, Prediction, TrainingReport};
use crate::preprocessing::{preprocess_tokens, LabeledExample};
use crate::tokenize::Language;
use crate::vocabulary::{FeatureVector, Vocabulary};

/// Session
/// A vocabulary and the classifier trained against it, kept together so
/// neither can drift from the other. Live text goes through the same
/// cleaning settings that produced the training examples.
pub struct Session<C: Classifier = NeuralNetwork> {
  vocabulary: Vocabulary,
  classifier: C,
  language: Language,
  keep_short: bool,
}

impl Session<NeuralNetwork> {
  /// Train Session
  /// Builds the vocabulary from the examples, then trains a fresh network.
  pub fn train(
    examples: &[LabeledExample],
    language: Language,
    config: &PipelineConfig,
    on_epoch: &mut dyn FnMut(EpochLog),
  ) -> Result<(Self, TrainingReport)> {
    if examples.is_empty() {
      return Err(SentimentError::EmptyTrainingSet);
    }

    let vocabulary: Vocabulary = Vocabulary::build(examples);
    tracing::info!("Vocab ready: {} tokens", vocabulary.len());

    let mut classifier: NeuralNetwork = NeuralNetwork::new(vocabulary.len(), &config.model);
    for example in examples {
      let features: FeatureVector = vocabulary.encode_tokens(example.text.split_whitespace());
      classifier.add_training_example(&features, example.label)?;
    }
    let report: TrainingReport = classifier.train(config.model.epochs, on_epoch)?;

    let session: Session<NeuralNetwork> = Session {
      vocabulary,
      classifier,
      language,
      keep_short: config.preprocessing.keep_short_tokens,
    };
    Ok((session, report))
  }
}

impl<C: Classifier> Session<C> {
  /// Pairs an already trained classifier with its vocabulary
  pub fn from_parts(vocabulary: Vocabulary, classifier: C, language: Language, keep_short: bool) -> Result<Self> {
    if classifier.input_size() != vocabulary.len() {
      return Err(SentimentError::DimensionMismatch { expected: classifier.input_size(), actual: vocabulary.len() });
    }
    Ok(Self { vocabulary, classifier, language, keep_short })
  }

  pub fn vocabulary(&self) -> &Vocabulary {
    &self.vocabulary
  }

  pub fn classifier(&self) -> &C {
    &self.classifier
  }

  pub fn language(&self) -> Language {
    self.language
  }

  /// Feature vector for raw live text, cleaned exactly like training data
  pub fn features(&self, text: &str) -> FeatureVector {
    let tokens: Vec<String> = preprocess_tokens(text, self.language, self.keep_short);
    self.vocabulary.encode_tokens(&tokens)
  }

  /// Classify Text
  /// Top prediction for one comment; blank input gives `None`.
  pub fn classify(&self, text: &str) -> Result<Option<Prediction>> {
    let text: &str = text.trim();
    if text.is_empty() {
      return Ok(None);
    }
    let ranked: Vec<Prediction> = self.classifier.classify(&self.features(text))?;
    Ok(ranked.into_iter().next())
  }

  /// One entry per input, in input order
  pub fn classify_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Option<Prediction>>> {
    texts.iter().map(|text| self.classify(text.as_ref())).collect()
  }

  /// Share of already cleaned examples whose label is predicted correctly
  pub fn evaluate(&self, examples: &[LabeledExample]) -> Result<f32> {
    if examples.is_empty() {
      return Ok(0.0);
    }
    let mut correct: usize = 0;
    for example in examples {
      let features: FeatureVector = self.vocabulary.encode_tokens(example.text.split_whitespace());
      let ranked: Vec<Prediction> = self.classifier.classify(&features)?;
      if ranked.first().map(|p| p.label) == Some(example.label) {
        correct += 1;
      }
    }
    Ok(correct as f32 / examples.len() as f32)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ModelConfig;
  use crate::label::SentimentLabel;

  fn examples() -> Vec<LabeledExample> {
    let raw = [
      (SentimentLabel::Negative, "espera longa espera_longa"),
      (SentimentLabel::Negative, "sala suja sala_suja"),
      (SentimentLabel::Neutral, "consulta normal consulta_normal"),
      (SentimentLabel::Positive, "equipa simpática equipa_simpática"),
    ];
    raw.iter().map(|(label, text)| LabeledExample { label: *label, text: text.to_string() }).collect()
  }

  #[test]
  fn it_rejects_an_empty_training_set() {
    let result = Session::train(&[], Language::Pt, &PipelineConfig::default(), &mut |_| {});
    assert!(matches!(result, Err(SentimentError::EmptyTrainingSet)));
  }

  #[test]
  fn it_pairs_vocabulary_and_model() {
    let config: PipelineConfig = PipelineConfig { model: ModelConfig { epochs: 10, ..ModelConfig::default() }, ..Default::default() };
    let (session, report) = Session::train(&examples(), Language::Pt, &config, &mut |_| {}).unwrap();

    assert_eq!(report.examples, 4);
    assert_eq!(session.vocabulary().len(), 12);
    assert_eq!(session.classifier().input_size(), session.vocabulary().len());
  }

  #[test]
  fn live_features_include_bigrams() {
    let config: PipelineConfig = PipelineConfig { model: ModelConfig { epochs: 1, ..ModelConfig::default() }, ..Default::default() };
    let (session, _) = Session::train(&examples(), Language::Pt, &config, &mut |_| {}).unwrap();

    let features: FeatureVector = session.features("A espera foi longa!");
    let vocab: &Vocabulary = session.vocabulary();
    assert_eq!(features.as_slice()[vocab.index_of("espera").unwrap()], 1);
    assert_eq!(features.as_slice()[vocab.index_of("longa").unwrap()], 1);
    assert_eq!(features.as_slice()[vocab.index_of("espera_longa").unwrap()], 1);
    assert_eq!(features.ones(), 3);
  }

  #[test]
  fn blank_input_is_not_classified() {
    let config: PipelineConfig = PipelineConfig { model: ModelConfig { epochs: 1, ..ModelConfig::default() }, ..Default::default() };
    let (session, _) = Session::train(&examples(), Language::Pt, &config, &mut |_| {}).unwrap();
    assert_eq!(session.classify("   ").unwrap(), None);

    let batch = session.classify_batch(&["sala suja", "", "equipa simpática"]).unwrap();
    assert_eq!(batch.len(), 3);
    assert!(batch[0].is_some() && batch[1].is_none() && batch[2].is_some());
  }

  #[test]
  fn from_parts_checks_sizes() {
    let vocab: Vocabulary = Vocabulary::from_tokens(["a1", "b2"]);
    let nn: NeuralNetwork = NeuralNetwork::new(3, &ModelConfig::default());
    assert!(matches!(
      Session::from_parts(vocab, nn, Language::Pt, false),
      Err(SentimentError::DimensionMismatch { expected: 3, actual: 2 })
    ));
  }
}
