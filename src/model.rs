use ndarray::{Array, Array1, Array2, Axis, Dimension, Zip};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::ModelConfig;
use crate::error::{Result, SentimentError};
use crate::label::SentimentLabel;
use crate::vocabulary::FeatureVector;

pub const NUM_CLASSES: usize = 3; // negativo, neutro, positivo

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-8;
const LOG_EPSILON: f32 = 1e-7;

/// One ranked output of a classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
  pub label: SentimentLabel,
  pub confidence: f32,
}

/// Reported after each training epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLog {
  pub epoch: usize,
  pub loss: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
  pub epochs: usize,
  pub examples: usize,
  pub final_loss: f32,
}

/// Classifier
/// The learning collaborator fed with bag-of-words vectors. The returned
/// report marks completion of a training run.
pub trait Classifier {
  fn input_size(&self) -> usize;

  fn add_training_example(&mut self, features: &FeatureVector, label: SentimentLabel) -> Result<()>;

  fn train(&mut self, epochs: usize, on_epoch: &mut dyn FnMut(EpochLog)) -> Result<TrainingReport>;

  /// Predictions for every label, most confident first
  fn classify(&self, features: &FeatureVector) -> Result<Vec<Prediction>>;
}

#[derive(Debug, Clone)]
struct DenseLayer {
  weights: Array2<f32>,
  biases: Array1<f32>,
  m_weights: Array2<f32>,
  v_weights: Array2<f32>,
  m_biases: Array1<f32>,
  v_biases: Array1<f32>,
}

impl DenseLayer {
  /// He-style uniform initialization from the shared seeded generator
  fn new(input_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
    let limit: f32 = (6.0 / input_size.max(1) as f32).sqrt();
    let dist: Uniform<f32> = Uniform::new(-limit, limit);
    Self {
      weights: Array2::from_shape_fn((input_size, output_size), |_| dist.sample(&mut *rng)),
      biases: Array1::zeros(output_size),
      m_weights: Array2::zeros((input_size, output_size)),
      v_weights: Array2::zeros((input_size, output_size)),
      m_biases: Array1::zeros(output_size),
      v_biases: Array1::zeros(output_size),
    }
  }

  fn update(&mut self, grad_weights: &Array2<f32>, grad_biases: &Array1<f32>, learning_rate: f32, step: i32) {
    adam_update(&mut self.weights, &mut self.m_weights, &mut self.v_weights, grad_weights, learning_rate, step);
    adam_update(&mut self.biases, &mut self.m_biases, &mut self.v_biases, grad_biases, learning_rate, step);
  }
}

fn adam_update<D: Dimension>(
  param: &mut Array<f32, D>,
  m: &mut Array<f32, D>,
  v: &mut Array<f32, D>,
  grad: &Array<f32, D>,
  learning_rate: f32,
  step: i32,
) {
  let correction1: f32 = 1.0 - ADAM_BETA1.powi(step);
  let correction2: f32 = 1.0 - ADAM_BETA2.powi(step);
  Zip::from(param).and(m).and(v).and(grad).for_each(|p, m, v, &g| {
    *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
    *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
    *p -= learning_rate * (*m / correction1) / ((*v / correction2).sqrt() + ADAM_EPSILON);
  });
}

/// Row-wise softmax
fn softmax(mut logits: Array2<f32>) -> Array2<f32> {
  for mut row in logits.axis_iter_mut(Axis(0)) {
    let max: f32 = row.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    row.mapv_inplace(|x| (x - max).exp());
    let sum: f32 = row.sum();
    row.mapv_inplace(|x| x / sum);
  }
  logits
}

/// Neural Network
/// Dense relu, relu, softmax classifier over the three sentiment labels,
/// trained full-batch with Adam on cross-entropy.
#[derive(Debug, Clone)]
pub struct NeuralNetwork {
  input_size: usize,
  layers: Vec<DenseLayer>,
  learning_rate: f32,
  inputs: Vec<FeatureVector>,
  labels: Vec<SentimentLabel>,
  steps: i32,
}

impl NeuralNetwork {
  /// Hidden layers shrink with small vocabularies: min(cap, 2 * V) then min(cap, V)
  pub fn new(input_size: usize, config: &ModelConfig) -> Self {
    let mut rng: StdRng = StdRng::seed_from_u64(config.seed);
    let hidden: usize = config.hidden_units.min(input_size * 2).max(1);
    let second_hidden: usize = config.second_hidden_units.min(input_size).max(1);

    let layers: Vec<DenseLayer> = vec![
      DenseLayer::new(input_size, hidden, &mut rng),
      DenseLayer::new(hidden, second_hidden, &mut rng),
      DenseLayer::new(second_hidden, NUM_CLASSES, &mut rng),
    ];
    tracing::info!("NN created: {} inputs -> {} -> {} -> {} outputs", input_size, hidden, second_hidden, NUM_CLASSES);

    Self {
      input_size,
      layers,
      learning_rate: config.learning_rate,
      inputs: Vec::new(),
      labels: Vec::new(),
      steps: 0,
    }
  }

  pub fn is_trained(&self) -> bool {
    self.steps > 0
  }

  /// Activations of every layer, input first and probabilities last
  fn forward(&self, x: Array2<f32>) -> Vec<Array2<f32>> {
    let mut activations: Vec<Array2<f32>> = vec![x];
    let last: usize = self.layers.len() - 1;
    for (i, layer) in self.layers.iter().enumerate() {
      let z: Array2<f32> = activations[i].dot(&layer.weights) + &layer.biases;
      let a: Array2<f32> = if i == last { softmax(z) } else { z.mapv(|v| v.max(0.0)) };
      activations.push(a);
    }
    activations
  }

  fn check_size(&self, features: &FeatureVector) -> Result<()> {
    if features.len() != self.input_size {
      return Err(SentimentError::DimensionMismatch { expected: self.input_size, actual: features.len() });
    }
    Ok(())
  }

  fn training_matrices(&self) -> (Array2<f32>, Array2<f32>) {
    let n: usize = self.inputs.len();
    let x: Array2<f32> = Array2::from_shape_fn((n, self.input_size), |(r, c)| f32::from(self.inputs[r].as_slice()[c]));
    let y: Array2<f32> = Array2::from_shape_fn((n, NUM_CLASSES), |(r, c)| {
      if self.labels[r].index() == c { 1.0 } else { 0.0 }
    });
    (x, y)
  }

  fn train_epoch(&mut self, x: &Array2<f32>, y: &Array2<f32>) -> f32 {
    let n: f32 = x.nrows() as f32;
    let activations: Vec<Array2<f32>> = self.forward(x.clone());
    let probs: &Array2<f32> = &activations[activations.len() - 1];
    let loss: f32 = -(y * &probs.mapv(|p| (p + LOG_EPSILON).ln())).sum() / n;

    self.steps += 1;
    let mut delta: Array2<f32> = (probs - y) / n;
    for i in (0..self.layers.len()).rev() {
      let grad_weights: Array2<f32> = activations[i].t().dot(&delta);
      let grad_biases: Array1<f32> = delta.sum_axis(Axis(0));

      let previous_delta: Option<Array2<f32>> = if i > 0 {
        let mut d: Array2<f32> = delta.dot(&self.layers[i].weights.t());
        Zip::from(&mut d).and(&activations[i]).for_each(|d, &a| {
          if a <= 0.0 { *d = 0.0; }
        });
        Some(d)
      } else {
        None
      };

      self.layers[i].update(&grad_weights, &grad_biases, self.learning_rate, self.steps);
      if let Some(d) = previous_delta { delta = d; }
    }
    loss
  }
}

impl Classifier for NeuralNetwork {
  fn input_size(&self) -> usize {
    self.input_size
  }

  fn add_training_example(&mut self, features: &FeatureVector, label: SentimentLabel) -> Result<()> {
    self.check_size(features)?;
    self.inputs.push(features.clone());
    self.labels.push(label);
    Ok(())
  }

  fn train(&mut self, epochs: usize, on_epoch: &mut dyn FnMut(EpochLog)) -> Result<TrainingReport> {
    if self.inputs.is_empty() {
      return Err(SentimentError::EmptyTrainingSet);
    }
    let (x, y) = self.training_matrices();
    tracing::info!("Training started: {} epochs on {} examples", epochs, self.inputs.len());

    let mut loss: f32 = f32::NAN;
    for epoch in 0..epochs {
      loss = self.train_epoch(&x, &y);
      tracing::debug!(epoch, loss, "epoch finished");
      on_epoch(EpochLog { epoch: epoch + 1, loss });
    }

    tracing::info!("Training complete, final loss {:.4}", loss);
    Ok(TrainingReport { epochs, examples: self.inputs.len(), final_loss: loss })
  }

  fn classify(&self, features: &FeatureVector) -> Result<Vec<Prediction>> {
    self.check_size(features)?;
    if !self.is_trained() {
      return Err(SentimentError::Untrained);
    }

    let x: Array2<f32> = features.to_array().insert_axis(Axis(0));
    let activations: Vec<Array2<f32>> = self.forward(x);
    let probs: &Array2<f32> = &activations[activations.len() - 1];

    let mut predictions: Vec<Prediction> = probs
      .row(0)
      .iter()
      .enumerate()
      .filter_map(|(i, &p)| SentimentLabel::from_index(i).map(|label| Prediction { label, confidence: p }))
      .collect();
    predictions.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    Ok(predictions)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::vocabulary::Vocabulary;

  fn toy_network() -> (Vocabulary, NeuralNetwork) {
    let vocab: Vocabulary = Vocabulary::from_tokens(["péssimo", "demora", "normal", "regular", "excelente", "simpático"]);
    let config: ModelConfig = ModelConfig { epochs: 300, ..ModelConfig::default() };
    let mut nn: NeuralNetwork = NeuralNetwork::new(vocab.len(), &config);
    let samples = [
      ("péssimo demora", SentimentLabel::Negative),
      ("demora", SentimentLabel::Negative),
      ("normal regular", SentimentLabel::Neutral),
      ("regular", SentimentLabel::Neutral),
      ("excelente simpático", SentimentLabel::Positive),
      ("simpático", SentimentLabel::Positive),
    ];
    for (text, label) in samples {
      nn.add_training_example(&vocab.encode(text), label).unwrap();
    }
    (vocab, nn)
  }

  #[test]
  fn it_sizes_hidden_layers_by_vocabulary() {
    let nn: NeuralNetwork = NeuralNetwork::new(10, &ModelConfig::default());
    assert_eq!(nn.layers[0].weights.dim(), (10, 20));
    assert_eq!(nn.layers[1].weights.dim(), (20, 10));
    assert_eq!(nn.layers[2].weights.dim(), (10, NUM_CLASSES));

    let nn: NeuralNetwork = NeuralNetwork::new(1000, &ModelConfig::default());
    assert_eq!(nn.layers[0].weights.dim(), (1000, 128));
    assert_eq!(nn.layers[1].weights.dim(), (128, 64));
  }

  #[test]
  fn it_trains_the_model() {
    let (vocab, mut nn) = toy_network();
    let mut losses: Vec<f32> = Vec::new();
    let report: TrainingReport = nn.train(300, &mut |log: EpochLog| losses.push(log.loss)).unwrap();

    assert_eq!(report.epochs, 300);
    assert_eq!(report.examples, 6);
    assert_eq!(losses.len(), 300);
    assert!(report.final_loss < losses[0]);

    let top: Prediction = nn.classify(&vocab.encode("péssimo demora")).unwrap()[0];
    assert_eq!(top.label, SentimentLabel::Negative);
    let top: Prediction = nn.classify(&vocab.encode("excelente simpático")).unwrap()[0];
    assert_eq!(top.label, SentimentLabel::Positive);
  }

  #[test]
  fn it_ranks_all_labels_with_probabilities() {
    let (vocab, mut nn) = toy_network();
    nn.train(5, &mut |_| {}).unwrap();
    let predictions: Vec<Prediction> = nn.classify(&vocab.encode("normal")).unwrap();

    assert_eq!(predictions.len(), NUM_CLASSES);
    let total: f32 = predictions.iter().map(|p| p.confidence).sum();
    assert!((total - 1.0).abs() < 1e-4);
    assert!(predictions.windows(2).all(|w| w[0].confidence >= w[1].confidence));
  }

  #[test]
  fn it_rejects_foreign_vectors() {
    let (_, mut nn) = toy_network();
    let foreign: FeatureVector = Vocabulary::from_tokens(["a1"]).encode("a1");
    assert!(matches!(
      nn.add_training_example(&foreign, SentimentLabel::Neutral),
      Err(SentimentError::DimensionMismatch { expected: 6, actual: 1 })
    ));
    assert!(nn.classify(&foreign).is_err());
  }

  #[test]
  fn it_refuses_to_classify_before_training() {
    let (vocab, nn) = toy_network();
    assert!(matches!(nn.classify(&vocab.encode("demora")), Err(SentimentError::Untrained)));
  }

  #[test]
  fn it_needs_examples_to_train() {
    let mut nn: NeuralNetwork = NeuralNetwork::new(4, &ModelConfig::default());
    assert!(matches!(nn.train(3, &mut |_| {}), Err(SentimentError::EmptyTrainingSet)));
  }
}
