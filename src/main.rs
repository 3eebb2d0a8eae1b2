//! feedback-sentiment CLI: prepare training files, train a classifier and
//! analyze hospital feedback exports.

use anyhow::Context;
use clap::{Parser, Subcommand};
use lib_feedback_sentiment::config::PipelineConfig;
use lib_feedback_sentiment::model::EpochLog;
use lib_feedback_sentiment::report::{negative_word_frequencies, ClassifiedRow, WordCount};
use lib_feedback_sentiment::{
  analyze_feedback, train_from_csv, DataPreprocessor, FeedbackReport, Language, PreparedDataset, SentimentLabel, Session,
  TrainingRun,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feedback-sentiment")]
#[command(about = "Sentiment analysis of Portuguese hospital feedback")]
#[command(version)]
struct Cli {
  /// Config file (JSON, TOML or YAML); FEEDBACK__* variables override it
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Clean a labeled training file and export it as JSON
  Prepare {
    /// Training file with `sentimento,comentario` lines
    input: PathBuf,

    /// Where to write the cleaned dataset
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip language detection
    #[arg(short, long, value_enum, ignore_case = true)]
    language: Option<Language>,

    /// Keep one-letter tokens
    #[arg(long)]
    keep_short: bool,
  },

  /// Train on a labeled file and optionally classify some comments
  Train {
    input: PathBuf,

    /// Write the vocabulary as `[{"token": ...}]` JSON
    #[arg(long)]
    vocab_out: Option<PathBuf>,

    /// Comments to classify after training, one per line
    #[arg(short, long)]
    predict: Vec<String>,
  },

  /// Train, then classify and summarise a feedback export
  Analyze {
    /// Labeled training file
    #[arg(short, long)]
    training: PathBuf,

    /// Feedback export with comment and category columns
    feedback: PathBuf,

    /// Classified rows as CSV, in input order
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_target(false)
    .init();

  let cli: Cli = Cli::parse();
  let mut config: PipelineConfig = PipelineConfig::load(cli.config.as_deref())?;

  match cli.command {
    Commands::Prepare { input, output, language, keep_short } => {
      if language.is_some() {
        config.preprocessing.language = language;
      }
      config.preprocessing.keep_short_tokens |= keep_short;
      cmd_prepare(&input, output.as_deref(), &config)
    }
    Commands::Train { input, vocab_out, predict } => cmd_train(&input, vocab_out.as_deref(), &predict, &config),
    Commands::Analyze { training, feedback, output } => cmd_analyze(&training, &feedback, output.as_deref(), &config),
  }
}

fn read(path: &Path) -> anyhow::Result<String> {
  std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn cmd_prepare(input: &Path, output: Option<&Path>, config: &PipelineConfig) -> anyhow::Result<()> {
  let preprocessor: DataPreprocessor = DataPreprocessor::new(config.preprocessing.clone());
  let dataset: PreparedDataset = preprocessor.process(&read(input)?)?;

  println!("{} examples ({:?})", dataset.examples.len(), dataset.language);
  for line in dataset.preview(5) {
    println!("  {line}");
  }

  let json: String = dataset.to_json()?;
  match output {
    Some(path) => std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
    None => println!("{json}"),
  }
  Ok(())
}

fn train_session(input: &Path, config: &PipelineConfig) -> anyhow::Result<Session> {
  let mut on_epoch = |log: EpochLog| {
    if log.epoch % 20 == 0 {
      tracing::info!("Epoch {}/{}: loss {:.4}", log.epoch, config.model.epochs, log.loss);
    }
  };
  let run: TrainingRun = train_from_csv(&read(input)?, config, &mut on_epoch)?;
  println!(
    "Trained on {} of {} examples, {} tokens, final loss {:.4}",
    run.report.examples,
    run.dataset.examples.len(),
    run.session.vocabulary().len(),
    run.report.final_loss
  );
  match run.held_out_accuracy()? {
    Some(accuracy) => println!("Held-out accuracy {:.1}% on {} examples", accuracy * 100.0, run.held_out.len()),
    None => println!("No examples held out for evaluation"),
  }
  Ok(run.session)
}

fn cmd_train(input: &Path, vocab_out: Option<&Path>, predict: &[String], config: &PipelineConfig) -> anyhow::Result<()> {
  let session: Session = train_session(input, config)?;

  if let Some(path) = vocab_out {
    std::fs::write(path, session.vocabulary().to_json()?).with_context(|| format!("writing {}", path.display()))?;
  }

  let lines: Vec<&str> = predict
    .iter()
    .flat_map(|p| p.split('\n'))
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .collect();
  for (line, prediction) in lines.iter().zip(session.classify_batch(&lines)?) {
    if let Some(prediction) = prediction {
      println!("{} ({:.1}%)  {}", prediction.label, prediction.confidence * 100.0, line);
    }
  }
  Ok(())
}

fn cmd_analyze(training: &Path, feedback: &Path, output: Option<&Path>, config: &PipelineConfig) -> anyhow::Result<()> {
  let session: Session = train_session(training, config)?;
  let report: FeedbackReport = analyze_feedback(&session, &read(feedback)?, config)?;

  if let Some(path) = output {
    let file: std::fs::File = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    report.write_csv(file)?;
  }

  let overall = report.overall;
  println!("{} comments", report.total_comments);
  println!("  negativo {}  neutro {}  positivo {}", overall.negative, overall.neutral, overall.positive);
  println!("Categories:");
  for cat in &report.categories {
    println!(
      "  {:<30} {:>5} ({:.1}%)  neg {} neu {} pos {}",
      cat.label,
      cat.total(),
      cat.percent,
      cat.sentiment.negative,
      cat.sentiment.neutral,
      cat.sentiment.positive
    );
  }

  let negative: Vec<&ClassifiedRow> = report.rows.iter().filter(|r| r.predicted == SentimentLabel::Negative).collect();
  println!("{} negative comments", negative.len());
  for cat in report.most_negative(3) {
    println!("  most negative: {} ({})", cat.label, cat.sentiment.negative);
  }
  let words: Vec<WordCount> = negative_word_frequencies(&report.rows, &config.report.cloud_stopwords, config.report.top_words);
  let listed: Vec<String> = words.iter().map(|w| format!("{} ({})", w.word, w.count)).collect();
  println!("Frequent words: {}", listed.join(", "));
  Ok(())
}
