// Main module for fraud feature derivation. Builds feature tables from transaction ledgers and evaluates a classifier on them.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use fraud_features::classifier::{
    self, evaluate, predict, read_feature_matrix, train, Evaluation, DEFAULT_FEATURES, DEFAULT_MAX_DEPTH,
};
use fraud_features::config::PipelineConfig;
use fraud_features::csv_reader::read_transactions;
use fraud_features::features::CategoryEncoder;
use fraud_features::pipeline::FeaturePipeline;

const HIGH_RECALL_THRESHOLD: f64 = 0.8;
const MEDIUM_RECALL_THRESHOLD: f64 = 0.5;

#[derive(Debug, Parser)]
#[command(version, about = "Derive fraud-detection features and evaluate a classifier on them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Derive a feature table from a raw transaction CSV
    Features(FeaturesArgs),
    /// Train a decision tree on one feature table and evaluate it on another
    Evaluate(EvaluateArgs),
}

#[derive(Debug, Args)]
struct FeaturesArgs {
    /// Raw transaction CSV
    #[arg(long)]
    input: PathBuf,
    /// Where to write the feature table
    #[arg(long)]
    output: PathBuf,
    /// Fit the category encoder on this input and save it here
    #[arg(long, conflicts_with = "encoder", required_unless_present = "encoder")]
    fit_encoder: Option<PathBuf>,
    /// Apply a previously fitted category encoder
    #[arg(long)]
    encoder: Option<PathBuf>,
    /// JSON pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct EvaluateArgs {
    /// Feature table to train on
    #[arg(long)]
    train: PathBuf,
    /// Feature table to evaluate on
    #[arg(long)]
    test: PathBuf,
    /// Comma-separated feature columns
    #[arg(long, value_delimiter = ',')]
    features: Vec<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

// Runs the feature pipeline once
// Inputs: paths for the ledger, output table, encoder and optional config
// Outputs: feature table CSV on disk (and the encoder JSON when fitting)
// Key steps:
// 1. Load configuration and transactions
// 2. Fit and save the encoder, or load the frozen one
// 3. Run the pipeline and write the table
fn derive_features(args: &FeaturesArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let store = read_transactions(&args.input, &config)
        .with_context(|| format!("reading transactions from {}", args.input.display()))?;

    let encoder = match (&args.fit_encoder, &args.encoder) {
        (Some(path), _) => {
            let encoder = CategoryEncoder::fit(store.records());
            encoder.save(path)?;
            log::info!("Fitted {} categories, saved to {}", encoder.len(), path.display());
            encoder
        }
        (None, Some(path)) => CategoryEncoder::load(path)
            .with_context(|| format!("loading encoder {}", path.display()))?,
        (None, None) => bail!("either --fit-encoder or --encoder is required"),
    };

    let pipeline = FeaturePipeline::new(config, encoder)?;
    let output = pipeline.run(&store)?;
    output.table.write_csv(&args.output)?;

    println!(
        "Wrote {} rows x {} columns to {}",
        output.table.len(),
        output.table.header().len(),
        args.output.display()
    );
    Ok(())
}

// Displays the evaluation for a single class
// Inputs: class metrics
// Outputs: Prints formatted metrics to console
fn print_class_report(metrics: &classifier::ClassMetrics) {
    println!(
        "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
        if metrics.label == 1 { "fraud" } else { "legit" },
        metrics.precision,
        metrics.recall,
        metrics.f1,
        metrics.support
    );
}

// Displays accuracy, the per-class table and how much fraud was caught
// Inputs: evaluation results
// Outputs: Prints formatted report to console
fn print_evaluation(evaluation: &Evaluation) {
    println!("Accuracy: {:.2}", evaluation.accuracy);
    println!("\n{:>12} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support");
    for class in &evaluation.classes {
        print_class_report(class);
    }
    let (precision, recall, f1) = evaluation.macro_average();
    println!(
        "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
        "macro avg", precision, recall, f1, evaluation.total
    );

    // Determine and display fraud catch rate
    if let Some(fraud) = evaluation.classes.iter().find(|c| c.label == 1) {
        let coverage = if fraud.recall >= HIGH_RECALL_THRESHOLD {"High"}
                       else if fraud.recall >= MEDIUM_RECALL_THRESHOLD {"Medium"}
                       else { "Low" };
        println!("\n  Fraud Coverage: {}", coverage);
    }
}

// Trains on one processed table and evaluates on another
// Inputs: train/test table paths, feature names and tree depth
// Outputs: Result indicating success or error
fn evaluate_model(args: &EvaluateArgs) -> Result<()> {
    let features: Vec<String> = if args.features.is_empty() {
        DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect()
    } else {
        args.features.clone()
    };

    let train_data = read_feature(&args.train, &features)?;
    let test_data = read_feature(&args.test, &features)?;

    println!("Decision tree (max depth {}) on [{}]", args.max_depth, features.join(", "));
    let model = train(&train_data, args.max_depth)?;
    let predicted = predict(&model, &test_data.records);
    print_evaluation(&evaluate(&test_data.labels, &predicted));
    Ok(())
}

fn read_feature(path: &Path, features: &[String]) -> Result<classifier::LabelledMatrix> {
    read_feature_matrix(path, features).with_context(|| format!("reading feature table {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Features(args) => derive_features(args),
        Command::Evaluate(args) => evaluate_model(args),
    }
}
