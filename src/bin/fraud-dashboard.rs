//! Fraud dashboard command line
//!
//! Scores transactions, profiles CSV datasets and manages the local history.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fraud_dashboard::mock_scorer::format_amount;
use fraud_dashboard::store::LocalStore;
use fraud_dashboard::{
    analyze, process_upload, DashboardConfig, Dataset, MockScorer, Prediction, Predictor,
    RuleEngine, ServiceError, TransactionForm, TransactionInput,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Fraud dashboard core - score transactions and analyze datasets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Local store file holding history, profile and settings
    #[arg(long, global = true, default_value = "fraud_dashboard_store.json")]
    store: PathBuf,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a single transaction
    Score {
        #[command(flatten)]
        transaction: TransactionArgs,

        /// Seed for the offline scorer
        #[arg(long)]
        seed: Option<u64>,

        /// Save the prediction to the history
        #[arg(long)]
        save: bool,

        /// JSON file holding a prediction service response
        #[arg(long, value_name = "FILE")]
        response: Option<PathBuf>,
    },
    /// Profile a CSV dataset
    Analyze {
        #[arg(value_name = "CSV")]
        path: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score every row of a transaction CSV and save the results
    Bulk {
        #[arg(value_name = "CSV")]
        path: PathBuf,

        /// Seed for the offline scorer
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Evaluate the backend rule engine against a model probability
    Rules {
        #[command(flatten)]
        transaction: TransactionArgs,

        /// Fraud probability reported by the model
        #[arg(long, default_value_t = 0.5)]
        model_probability: f64,

        /// Average amount for the user; defaults to the history average
        #[arg(long)]
        user_avg: Option<f64>,
    },
    /// Manage the saved transaction history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// Export the history as CSV
    Export {
        #[arg(value_name = "OUT")]
        path: PathBuf,
    },
    /// Show aggregate history figures
    Stats,
    /// Delete every saved entry
    Clear,
}

#[derive(Args, Debug)]
struct TransactionArgs {
    /// Transaction amount
    #[arg(long)]
    amount: String,

    /// KYC status (yes/no)
    #[arg(long, default_value = "yes")]
    kyc: String,

    /// Account age in days
    #[arg(long)]
    account_age: String,

    /// Channel (domestic, international, online, atm, mobile)
    #[arg(long, default_value = "online")]
    channel: String,

    /// ISO-8601 timestamp
    #[arg(long)]
    timestamp: String,
}

impl TransactionArgs {
    fn validate(&self) -> Result<TransactionInput> {
        let form = TransactionForm {
            amount: self.amount.clone(),
            kyc_verified: self.kyc.clone(),
            account_age_days: self.account_age.clone(),
            channel: self.channel.clone(),
            timestamp: self.timestamp.clone(),
        };
        Ok(form.validate()?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DashboardConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DashboardConfig::load().context("Failed to load config")?,
    };

    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("fraud_dashboard={}", level).parse()?),
        )
        .init();
    debug!(?config, "Configuration loaded");

    match cli.command {
        Command::Score {
            transaction,
            seed,
            save,
            response,
        } => score(&config, &cli.store, &transaction, seed, save, response.as_deref()),
        Command::Analyze { path, json } => analyze_dataset(&path, json),
        Command::Bulk { path, seed } => bulk(&config, &cli.store, &path, seed),
        Command::Rules {
            transaction,
            model_probability,
            user_avg,
        } => rules(&config, &cli.store, &transaction, model_probability, user_avg),
        Command::History { action } => history(&config, &cli.store, action),
    }
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn score(
    config: &DashboardConfig,
    store_path: &Path,
    transaction: &TransactionArgs,
    seed: Option<u64>,
    save: bool,
    response: Option<&Path>,
) -> Result<()> {
    let input = transaction.validate()?;

    let response: Option<Value> = match response {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(serde_json::from_str(&text).context("Response file is not valid JSON")?)
        }
        None => None,
    };
    let service = move |_: &TransactionInput| -> Result<Value, ServiceError> {
        response
            .clone()
            .ok_or_else(|| ServiceError::Unreachable("no prediction backend configured".to_string()))
    };

    let scorer = MockScorer::with_config(config.scorer.clone());
    let mut predictor = Predictor::new(service, scorer, rng_from(seed));
    let prediction = predictor.predict(&input);
    print_prediction(&input, &prediction);

    if save {
        let mut store = LocalStore::open(store_path)?;
        let mut history = store.history(&config.history)?;
        let id = history.record(&input, &prediction);
        store.save_history(&history)?;
        println!("\nSaved as {}", id);
    }

    Ok(())
}

fn print_prediction(input: &TransactionInput, prediction: &Prediction) {
    let verdict = &prediction.verdict;
    println!("=== Fraud Prediction ===\n");
    println!("   Amount: {}", format_amount(input.amount));
    println!("   Channel: {}", input.channel);
    println!("   Status: {}", verdict.status());
    println!("   Risk Score: {:.1}%", verdict.risk_score * 100.0);
    if prediction.is_fallback() {
        println!("   Source: offline scorer");
    }
    if let Some(severity) = prediction.alert_severity() {
        println!("   Alert: {}", severity);
    }
    if verdict.rules_triggered.is_empty() {
        println!("   Rules Triggered: none");
    } else {
        println!("   Rules Triggered:");
        for rule in &verdict.rules_triggered {
            println!("     - {}", rule);
        }
    }
    println!("   Explanation: {}", verdict.explanation);
}

fn analyze_dataset(path: &Path, json: bool) -> Result<()> {
    let dataset = Dataset::from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if dataset.is_empty() {
        bail!("{} contains no data rows", path.display());
    }

    let report = analyze(&dataset);
    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("=== Dataset Report: {} ===\n", path.display());
    println!("   Rows: {}", report.basic.total_rows);
    println!("   Columns: {}", report.basic.total_columns);
    println!(
        "   Cells: {} ({} empty)",
        report.basic.total_cells, report.basic.empty_cells
    );
    println!(
        "   Quality: {:.1}% overall (completeness {:.1}%, consistency {:.1}%, uniqueness {:.1}%)",
        report.quality.overall,
        report.quality.completeness,
        report.quality.consistency,
        report.quality.uniqueness
    );

    println!("\n   Columns:");
    for column in &report.columns {
        println!(
            "     {:<24} {:<8} {} unique / {} values",
            column.name, column.inferred_type, column.unique_count, column.total_non_empty
        );
    }

    if !report.distributions.is_empty() {
        println!("\n   Numeric distributions:");
        for d in &report.distributions {
            println!(
                "     {:<24} min {:.2}  max {:.2}  mean {:.2}  median {:.2}  sd {:.2}",
                d.column, d.min, d.max, d.mean, d.median, d.std_dev
            );
        }
    }

    let strong = report.correlation.strong_pairs(0.7);
    if !strong.is_empty() {
        println!("\n   Strong correlations:");
        for (a, b, r) in strong {
            println!("     {} / {}: {:.3}", a, b, r);
        }
    }

    let missing: Vec<_> = report.missing.iter().filter(|m| m.missing > 0).collect();
    if !missing.is_empty() {
        println!("\n   Missing values:");
        for m in missing {
            println!("     {:<24} {} ({:.1}%)", m.column, m.missing, m.percentage);
        }
    }

    if let Some(fraud) = &report.fraud {
        println!(
            "\n   Fraud label '{}': {} fraud, {} legitimate ({:.2}%)",
            fraud.column, fraud.fraud_count, fraud.legitimate_count, fraud.fraud_ratio
        );
    }

    Ok(())
}

fn bulk(config: &DashboardConfig, store_path: &Path, path: &Path, seed: Option<u64>) -> Result<()> {
    let dataset = Dataset::from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut store = LocalStore::open(store_path)?;
    let mut history = store.history(&config.history)?;
    let scorer = MockScorer::with_config(config.scorer.clone());
    let mut predictor = Predictor::new(
        fraud_dashboard::OfflineService,
        scorer,
        rng_from(seed),
    );

    let result = process_upload(&dataset, &mut predictor, &mut history)?;
    store.save_history(&history)?;
    info!(upload_id = %result.upload_id, "Upload saved to history");

    println!("{}", result.message());
    println!("   Total rows: {}", result.total_rows);
    println!("   Fraud: {}", result.fraud_count);
    println!("   Legitimate: {}", result.legitimate_count);
    println!("   Errors: {}", result.error_count);
    for error in &result.errors {
        println!("     {}", error);
    }
    println!("   Time: {:.1} ms", result.processing_time_ms);
    Ok(())
}

fn rules(
    config: &DashboardConfig,
    store_path: &Path,
    transaction: &TransactionArgs,
    model_probability: f64,
    user_avg: Option<f64>,
) -> Result<()> {
    if !(0.0..=1.0).contains(&model_probability) {
        bail!("Model probability must be between 0 and 1");
    }
    let input = transaction.validate()?;

    let user_avg = match user_avg {
        Some(avg) => avg,
        None => LocalStore::open(store_path)?
            .history(&config.history)?
            .average_amount()
            .unwrap_or(config.rules.default_user_average),
    };

    let engine = RuleEngine::with_config(config.rules.clone());
    let evaluation = engine.evaluate(&input, user_avg);
    let verdict = engine.combine(model_probability, &evaluation);

    println!("=== Rule Engine ===\n");
    println!("   User average: {}", format_amount(user_avg));
    for rule in engine.active_rules() {
        let mark = if evaluation.triggered.contains(&rule) {
            "x"
        } else {
            " "
        };
        println!("   [{}] {:<16} {}", mark, rule.name(), rule.description());
    }
    println!("\n   Rule score: {:.2}", evaluation.score);
    println!("   Combined risk: {:.3}", verdict.risk_score);
    println!("   Status: {}", verdict.status());
    println!("   Reason: {}", verdict.explanation);
    Ok(())
}

fn history(config: &DashboardConfig, store_path: &Path, action: HistoryAction) -> Result<()> {
    let mut store = LocalStore::open(store_path)?;
    let mut history = store.history(&config.history)?;

    match action {
        HistoryAction::Export { path } => {
            let rows = history
                .export_to_path(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {} transactions to {}", rows, path.display());
        }
        HistoryAction::Stats => {
            let stats = history.stats();
            println!("=== Transaction History ===\n");
            println!("   Transactions: {}", stats.total_transactions);
            println!("   Fraud: {} ({:.1}%)", stats.fraud_count, stats.fraud_rate);
            println!("   Legitimate: {}", stats.legitimate_count);
            println!("   Total amount: {}", format_amount(stats.total_amount));
            println!("   Average amount: {}", format_amount(stats.avg_amount));
            println!("   Average risk: {:.1}%", stats.avg_risk_score * 100.0);
            println!("   Offline predictions: {}", stats.offline_predictions);
        }
        HistoryAction::Clear => {
            let removed = history.len();
            history.clear();
            store.save_history(&history)?;
            println!("Cleared {} transactions", removed);
        }
    }
    Ok(())
}
