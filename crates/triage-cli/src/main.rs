//! Triage - molecular triage pipeline CLI
//!
//! The `triage` command runs candidate structures through the configured
//! evaluation units and decision rules.
//!
//! ## Commands
//!
//! - `run`: Evaluate one structure and print its run record
//! - `validate`: Check a SMILES string and print the validity report
//! - `batch`: Evaluate every structure listed in a file
//! - `config`: Print the effective configuration

mod config;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn, Level};

use config::TriageConfig;
use triage_chem::{check_smiles, Molecule};
use triage_core::Orchestrator;

#[derive(Parser)]
#[command(name = "triage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Sequential evaluation and rule-based triage of chemical structures",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true, env = "TRIAGE_LOG_JSON")]
    json: bool,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, global = true, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one structure and print the run record
    Run {
        /// Subject identifier
        #[arg(long)]
        id: String,

        /// Structure as SMILES
        #[arg(long)]
        smiles: String,

        /// Optional human-readable name
        #[arg(long)]
        name: Option<String>,
    },

    /// Check a SMILES string without running the pipeline
    Validate {
        /// Structure as SMILES
        smiles: String,
    },

    /// Evaluate every `<id> <smiles>` line of a file
    Batch {
        /// Input file; blank lines and `#` comments are skipped
        file: PathBuf,

        /// Concurrent subjects (overrides the config)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    triage_core::init_tracing(cli.json, level);

    let config = TriageConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { id, smiles, name } => cmd_run(&config, &id, &smiles, name.as_deref()),
        Commands::Validate { smiles } => cmd_validate(&smiles),
        Commands::Batch { file, jobs } => cmd_batch(&config, &file, jobs).await,
        Commands::Config => cmd_config(&config),
    }
}

/// Evaluate one structure
fn cmd_run(config: &TriageConfig, id: &str, smiles: &str, name: Option<&str>) -> Result<()> {
    let mut molecule = Molecule::new(id, smiles).context("Invalid subject")?;
    if let Some(name) = name {
        molecule = molecule.with_name(name);
    }
    let orchestrator = config.build_orchestrator()?;

    match orchestrator.run(molecule.molecule_id(), molecule.to_raw_input()) {
        Ok(record) => {
            println!("{}", serde_json::to_string_pretty(&record.to_value())?);
            Ok(())
        }
        Err(aborted) => {
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&aborted.record.to_value())?
            );
            Err(aborted).context("Triage run aborted")
        }
    }
}

/// Check a SMILES string
fn cmd_validate(smiles: &str) -> Result<()> {
    let report = check_smiles(smiles);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_valid {
        bail!(
            "Invalid SMILES: {}",
            report.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &TriageConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// One subject line of a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BatchEntry {
    line: usize,
    id: String,
    smiles: String,
}

/// Per-category counts printed after a batch.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct BatchTally {
    total: usize,
    categories: BTreeMap<String, usize>,
    aborted: usize,
}

/// Evaluate every structure listed in a file
async fn cmd_batch(config: &TriageConfig, file: &Path, jobs: Option<usize>) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let entries = parse_batch(&text)?;
    let jobs = jobs.unwrap_or(config.jobs).max(1);
    let orchestrator = Arc::new(config.build_orchestrator()?);

    info!(subjects = entries.len(), jobs, "batch started");
    let tally = run_batch(orchestrator, entries, jobs, |line| println!("{line}")).await?;
    info!(
        total = tally.total,
        aborted = tally.aborted,
        "batch finished"
    );
    println!("{}", json!({ "summary": tally }));
    Ok(())
}

fn parse_batch(text: &str) -> Result<Vec<BatchEntry>> {
    let mut entries = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(id), Some(smiles), None) = (fields.next(), fields.next(), fields.next()) else {
            bail!("Line {}: expected `<id> <smiles>`, got {line:?}", index + 1);
        };
        entries.push(BatchEntry {
            line: index + 1,
            id: id.to_string(),
            smiles: smiles.to_string(),
        });
    }
    Ok(entries)
}

/// Run entries on blocking workers, at most `jobs` in flight, emitting one
/// JSON line per subject in input order.
async fn run_batch(
    orchestrator: Arc<Orchestrator>,
    entries: Vec<BatchEntry>,
    jobs: usize,
    mut emit: impl FnMut(&Value),
) -> Result<BatchTally> {
    let mut outcomes = stream::iter(entries)
        .map(|entry| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::task::spawn_blocking(move || evaluate_entry(&orchestrator, entry))
        })
        .buffered(jobs);

    let mut tally = BatchTally::default();
    while let Some(joined) = outcomes.next().await {
        let (line, category) = joined.context("Batch worker panicked")?;
        tally.total += 1;
        match category {
            Some(category) => *tally.categories.entry(category).or_default() += 1,
            None => tally.aborted += 1,
        }
        emit(&line);
    }
    Ok(tally)
}

fn evaluate_entry(orchestrator: &Orchestrator, entry: BatchEntry) -> (Value, Option<String>) {
    match orchestrator.run(entry.id.as_str(), json!(entry.smiles)) {
        Ok(record) => {
            let decision = record.decision().map(|d| (d.category(), d.rationale()));
            let category = decision.map(|(c, _)| c.to_string());
            let line = json!({
                "subject_id": record.subject_id(),
                "category": category,
                "rationale": decision.map(|(_, r)| r),
                "terminated": record.is_terminated(),
                "results": record.result_names(),
            });
            (line, category)
        }
        Err(aborted) => {
            warn!(
                line = entry.line,
                subject_id = %entry.id,
                error = %aborted.source,
                "subject aborted"
            );
            let line = json!({
                "subject_id": entry.id,
                "aborted": aborted.to_string(),
            });
            (line, None)
        }
    }
}
