//! BrainBox CLI
//!
//! Command-line interface for exercising the Hebbian memory engine directly,
//! in the style of the host plugin that normally drives it from tool-call
//! hooks: record an access, recall candidates for a query, run a decay pass,
//! or print graph stats.

use std::path::PathBuf;

use brainbox_core::{ActivationPath, Engine, NeuronType};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use directories::ProjectDirs;

/// BrainBox — Hebbian memory engine CLI
#[derive(Parser)]
#[command(name = "brainbox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the BrainBox Hebbian memory engine")]
struct Cli {
    /// Path to the database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum NeuronTypeArg {
    File,
    Tool,
    Error,
    Semantic,
}

impl From<NeuronTypeArg> for NeuronType {
    fn from(value: NeuronTypeArg) -> Self {
        match value {
            NeuronTypeArg::File => NeuronType::File,
            NeuronTypeArg::Tool => NeuronType::Tool,
            NeuronTypeArg::Error => NeuronType::Error,
            NeuronTypeArg::Semantic => NeuronType::Semantic,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Record an access to a neuron
    Record {
        /// Filesystem path, tool name, error signature, or fact text
        path: String,
        /// Kind of neuron being recorded
        #[arg(long, value_enum, default_value_t = NeuronTypeArg::File)]
        neuron_type: NeuronTypeArg,
        /// Context string (the query or surrounding text for this access)
        #[arg(long)]
        context: Option<String>,
    },

    /// Recall candidates for a query via spreading activation
    Recall {
        /// Query text to seed the keyword search
        query: String,
        /// Kind of neuron to recall
        #[arg(long, value_enum, default_value_t = NeuronTypeArg::File)]
        neuron_type: NeuronTypeArg,
        /// Maximum results to return
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Apply one decay/prune pass over the graph
    Decay,

    /// Show graph-wide statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };
    let engine = Engine::open(db_path)?;

    match cli.command {
        Commands::Record { path, neuron_type, context } => {
            run_record(&engine, &path, neuron_type.into(), context.as_deref())
        }
        Commands::Recall { query, neuron_type, limit } => {
            run_recall(&engine, &query, neuron_type.into(), limit)
        }
        Commands::Decay => run_decay(&engine),
        Commands::Stats => run_stats(&engine),
    }
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("dev", "brainbox", "brainbox")
        .ok_or_else(|| anyhow::anyhow!("could not determine platform data directory"))?;
    Ok(proj_dirs.data_dir().join("brainbox.db"))
}

fn run_record(engine: &Engine, path: &str, neuron_type: NeuronType, context: Option<&str>) -> anyhow::Result<()> {
    engine.record(path, neuron_type, context)?;
    println!("{} recorded {} ({})", "OK".green().bold(), path, neuron_type);
    Ok(())
}

fn run_recall(engine: &Engine, query: &str, neuron_type: NeuronType, limit: usize) -> anyhow::Result<()> {
    let results = engine.recall(query, neuron_type, limit);
    println!("{}", format!("=== Recall: \"{query}\" ===").cyan().bold());
    println!();
    if results.is_empty() {
        println!("{}", "No candidates matched.".dimmed());
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        let path_label = match result.activation_path {
            ActivationPath::Direct => "direct".green(),
            ActivationPath::Spread => "spread".yellow(),
            ActivationPath::Myelinated => "myelinated".magenta(),
        };
        println!(
            "{:>2}. {:<40} confidence={:.3} via={}",
            rank + 1,
            result.neuron.path,
            result.confidence,
            path_label
        );
    }
    Ok(())
}

fn run_decay(engine: &Engine) -> anyhow::Result<()> {
    let report = engine.decay()?;
    println!("{}", "=== Decay ===".cyan().bold());
    println!("{}: {}", "Synapses pruned".white().bold(), report.pruned_synapses);
    println!("{}: {}", "Neurons pruned".white().bold(), report.pruned_neurons);
    Ok(())
}

fn run_stats(engine: &Engine) -> anyhow::Result<()> {
    let stats = engine.stats()?;
    println!("{}", "=== BrainBox Stats ===".cyan().bold());
    println!("{}: {}", "Neurons".white().bold(), stats.neuron_count);
    println!("{}: {}", "Synapses".white().bold(), stats.synapse_count);
    println!("{}: {}", "Superhighways".white().bold(), stats.superhighways);
    println!("{}: {}", "Total accesses".white().bold(), stats.total_accesses);
    println!("{}: {:.3}", "Average myelination".white().bold(), stats.avg_myelination);
    Ok(())
}
