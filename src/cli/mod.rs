//! Command-line parsing for the top-quark reconstruction tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the reconstruction code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "topreco",
    version,
    about = "Hadronic top reconstruction and MT2 variables for semileptonic ttbar events"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconstruct every selected event of a JSON Lines file and export per-event results.
    Run(RunArgs),
    /// Generate a synthetic semileptonic ttbar event file.
    Simulate(SimArgs),
}

/// Options for the reconstruction run.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Input events (JSON Lines).
    #[arg(value_name = "EVENTS")]
    pub input: PathBuf,

    /// Per-event results CSV.
    #[arg(short = 'o', long, default_value = "topreco_results.csv")]
    pub output: PathBuf,

    /// Reconstruction settings (JSON). Unset keys keep their defaults.
    #[arg(short = 'c', long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Jet resolution table (JSON) replacing the built-in parametrization.
    #[arg(long, value_name = "JSON")]
    pub resolution: Option<PathBuf>,

    /// Bad-calibration event list (`run event lumi` per line).
    #[arg(long, value_name = "FILE")]
    pub bad_events: Option<PathBuf>,

    /// Also dump every candidate of every event to JSON.
    #[arg(long, value_name = "JSON")]
    pub candidates: Option<PathBuf>,

    /// Require at least one b-tagged b role per candidate.
    #[arg(long)]
    pub btag_required: bool,

    /// Keep only candidates with a b-tagged hadronic or leptonic b.
    #[arg(long)]
    pub btagged_only: bool,

    /// Keep candidates in generation order instead of sorting by chi2.
    #[arg(long)]
    pub no_sort: bool,

    /// Minimum pT of both W jets (GeV).
    #[arg(long)]
    pub pt_min_w: Option<f64>,

    /// Minimum pT of untagged b jets (GeV).
    #[arg(long)]
    pub pt_min_b: Option<f64>,

    /// Minimum missing transverse energy for event selection (GeV).
    #[arg(long)]
    pub min_met: Option<f64>,

    /// Worker threads (0 = one per core).
    #[arg(short = 'j', long, default_value_t = 0)]
    pub threads: usize,
}

/// Options for synthetic event generation.
#[derive(Debug, Parser, Clone)]
pub struct SimArgs {
    /// Output events (JSON Lines).
    #[arg(short = 'o', long, default_value = "events.jsonl")]
    pub output: PathBuf,

    /// Number of events to generate.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub events: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Mean number of extra (radiation) jets per event.
    #[arg(long, default_value_t = 1.0)]
    pub extra_jets: f64,

    /// Fraction of events flagged as real data (no truth labels).
    #[arg(long, default_value_t = 0.0)]
    pub data_fraction: f64,

    /// Jet resolution table (JSON) used for smearing.
    #[arg(long, value_name = "JSON")]
    pub resolution: Option<PathBuf>,
}
