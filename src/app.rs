//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - generates synthetic event files
//! - runs the reconstruction pipeline
//! - prints the run summary and writes exports

use clap::Parser;

use crate::cli::{Command, RunArgs, SimArgs};
use crate::domain::{RecoConfig, RunConfig, SimConfig};
use crate::error::AppError;
use crate::models::resolution::ParametrizedResolution;

pub mod pipeline;

/// Entry point for the `topreco` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; RUST_LOG may come from the environment as well.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = crate::cli::Cli::parse_from(std::env::args());
    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_reco(&config)?;

    let digest = crate::report::digest(&run.summaries);
    println!(
        "{}",
        crate::report::format_run_summary(&config, &run.stats, &digest, chrono::Utc::now())
    );

    crate::io::export::write_results_csv(&config.output, &run.summaries)?;
    log::info!("wrote {} rows to {}", run.summaries.len(), config.output.display());

    if let Some(path) = &config.candidates_out {
        let dump = crate::io::json::CandidateDump::new(&config.reco, run.candidates);
        crate::io::json::write_candidate_json(path, &dump)?;
        log::info!("wrote candidates of {} events to {}", dump.events.len(), path.display());
    }

    Ok(())
}

fn handle_simulate(args: SimArgs) -> Result<(), AppError> {
    let config = SimConfig {
        output: args.output.clone(),
        events: args.events,
        seed: args.seed,
        extra_jets_mean: args.extra_jets,
        data_fraction: args.data_fraction,
    };
    let resolution = match &args.resolution {
        Some(path) => ParametrizedResolution::from_json_file(path)?,
        None => ParametrizedResolution::default(),
    };

    let events = crate::data::sample::simulate_events(&config, &resolution)?;
    crate::io::ingest::write_events(&config.output, &events)?;
    println!("Wrote {} events to {}", events.len(), config.output.display());
    Ok(())
}

/// Resolve the reconstruction settings: config file first, then CLI overrides.
pub fn run_config_from_args(args: &RunArgs) -> Result<RunConfig, AppError> {
    let mut reco = match &args.config {
        Some(path) => crate::io::json::read_config_json(path)?,
        None => RecoConfig::default(),
    };
    if args.btag_required {
        reco.btag_required = true;
    }
    if args.btagged_only {
        reco.btagged_candidates_only = true;
    }
    if args.no_sort {
        reco.sort_by_chi2 = false;
    }
    if let Some(pt) = args.pt_min_w {
        reco.pt_min_w1 = pt;
        reco.pt_min_w2 = pt;
    }
    if let Some(pt) = args.pt_min_b {
        reco.pt_min_b = pt;
        reco.pt_min_o = pt;
    }
    if let Some(met) = args.min_met {
        reco.min_met = met;
    }
    reco.validate()?;

    Ok(RunConfig {
        input: args.input.clone(),
        output: args.output.clone(),
        candidates_out: args.candidates.clone(),
        bad_events: args.bad_events.clone(),
        resolution: args.resolution.clone(),
        reco,
        threads: args.threads,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Command {
        crate::cli::Cli::parse_from(argv.iter().copied()).command
    }

    #[test]
    fn cli_overrides_apply_on_top_of_defaults() {
        let Command::Run(args) = parse(&["topreco", "run", "ev.jsonl", "--btag-required", "--btagged-only", "--pt-min-w", "25", "--no-sort"])
        else {
            panic!("expected run subcommand");
        };
        let cfg = run_config_from_args(&args).unwrap();
        assert!(cfg.reco.btag_required);
        assert!(cfg.reco.btagged_candidates_only);
        assert!(!cfg.reco.sort_by_chi2);
        assert_eq!(cfg.reco.pt_min_w1, 25.0);
        assert_eq!(cfg.reco.pt_min_w2, 25.0);
        assert_eq!(cfg.reco.pt_min_b, 30.0);
        assert_eq!(cfg.output.to_str(), Some("topreco_results.csv"));
    }

    #[test]
    fn negative_override_is_input_error() {
        let Command::Run(args) = parse(&["topreco", "run", "ev.jsonl", "--min-met=-5"]) else {
            panic!("expected run subcommand");
        };
        assert_eq!(run_config_from_args(&args).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn config_file_is_merged_before_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reco.json");
        std::fs::write(&path, r#"{"top_mass": 172.5, "btag_min": 0.5}"#).unwrap();
        let path_str = path.to_str().unwrap();
        let Command::Run(args) = parse(&["topreco", "run", "ev.jsonl", "-c", path_str, "--min-met", "20"]) else {
            panic!("expected run subcommand");
        };
        let cfg = run_config_from_args(&args).unwrap();
        assert_eq!(cfg.reco.top_mass, 172.5);
        assert_eq!(cfg.reco.btag_min, 0.5);
        assert_eq!(cfg.reco.min_met, 20.0);
    }
}
