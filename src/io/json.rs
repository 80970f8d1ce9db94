//! JSON documents: reconstruction config files and candidate dumps.
//!
//! A candidate dump is the "portable" view of a run: run metadata, the configuration
//! used, and the full (sorted) candidate list of every selected event.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Candidate, EventId, RecoConfig};
use crate::error::AppError;

/// Candidates of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCandidates {
    pub id: EventId,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDump {
    pub tool: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub config: RecoConfig,
    pub events: Vec<EventCandidates>,
}

impl CandidateDump {
    pub fn new(config: &RecoConfig, events: Vec<EventCandidates>) -> Self {
        Self {
            tool: "topreco".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            config: config.clone(),
            events,
        }
    }
}

/// Write a candidate dump JSON file.
pub fn write_candidate_json(path: &Path, dump: &CandidateDump) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create candidate JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), dump)
        .map_err(|e| AppError::input(format!("Failed to write candidate JSON: {e}")))?;
    Ok(())
}

/// Read a candidate dump JSON file.
pub fn read_candidate_json(path: &Path) -> Result<CandidateDump, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open candidate JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::input(format!("Invalid candidate JSON: {e}")))
}

/// Read a reconstruction config. Missing fields take their defaults.
pub fn read_config_json(path: &Path) -> Result<RecoConfig, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open config '{}': {e}", path.display())))?;
    let config: RecoConfig = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::input(format!("Invalid config '{}': {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_dump_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cands.json");
        let cand = Candidate {
            o: 1,
            b: 0,
            i: 2,
            j: 3,
            c1: 1.03,
            c2: 0.97,
            chi2: 2.5,
            mt2b: 160.0,
            mt2bl: 120.0,
            mt2w: 175.0,
            truth_match: true,
        };
        let dump = CandidateDump::new(
            &RecoConfig::default(),
            vec![EventCandidates {
                id: EventId { run: 1, lumi: 1, event: 9 },
                candidates: vec![cand],
            }],
        );
        write_candidate_json(&path, &dump).unwrap();
        assert_eq!(read_candidate_json(&path).unwrap(), dump);
    }

    #[test]
    fn config_file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"btag_required": true, "pt_min_b": 40}"#).unwrap();
        let cfg = read_config_json(&path).unwrap();
        assert!(cfg.btag_required);
        assert_eq!(cfg.pt_min_b, 40.0);

        std::fs::write(&path, r#"{"top_mass": 50.0}"#).unwrap();
        assert_eq!(read_config_json(&path).unwrap_err().exit_code(), 2);
    }
}
