//! JSON Lines event ingest.
//!
//! One event per line (see `domain::Event` for the schema). Blank lines and lines
//! starting with `#` are ignored.
//!
//! Design goals:
//! - **Strict schema** per event (unknown structure is a row error, not a crash)
//! - **Row-level validation**: malformed events are skipped and reported, and the
//!   run continues with the rest
//! - **Deterministic behavior**: events keep file order

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::domain::Event;
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    /// 1-based line number in the input file.
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed events plus the rows that had to be skipped.
#[derive(Debug, Clone)]
pub struct IngestedEvents {
    pub events: Vec<Event>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load all events from a JSON Lines file.
pub fn load_events(path: &Path) -> Result<IngestedEvents, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open events '{}': {e}", path.display())))?;
    let ingested = read_events(BufReader::new(file))?;
    if ingested.events.is_empty() {
        return Err(AppError::input(format!(
            "No valid events in '{}' ({} rows read, {} rejected).",
            path.display(),
            ingested.rows_read,
            ingested.row_errors.len()
        )));
    }
    Ok(ingested)
}

/// Parse events from any buffered reader.
pub fn read_events<R: BufRead>(reader: R) -> Result<IngestedEvents, AppError> {
    let mut events = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| AppError::input(format!("Failed to read line {line_no}: {e}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        rows_read += 1;

        match parse_event(trimmed) {
            Ok(ev) => events.push(ev),
            Err(message) => {
                log::warn!("skipping event on line {line_no}: {message}");
                row_errors.push(RowError { line: line_no, message });
            }
        }
    }

    Ok(IngestedEvents {
        events,
        row_errors,
        rows_read,
    })
}

fn parse_event(line: &str) -> Result<Event, String> {
    let mut ev: Event = serde_json::from_str(line).map_err(|e| format!("JSON parse error: {e}"))?;
    if ev.btag.len() != ev.jets.len() {
        return Err(format!(
            "{} b-tag scores for {} jets (run {} event {})",
            ev.btag.len(),
            ev.jets.len(),
            ev.id.run,
            ev.id.event
        ));
    }
    if let Some(parton) = &ev.parton {
        if parton.len() != ev.jets.len() {
            return Err(format!(
                "{} parton labels for {} jets (run {} event {})",
                parton.len(),
                ev.jets.len(),
                ev.id.run,
                ev.id.event
            ));
        }
    }
    if !(ev.weight.is_finite() && ev.met.met.is_finite() && ev.met.met >= 0.0) {
        return Err(format!("non-finite weight or MET (run {} event {})", ev.id.run, ev.id.event));
    }
    if !ev.is_pt_ordered() {
        log::debug!("reordering jets by pT (run {} event {})", ev.id.run, ev.id.event);
        ev.sort_jets_by_pt();
    }
    Ok(ev)
}

/// Write events as JSON Lines.
pub fn write_events(path: &Path, events: &[Event]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create events '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    for ev in events {
        serde_json::to_writer(&mut out, ev)
            .map_err(|e| AppError::input(format!("Failed to serialize event: {e}")))?;
        writeln!(out).map_err(|e| AppError::input(format!("Failed to write events: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::input(format!("Failed to write events: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, MissingEnergy};
    use crate::math::lorentz::FourMomentum;

    fn event(n: u64) -> Event {
        Event {
            id: EventId { run: 1, lumi: 1, event: n },
            is_data: false,
            weight: 0.5,
            jets: vec![FourMomentum::from_pt_eta_phi_m(50.0, 0.1, 0.2, 5.0); 2],
            btag: vec![0.9, 0.1],
            parton: Some(vec![1, 0]),
            lepton: FourMomentum::from_pt_eta_phi_m(30.0, 0.0, -1.0, 0.0),
            met: MissingEnergy::new(70.0, 2.0),
        }
    }

    #[test]
    fn malformed_rows_are_skipped_and_reported() {
        let good = serde_json::to_string(&event(1)).unwrap();
        let mut short = event(2);
        short.btag.pop();
        let short = serde_json::to_string(&short).unwrap();
        let input = format!("# header comment\n{good}\n\n{short}\nnot json\n{good}\n");

        let ingested = read_events(input.as_bytes()).unwrap();
        assert_eq!(ingested.rows_read, 4);
        assert_eq!(ingested.events.len(), 2);
        let lines: Vec<usize> = ingested.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4, 5]);
    }

    #[test]
    fn write_then_load_preserves_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let events = vec![event(1), event(2)];
        write_events(&path, &events).unwrap();
        let loaded = load_events(&path).unwrap();
        assert_eq!(loaded.events, events);
        assert!(loaded.row_errors.is_empty());
    }

    #[test]
    fn unsorted_jets_are_loaded_in_pt_order() {
        let mut ev = event(1);
        ev.jets = vec![
            FourMomentum::from_pt_eta_phi_m(35.0, 0.1, 0.2, 5.0),
            FourMomentum::from_pt_eta_phi_m(80.0, -0.4, 1.2, 7.0),
        ];
        let line = serde_json::to_string(&ev).unwrap();
        let ingested = read_events(line.as_bytes()).unwrap();
        assert!(ingested.row_errors.is_empty());
        let loaded = &ingested.events[0];
        assert!(loaded.is_pt_ordered());
        assert_eq!(loaded.btag, vec![0.1, 0.9]);
        assert_eq!(loaded.parton, Some(vec![0, 1]));
    }

    #[test]
    fn empty_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");
        std::fs::write(&path, "\n# nothing\n").unwrap();
        assert_eq!(load_events(&path).unwrap_err().exit_code(), 2);
        assert_eq!(load_events(&dir.path().join("missing.jsonl")).unwrap_err().exit_code(), 2);
    }
}
