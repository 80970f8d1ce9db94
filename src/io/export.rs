//! Export per-event results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.
//! Quantities that could not be computed carry the `-0.999` sentinel; a missing truth
//! rank is left empty.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::EventSummary;
use crate::error::AppError;

pub const RESULTS_HEADER: &str =
    "run,lumi,event,is_data,weight,met,mt,chi2,mt2b,mt2bl,mt2w,njets,nb,lep1pt,lep1eta,ncand,truth_rank";

/// Write per-event results to a CSV file.
pub fn write_results_csv(path: &Path, rows: &[EventSummary]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_results(&mut out, rows)?;
    out.flush()
        .map_err(|e| AppError::input(format!("Failed to write export CSV: {e}")))?;
    Ok(())
}

pub fn write_results<W: Write>(out: &mut W, rows: &[EventSummary]) -> Result<(), AppError> {
    writeln!(out, "{RESULTS_HEADER}")
        .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;

    for r in rows {
        writeln!(
            out,
            "{},{},{},{},{:.6},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{},{},{:.4},{:.4},{},{}",
            r.id.run,
            r.id.lumi,
            r.id.event,
            u8::from(r.is_data),
            r.weight,
            r.met,
            r.mt,
            r.best.chi2,
            r.best.mt2b,
            r.best.mt2bl,
            r.best.mt2w,
            r.njets,
            r.nb,
            r.lep1_pt,
            r.lep1_eta,
            r.n_candidates,
            r.truth_rank.map(|k| k.to_string()).unwrap_or_default(),
        )
        .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
