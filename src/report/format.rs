//! Formatted terminal output.
//!
//! We keep formatting code in one place so the reconstruction code stays clean and
//! output changes are localized.

use chrono::{DateTime, Utc};

use crate::app::pipeline::RunStats;
use crate::domain::RunConfig;
use crate::report::{RecoDigest, TRUTH_RANK_BINS};

/// Format the full run summary (inputs, event flow, result digest).
pub fn format_run_summary(config: &RunConfig, stats: &RunStats, digest: &RecoDigest, at: DateTime<Utc>) -> String {
    let mut out = String::new();

    out.push_str("=== topreco - hadronic top reconstruction ===\n");
    out.push_str(&format!("Run at: {}\n", at.format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str(&format!("Input: {}\n", config.input.display()));
    out.push_str(&format!(
        "Masses: W={:.3} top={:.3} GeV | b-tag wp={:.3} | b-tag required: {}\n",
        config.reco.w_mass,
        config.reco.top_mass,
        config.reco.selection_btag_wp,
        if config.reco.btag_required { "yes" } else { "no" }
    ));

    out.push_str("\nEvent flow:\n");
    out.push_str(&format!("  rows rejected     {:>8}\n", stats.rows_rejected));
    out.push_str(&format!("  events read       {:>8}\n", stats.events_read));
    out.push_str(&format!("  duplicates        {:>8}\n", stats.duplicates));
    out.push_str(&format!("  bad calibration   {:>8}\n", stats.bad_calibration));
    out.push_str(&format!("  failed selection  {:>8}\n", stats.failed_selection));
    out.push_str(&format!("  malformed         {:>8}\n", stats.malformed));
    out.push_str(&format!("  reconstructed     {:>8}\n", stats.reconstructed));

    out.push_str("\nResults:\n");
    out.push_str(&format!(
        "  events={} (data {}) | sum of weights={:.3}\n",
        digest.events, digest.data_events, digest.weighted
    ));
    out.push_str(&format!(
        "  candidates/event={:.2} | no valid candidate: {}\n",
        digest.mean_candidates, digest.sentinel_events
    ));
    out.push_str(&format!(
        "  mean best chi2={} | mean best MT2W={}\n",
        fmt_opt(digest.mean_chi2),
        fmt_opt(digest.mean_mt2w)
    ));

    out.push_str(&format_truth_ranks(digest));
    out
}

/// Chi2 rank of the truth-matched candidate, as a text histogram.
pub fn format_truth_ranks(digest: &RecoDigest) -> String {
    let mut out = String::new();
    let Some(eff) = digest.truth_efficiency() else {
        return out;
    };

    out.push_str(&format!(
        "\nTruth rank ({} matched events, best = truth {:.1}%):\n",
        digest.truth_events,
        100.0 * eff
    ));
    for (k, &n) in digest.truth_rank.iter().enumerate() {
        let label = if k + 1 == TRUTH_RANK_BINS {
            format!("{k}+")
        } else {
            k.to_string()
        };
        let frac = n as f64 / digest.truth_events as f64;
        let bar = "#".repeat((frac * 40.0).round() as usize);
        out.push_str(&format!("  {label:>3} {n:>8} {bar}\n"));
    }
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.3}")).unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;

    use super::*;
    use crate::domain::RecoConfig;

    fn config() -> RunConfig {
        RunConfig {
            input: PathBuf::from("events.jsonl"),
            output: PathBuf::from("out.csv"),
            candidates_out: None,
            bad_events: None,
            resolution: None,
            reco: RecoConfig::default(),
            threads: 0,
        }
    }

    #[test]
    fn summary_lists_event_flow() {
        let stats = RunStats {
            events_read: 10,
            duplicates: 1,
            failed_selection: 4,
            reconstructed: 5,
            ..RunStats::default()
        };
        let digest = crate::report::digest(&[]);
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let text = format_run_summary(&config(), &stats, &digest, at);
        assert!(text.contains("Run at: 2024-03-01 12:00:00 UTC"));
        assert!(text.contains("failed selection         4"));
        assert!(text.contains("mean best chi2=n/a"));
        assert!(!text.contains("Truth rank"));
    }

    #[test]
    fn truth_histogram_labels_overflow_bin() {
        let mut digest = crate::report::digest(&[]);
        digest.truth_events = 4;
        digest.truth_rank = [2, 1, 0, 0, 1];
        let text = format_truth_ranks(&digest);
        assert!(text.contains("best = truth 50.0%"));
        assert!(text.contains("  4+        1 ##########"));
    }
}
