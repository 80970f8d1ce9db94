//! Reporting utilities: run digests and formatted terminal output.

use crate::domain::EventSummary;

pub mod format;

pub use format::*;

/// Ranks at or above this are folded into the last histogram bin.
pub const TRUTH_RANK_BINS: usize = 5;

/// Aggregate view of the reconstructed events.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoDigest {
    pub events: usize,
    pub data_events: usize,
    /// Sum of event weights.
    pub weighted: f64,
    /// Events whose every best value is the sentinel.
    pub sentinel_events: usize,
    pub mean_candidates: f64,
    pub mean_chi2: Option<f64>,
    pub mean_mt2w: Option<f64>,
    /// Simulated events that had a truth-matched candidate.
    pub truth_events: usize,
    /// `truth_rank[k]`: events whose truth candidate had chi2 rank `k`; the last bin
    /// collects every rank from `TRUTH_RANK_BINS - 1` up.
    pub truth_rank: [usize; TRUTH_RANK_BINS],
}

impl RecoDigest {
    /// Fraction of truth-matched events where the best-chi2 candidate was the truth.
    pub fn truth_efficiency(&self) -> Option<f64> {
        (self.truth_events > 0).then(|| self.truth_rank[0] as f64 / self.truth_events as f64)
    }
}

/// Compute the digest. Sentinel values are excluded from the means.
pub fn digest(summaries: &[EventSummary]) -> RecoDigest {
    let mut out = RecoDigest {
        events: summaries.len(),
        data_events: 0,
        weighted: 0.0,
        sentinel_events: 0,
        mean_candidates: 0.0,
        mean_chi2: None,
        mean_mt2w: None,
        truth_events: 0,
        truth_rank: [0; TRUTH_RANK_BINS],
    };

    let mut chi2 = Vec::new();
    let mut mt2w = Vec::new();
    let mut n_cand = 0usize;
    for s in summaries {
        if s.is_data {
            out.data_events += 1;
        }
        out.weighted += s.weight;
        n_cand += s.n_candidates;
        if s.best.is_sentinel() {
            out.sentinel_events += 1;
        }
        if s.best.chi2 >= 0.0 {
            chi2.push(s.best.chi2);
        }
        if s.best.mt2w >= 0.0 {
            mt2w.push(s.best.mt2w);
        }
        if let Some(rank) = s.truth_rank {
            out.truth_events += 1;
            out.truth_rank[rank.min(TRUTH_RANK_BINS - 1)] += 1;
        }
    }

    if !summaries.is_empty() {
        out.mean_candidates = n_cand as f64 / summaries.len() as f64;
    }
    out.mean_chi2 = mean(&chi2);
    out.mean_mt2w = mean(&mt2w);
    out
}

fn mean(xs: &[f64]) -> Option<f64> {
    (!xs.is_empty()).then(|| xs.iter().sum::<f64>() / xs.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, EventResult};

    fn summary(event: u64, chi2: f64, truth_rank: Option<usize>) -> EventSummary {
        let best = if chi2 < 0.0 {
            EventResult::sentinel()
        } else {
            EventResult {
                chi2,
                mt2b: 150.0,
                mt2bl: 120.0,
                mt2w: 180.0,
            }
        };
        EventSummary {
            id: EventId { run: 1, lumi: 1, event },
            is_data: false,
            weight: 2.0,
            met: 60.0,
            mt: 70.0,
            best,
            njets: 4,
            nb: 1,
            lep1_pt: 40.0,
            lep1_eta: 0.0,
            n_candidates: 12,
            truth_rank,
        }
    }

    #[test]
    fn digest_skips_sentinels_and_folds_high_ranks() {
        let rows = vec![
            summary(1, 2.0, Some(0)),
            summary(2, 4.0, Some(9)),
            summary(3, -1.0, None),
        ];
        let d = digest(&rows);
        assert_eq!(d.events, 3);
        assert_eq!(d.sentinel_events, 1);
        assert_eq!(d.weighted, 6.0);
        assert_eq!(d.mean_chi2, Some(3.0));
        assert_eq!(d.mean_mt2w, Some(180.0));
        assert_eq!(d.truth_events, 2);
        assert_eq!(d.truth_rank, [1, 0, 0, 0, 1]);
        assert_eq!(d.truth_efficiency(), Some(0.5));
    }

    #[test]
    fn empty_digest() {
        let d = digest(&[]);
        assert_eq!(d.mean_candidates, 0.0);
        assert!(d.mean_chi2.is_none());
        assert!(d.truth_efficiency().is_none());
    }
}
