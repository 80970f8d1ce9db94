//! Per-event best values from a candidate list.
//!
//! Only hypotheses built entirely from the four leading jets are considered. They are
//! then filtered by a tier that depends on how many of those four jets are b-tagged:
//!
//! - exactly 2 tags: both b roles (hadronic `b`, leptonic `o`) must be the tagged jets
//! - exactly 1 tag: a tagged `b` (or `o`) must be paired with one of the leading
//!   untagged jets (`b == 3` allows `o <= 1`, otherwise `o <= 2`; symmetric for `o`)
//! - 0 or 3+ tags: both b roles must come from the three leading jets
//!
//! The four reported values are independent minima over the survivors and need not
//! come from the same candidate.

use crate::domain::{Candidate, EventResult, SENTINEL};
use crate::error::AppError;

/// Number of leading jets the selector looks at.
pub const LEADING_JETS: usize = 4;
/// Initial value of every running minimum.
const MIN_INIT: f64 = 9999.0;
/// A minimum above this was never updated.
const MIN_UNSET: f64 = 9000.0;

/// b-tag decisions of the leading jets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadingTags([bool; LEADING_JETS]);

impl LeadingTags {
    pub fn new(flags: [bool; LEADING_JETS]) -> Self {
        Self(flags)
    }

    /// Tag the leading jets with a strict `score > wp` cut.
    pub fn from_scores(btag: &[f64], wp: f64) -> Result<Self, AppError> {
        if btag.len() < LEADING_JETS {
            return Err(AppError::precondition(format!(
                "selector needs b-tag scores for {LEADING_JETS} leading jets, got {}",
                btag.len()
            )));
        }
        let mut flags = [false; LEADING_JETS];
        for (flag, &score) in flags.iter_mut().zip(btag) {
            *flag = score > wp;
        }
        Ok(Self(flags))
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&t| t).count()
    }

    pub fn is_tagged(&self, k: usize) -> bool {
        self.0.get(k).copied().unwrap_or(false)
    }
}

/// Tier filter for one candidate. Indices must be leading-jet indices.
fn passes_tier(c: &Candidate, tags: &LeadingTags, n_btag: usize) -> bool {
    let (b, o) = (c.b, c.o);
    let b_tag = tags.is_tagged(b);
    let o_tag = tags.is_tagged(o);
    match n_btag {
        2 => b_tag && o_tag,
        1 => {
            // Neither role tagged: no restriction applies in this tier.
            if b_tag && ((b == 3 && o > 1) || (b < 3 && o > 2)) {
                return false;
            }
            if o_tag && ((o == 3 && b > 1) || (o < 3 && b > 2)) {
                return false;
            }
            true
        }
        _ => b <= 2 && o <= 2,
    }
}

/// Candidates that survive the leading-jet and tier filters, in input order.
pub fn surviving_candidates<'a>(candidates: &'a [Candidate], tags: &LeadingTags) -> Vec<&'a Candidate> {
    let n_btag = tags.count();
    candidates
        .iter()
        .filter(|c| c.max_index() < LEADING_JETS)
        .filter(|c| passes_tier(c, tags, n_btag))
        .collect()
}

/// Independent minima of chi2 and the MT2 family over the surviving candidates.
pub fn select(candidates: &[Candidate], tags: &LeadingTags) -> EventResult {
    if candidates.is_empty() {
        return EventResult::sentinel();
    }

    let mut chi2 = MIN_INIT;
    let mut mt2b = MIN_INIT;
    let mut mt2bl = MIN_INIT;
    let mut mt2w = MIN_INIT;
    for c in surviving_candidates(candidates, tags) {
        chi2 = chi2.min(c.chi2);
        mt2b = mt2b.min(c.mt2b);
        mt2bl = mt2bl.min(c.mt2bl);
        mt2w = mt2w.min(c.mt2w);
    }

    let finish = |v: f64| if v > MIN_UNSET { SENTINEL } else { v };
    EventResult {
        chi2: finish(chi2),
        mt2b: finish(mt2b),
        mt2bl: finish(mt2bl),
        mt2w: finish(mt2w),
    }
}

/// Select from raw b-tag scores. An empty list short-circuits before the scores are
/// checked, so events with fewer than four jets still get a sentinel result.
pub fn select_event(candidates: &[Candidate], btag: &[f64], wp: f64) -> Result<EventResult, AppError> {
    if candidates.is_empty() {
        return Ok(EventResult::sentinel());
    }
    let tags = LeadingTags::from_scores(btag, wp)?;
    Ok(select(candidates, &tags))
}
