//! Enumeration and scoring of hadronic-top jet assignments.
//!
//! For one event:
//!
//! 1. solve the W-mass rescaling once per eligible jet pair `(i < j)`
//! 2. walk every ordered (hadronic b, leptonic b) pair, prune on b-tag and pT, and
//!    compute the MT2 family once per surviving pair
//! 3. combine each surviving (b, o) with every cached W pair disjoint from it and score
//!    the hadronic top hypothesis with a chi-square
//!
//! Candidates come out in `(b, o, W pair)` loop order, then stably sorted by chi2 when
//! configured, so equal scores keep insertion order.

use crate::domain::{Candidate, JetSet, MissingEnergy, RecoConfig};
use crate::error::AppError;
use crate::fit::rescale::{PairFit, PairRescaler};
use crate::fit::truth::find_truth_assignment;
use crate::math::lorentz::FourMomentum;
use crate::mt2::engine::Mt2Engine;

/// A W-jet pair whose rescaling was solvable.
#[derive(Debug, Clone, Copy)]
struct WPair {
    i: usize,
    j: usize,
    fit: PairFit,
}

#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    config: RecoConfig,
    rescaler: PairRescaler,
    mt2: Mt2Engine,
}

impl CandidateGenerator {
    pub fn new(config: &RecoConfig) -> Self {
        Self {
            config: config.clone(),
            rescaler: PairRescaler::new(config.w_mass),
            mt2: Mt2Engine::new(config.w_mass, config.top_mass),
        }
    }

    pub fn config(&self) -> &RecoConfig {
        &self.config
    }

    fn w_pairs(&self, jets: &JetSet) -> Vec<WPair> {
        let n = jets.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if jets.p4[i].pt() < self.config.pt_min_w1 || jets.p4[j].pt() < self.config.pt_min_w2 {
                    continue;
                }
                match self
                    .rescaler
                    .solve(&jets.p4[i], &jets.p4[j], jets.sigma[i], jets.sigma[j])
                {
                    Some(fit) => out.push(WPair { i, j, fit }),
                    None => log::debug!("dropping W pair ({i}, {j}): mass constraint unsolvable"),
                }
            }
        }
        out
    }

    /// Whether the (hadronic b, leptonic b) pair survives the b-tag and pT pruning.
    fn keep_b_pair(&self, jets: &JetSet, b: usize, o: usize, btag_required: bool) -> bool {
        let cfg = &self.config;
        let b_tagged = jets.is_tagged(b, cfg.btag_min);
        let o_tagged = jets.is_tagged(o, cfg.btag_min);
        let pt_b = jets.p4[b].pt();
        let pt_o = jets.p4[o].pt();

        if btag_required && !b_tagged && !o_tagged {
            return false;
        }
        if btag_required && b_tagged && pt_b < cfg.pt_min_btag {
            return false;
        }
        if !b_tagged && pt_b < cfg.pt_min_b {
            return false;
        }
        if btag_required && o_tagged && pt_o < cfg.pt_min_otag {
            return false;
        }
        if btag_required && !o_tagged && pt_o < cfg.pt_min_o {
            return false;
        }
        true
    }

    /// Chi-square of the hadronic top built from W pair `w` and hadronic b `b`.
    fn top_chi2(&self, jets: &JetSet, w: &WPair, b: usize) -> f64 {
        let (ji, jj, jb) = (&jets.p4[w.i], &jets.p4[w.j], &jets.p4[b]);
        let (c1, c2) = (w.fit.c1, w.fit.c2);

        let had_w = *ji + *jj;
        let mass_w = had_w.mass();
        let pt_w = had_w.pt();
        let dw_i = ji.pt() * jets.sigma[w.i];
        let dw_j = jj.pt() * jets.sigma[w.j];
        let sigma_w2 = dw_i * dw_i + dw_j * dw_j;
        let smw2 = (1.0 + 2.0 * pt_w * pt_w / (mass_w * mass_w)) * sigma_w2;

        let had_t = *ji * c1 + *jj * c2 + *jb;
        let mass_t = had_t.mass();
        let pt_t = had_t.pt();
        let db = jb.pt() * jets.sigma[b];
        let sigma_t2 = (c1 * dw_i).powi(2) + (c2 * dw_j).powi(2) + db * db;
        let smtop2 = (1.0 + 2.0 * pt_t * pt_t / (mass_t * mass_t)) * sigma_t2;

        (mass_t - self.config.top_mass).powi(2) / smtop2 + (mass_w - self.config.w_mass).powi(2) / smw2
    }

    /// Enumerate, score and (optionally) sort all assignments of one event.
    pub fn generate(
        &self,
        jets: &JetSet,
        lepton: &FourMomentum,
        met: &MissingEnergy,
        btag_required: bool,
    ) -> Result<Vec<Candidate>, AppError> {
        jets.validate()?;
        let n = jets.len();
        let truth = jets.parton.as_deref().and_then(find_truth_assignment);
        let w_pairs = self.w_pairs(jets);
        let met_vec = met.vector();

        let mut out = Vec::new();
        for b in 0..n {
            for o in 0..n {
                if b == o || !self.keep_b_pair(jets, b, o, btag_required) {
                    continue;
                }
                let mt2 = self.mt2.compute_all(lepton, &jets.p4[o], &jets.p4[b], met_vec);

                for w in &w_pairs {
                    if w.i == o || w.i == b || w.j == o || w.j == b {
                        continue;
                    }
                    let chi2 = self.top_chi2(jets, w, b);
                    if !chi2.is_finite() {
                        log::debug!("skipping candidate o={o} b={b} i={} j={}: non-finite chi2", w.i, w.j);
                        continue;
                    }
                    let mut cand = Candidate {
                        o,
                        b,
                        i: w.i,
                        j: w.j,
                        c1: w.fit.c1,
                        c2: w.fit.c2,
                        chi2,
                        mt2b: mt2.mt2b,
                        mt2bl: mt2.mt2bl,
                        mt2w: mt2.mt2w,
                        truth_match: false,
                    };
                    cand.truth_match = truth.is_some_and(|t| t.matches(&cand));
                    log::trace!("candidate {cand:?}");
                    out.push(cand);
                }
            }
        }

        if self.config.sort_by_chi2 {
            // `sort_by` is stable: equal chi2 keeps loop order.
            out.sort_by(|a, b| a.chi2.total_cmp(&b.chi2));
        }
        Ok(out)
    }
}

/// Keep only candidates whose hadronic or leptonic b passes `btag_min`.
pub fn retain_btagged(candidates: &[Candidate], btag: &[f64], btag_min: f64) -> Vec<Candidate> {
    candidates
        .iter()
        .filter(|c| {
            let tagged = |k: usize| btag.get(k).is_some_and(|&s| s >= btag_min);
            tagged(c.b) || tagged(c.o)
        })
        .copied()
        .collect()
}
