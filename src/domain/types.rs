//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - read from JSON Lines event files
//! - used in-memory during reconstruction
//! - exported to JSON/CSV

use std::path::PathBuf;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::lorentz::FourMomentum;

/// W boson mass (GeV).
pub const PDG_W_MASS: f64 = 80.385;
/// Top quark mass (GeV).
pub const PDG_TOP_MASS: f64 = 173.5;
/// Medium working point of the b-tag discriminant.
pub const BTAG_MEDIUM: f64 = 0.679;
/// Reported for any event-level quantity that could not be computed.
pub const SENTINEL: f64 = -0.999;

/// Collision identifier. Unique per real-data event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId {
    pub run: u32,
    pub lumi: u32,
    pub event: u64,
}

/// Missing transverse energy as magnitude and azimuth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MissingEnergy {
    pub met: f64,
    pub phi: f64,
}

impl MissingEnergy {
    pub fn new(met: f64, phi: f64) -> Self {
        Self { met, phi }
    }

    pub fn from_vector(v: Vector2<f64>) -> Self {
        let phi = if v.x == 0.0 && v.y == 0.0 { 0.0 } else { v.y.atan2(v.x) };
        Self { met: v.norm(), phi }
    }

    pub fn vector(&self) -> Vector2<f64> {
        Vector2::new(self.met * self.phi.cos(), self.met * self.phi.sin())
    }
}

/// One reconstructed collision event as stored in the input file.
///
/// The per-jet collections are parallel arrays, ordered by decreasing jet pT. The
/// selector reads indices `0..4` as the leading jets, so producers that cannot
/// guarantee the order call `sort_jets_by_pt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub id: EventId,
    #[serde(default)]
    pub is_data: bool,
    #[serde(default = "unit_weight")]
    pub weight: f64,
    pub jets: Vec<FourMomentum>,
    pub btag: Vec<f64>,
    /// Signed truth-parton label per jet (simulation only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parton: Option<Vec<i32>>,
    pub lepton: FourMomentum,
    pub met: MissingEnergy,
}

fn unit_weight() -> f64 {
    1.0
}

impl Event {
    /// Number of jets above `pt_min`.
    pub fn count_jets(&self, pt_min: f64) -> usize {
        self.jets.iter().filter(|j| j.pt() > pt_min).count()
    }

    /// Number of jets above `pt_min` with a b-tag score above `wp`.
    pub fn count_btagged(&self, pt_min: f64, wp: f64) -> usize {
        self.jets
            .iter()
            .zip(&self.btag)
            .filter(|&(j, &s)| j.pt() > pt_min && s > wp)
            .count()
    }

    /// Transverse mass of the lepton and the missing momentum.
    pub fn lepton_mt(&self) -> f64 {
        self.lepton.transverse_mass(self.met.vector())
    }

    pub fn is_pt_ordered(&self) -> bool {
        self.jets.windows(2).all(|w| w[0].pt() >= w[1].pt())
    }

    /// Stably reorder the per-jet collections by decreasing jet pT.
    ///
    /// Collections whose length disagrees with `jets` are left untouched so the
    /// mismatch is still reported by `JetSet::validate`.
    pub fn sort_jets_by_pt(&mut self) {
        if self.is_pt_ordered() {
            return;
        }
        let mut order: Vec<usize> = (0..self.jets.len()).collect();
        order.sort_by(|&a, &b| self.jets[b].pt().total_cmp(&self.jets[a].pt()));

        let n = self.jets.len();
        if self.btag.len() == n {
            let btag: Vec<f64> = order.iter().map(|&k| self.btag[k]).collect();
            self.btag = btag;
        }
        if let Some(parton) = self.parton.as_mut().filter(|p| p.len() == n) {
            let sorted: Vec<i32> = order.iter().map(|&k| parton[k]).collect();
            *parton = sorted;
        }
        let jets: Vec<FourMomentum> = order.iter().map(|&k| self.jets[k]).collect();
        self.jets = jets;
    }
}

/// Per-jet inputs of the reconstruction, as parallel collections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JetSet {
    pub p4: Vec<FourMomentum>,
    pub btag: Vec<f64>,
    /// Relative pT resolution `sigma(pT)/pT` per jet.
    pub sigma: Vec<f64>,
    pub parton: Option<Vec<i32>>,
}

impl JetSet {
    pub fn len(&self) -> usize {
        self.p4.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p4.is_empty()
    }

    /// Every per-jet collection must describe the same jets.
    pub fn validate(&self) -> Result<(), AppError> {
        let n = self.p4.len();
        if self.btag.len() != n {
            return Err(AppError::precondition(format!(
                "b-tag collection has {} entries for {n} jets",
                self.btag.len()
            )));
        }
        if self.sigma.len() != n {
            return Err(AppError::precondition(format!(
                "resolution collection has {} entries for {n} jets",
                self.sigma.len()
            )));
        }
        if let Some(parton) = &self.parton {
            if parton.len() != n {
                return Err(AppError::precondition(format!(
                    "parton collection has {} entries for {n} jets",
                    parton.len()
                )));
            }
        }
        Ok(())
    }

    pub fn is_tagged(&self, k: usize, wp: f64) -> bool {
        self.btag[k] >= wp
    }
}

/// One jet-role assignment hypothesis with its scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Leptonic-side b jet.
    pub o: usize,
    /// Hadronic-side b jet.
    pub b: usize,
    /// First W jet.
    pub i: usize,
    /// Second W jet.
    pub j: usize,
    pub c1: f64,
    pub c2: f64,
    pub chi2: f64,
    pub mt2b: f64,
    pub mt2bl: f64,
    pub mt2w: f64,
    pub truth_match: bool,
}

impl Candidate {
    pub fn indices(&self) -> [usize; 4] {
        [self.o, self.b, self.i, self.j]
    }

    pub fn max_index(&self) -> usize {
        self.o.max(self.b).max(self.i).max(self.j)
    }
}

/// Per-event best values. Each field is an independent minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventResult {
    pub chi2: f64,
    pub mt2b: f64,
    pub mt2bl: f64,
    pub mt2w: f64,
}

impl EventResult {
    pub fn sentinel() -> Self {
        Self {
            chi2: SENTINEL,
            mt2b: SENTINEL,
            mt2bl: SENTINEL,
            mt2w: SENTINEL,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.chi2 == SENTINEL && self.mt2b == SENTINEL && self.mt2bl == SENTINEL && self.mt2w == SENTINEL
    }
}

/// Output row of one selected event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: EventId,
    pub is_data: bool,
    pub weight: f64,
    pub met: f64,
    /// Transverse mass of the lepton and the missing momentum.
    pub mt: f64,
    pub best: EventResult,
    pub njets: usize,
    pub nb: usize,
    pub lep1_pt: f64,
    pub lep1_eta: f64,
    pub n_candidates: usize,
    /// Chi2 rank (0-based) of the truth-matched candidate, when there is one.
    pub truth_rank: Option<usize>,
}

/// Thresholds and physics constants of the reconstruction.
///
/// Every field has a default so a JSON config file may set any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecoConfig {
    /// Minimum pT of the first W jet.
    pub pt_min_w1: f64,
    /// Minimum pT of the second W jet.
    pub pt_min_w2: f64,
    /// Minimum pT of a tagged hadronic b jet.
    pub pt_min_btag: f64,
    /// Minimum pT of an untagged hadronic b jet.
    pub pt_min_b: f64,
    /// Minimum pT of a tagged leptonic b jet.
    pub pt_min_otag: f64,
    /// Minimum pT of an untagged leptonic b jet.
    pub pt_min_o: f64,
    /// Inclusive b-tag threshold used during candidate generation.
    pub btag_min: f64,
    /// Strict b-tag threshold used by the selector's tiering.
    pub selection_btag_wp: f64,
    pub sort_by_chi2: bool,
    pub btag_required: bool,
    /// Drop candidates where neither b role passes `btag_min` before selection.
    pub btagged_candidates_only: bool,
    pub w_mass: f64,
    pub top_mass: f64,
    /// Event selection: minimum number of jets above `jet_count_pt`.
    pub min_jets: usize,
    pub jet_count_pt: f64,
    pub min_met: f64,
}

impl Default for RecoConfig {
    fn default() -> Self {
        Self {
            pt_min_w1: 30.0,
            pt_min_w2: 30.0,
            pt_min_btag: 30.0,
            pt_min_b: 30.0,
            pt_min_otag: 30.0,
            pt_min_o: 30.0,
            btag_min: BTAG_MEDIUM,
            selection_btag_wp: BTAG_MEDIUM,
            sort_by_chi2: true,
            btag_required: false,
            btagged_candidates_only: false,
            w_mass: PDG_W_MASS,
            top_mass: PDG_TOP_MASS,
            min_jets: 4,
            jet_count_pt: 30.0,
            min_met: 50.0,
        }
    }
}

impl RecoConfig {
    /// Reject settings that would make the reconstruction meaningless.
    pub fn validate(&self) -> Result<(), AppError> {
        let pts = [
            ("pt_min_w1", self.pt_min_w1),
            ("pt_min_w2", self.pt_min_w2),
            ("pt_min_btag", self.pt_min_btag),
            ("pt_min_b", self.pt_min_b),
            ("pt_min_otag", self.pt_min_otag),
            ("pt_min_o", self.pt_min_o),
            ("jet_count_pt", self.jet_count_pt),
            ("min_met", self.min_met),
        ];
        for (name, v) in pts {
            if !(v.is_finite() && v >= 0.0) {
                return Err(AppError::input(format!("Invalid {name} setting: {v}")));
            }
        }
        if !(self.w_mass.is_finite() && self.w_mass > 0.0) {
            return Err(AppError::input("W mass must be positive."));
        }
        if !(self.top_mass.is_finite() && self.top_mass > self.w_mass) {
            return Err(AppError::input("Top mass must exceed the W mass."));
        }
        if !(self.btag_min.is_finite() && self.selection_btag_wp.is_finite()) {
            return Err(AppError::input("b-tag thresholds must be finite."));
        }
        Ok(())
    }
}

/// Resolved settings of one `topreco run` invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub candidates_out: Option<PathBuf>,
    pub bad_events: Option<PathBuf>,
    pub resolution: Option<PathBuf>,
    pub reco: RecoConfig,
    /// Worker threads (0 = rayon default).
    pub threads: usize,
}

/// Settings of one `topreco simulate` invocation.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub output: PathBuf,
    pub events: usize,
    pub seed: u64,
    pub extra_jets_mean: f64,
    pub data_fraction: f64,
}
