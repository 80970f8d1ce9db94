//! Jet transverse-momentum resolution.
//!
//! The reconstruction only needs the *relative* resolution `sigma(pT) / pT` of each
//! jet. A model is constructed once per run, is immutable, and is shared read-only
//! by all worker threads.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::lorentz::FourMomentum;

/// Smallest relative resolution a model may report.
const MIN_RELATIVE_RESOLUTION: f64 = 1e-3;
/// Resolutions are evaluated no lower than this pT (GeV).
const MIN_PT: f64 = 1.0;

/// Maps a jet to its relative pT resolution.
pub trait ResolutionModel: Send + Sync {
    fn relative_resolution(&self, jet: &FourMomentum) -> f64;
}

/// One |eta| bin of the N/S/C parameterisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionBin {
    pub eta_max: f64,
    /// Noise term; its sign is applied to the squared contribution.
    pub n: f64,
    /// Stochastic term.
    pub s: f64,
    /// Constant term.
    pub c: f64,
    /// Exponent modifying the stochastic term.
    pub m: f64,
}

impl ResolutionBin {
    /// `sigma/pT = sqrt(sgn(N) (N/pT)^2 + S^2 pT^(m-1) + C^2)`
    pub fn evaluate(&self, pt: f64) -> f64 {
        let pt = pt.max(MIN_PT);
        let noise = self.n.signum() * (self.n / pt).powi(2);
        let stochastic = self.s * self.s * pt.powf(self.m - 1.0);
        (noise + stochastic + self.c * self.c).max(0.0).sqrt()
    }
}

/// Binned N/S/C resolution, bins sorted by increasing upper |eta| edge.
///
/// Jets beyond the last edge use the last bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametrizedResolution {
    pub bins: Vec<ResolutionBin>,
}

impl Default for ParametrizedResolution {
    /// Particle-flow anti-kT (R = 0.5) jets.
    fn default() -> Self {
        let rows = [
            (0.5, -0.349, 0.298, 0.0, 0.471),
            (1.0, -0.500, 0.336, 0.0, 0.431),
            (1.5, -0.562, 0.420, 0.0, 0.392),
            (2.0, -1.123, 0.658, 0.0, 0.140),
            (2.5, 1.048, 0.467, 0.0, 0.193),
            (3.0, 2.569, 0.306, 0.0, 0.399),
            (5.0, 2.820, 0.272, 0.0, 0.380),
        ];
        Self {
            bins: rows
                .iter()
                .map(|&(eta_max, n, s, c, m)| ResolutionBin { eta_max, n, s, c, m })
                .collect(),
        }
    }
}

impl ParametrizedResolution {
    pub fn new(bins: Vec<ResolutionBin>) -> Result<Self, AppError> {
        if bins.is_empty() {
            return Err(AppError::input("Resolution table has no bins."));
        }
        for w in bins.windows(2) {
            if !(w[1].eta_max > w[0].eta_max) {
                return Err(AppError::input("Resolution bins must have increasing eta_max."));
            }
        }
        if bins
            .iter()
            .any(|b| ![b.eta_max, b.n, b.s, b.c, b.m].iter().all(|v| v.is_finite()))
        {
            return Err(AppError::input("Resolution table contains non-finite parameters."));
        }
        Ok(Self { bins })
    }

    /// Load a table written as `{"bins": [{"eta_max": .., "n": .., "s": .., "c": .., "m": ..}, ..]}`.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::input(format!("Failed to open resolution table '{}': {e}", path.display()))
        })?;
        let table: ParametrizedResolution = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AppError::input(format!("Invalid resolution table '{}': {e}", path.display())))?;
        Self::new(table.bins)
    }

    fn bin_for(&self, abs_eta: f64) -> Option<&ResolutionBin> {
        self.bins
            .iter()
            .find(|b| abs_eta < b.eta_max)
            .or_else(|| self.bins.last())
    }
}

impl ResolutionModel for ParametrizedResolution {
    fn relative_resolution(&self, jet: &FourMomentum) -> f64 {
        let sigma = self
            .bin_for(jet.eta().abs())
            .map(|b| b.evaluate(jet.pt()))
            .unwrap_or(0.0);
        sigma.max(MIN_RELATIVE_RESOLUTION)
    }
}

/// Fixed relative resolution for every jet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantResolution(pub f64);

impl ResolutionModel for ConstantResolution {
    fn relative_resolution(&self, _jet: &FourMomentum) -> f64 {
        self.0.max(MIN_RELATIVE_RESOLUTION)
    }
}

/// Data/simulation resolution ratio, binned in |eta|.
///
/// Real-data jets have their simulated resolution multiplied by this factor. Negative
/// eta uses the mirrored positive bin rather than a flat 1.0.
pub fn data_mc_ratio(eta: f64) -> f64 {
    let a = eta.abs();
    if a < 0.5 {
        1.052
    } else if a < 1.1 {
        1.057
    } else if a < 1.7 {
        1.096
    } else if a < 2.3 {
        1.134
    } else if a < 5.0 {
        1.288
    } else {
        1.0
    }
}

/// Relative resolution of every jet, with the data/simulation correction applied for
/// real-data events.
pub fn jet_resolutions(model: &dyn ResolutionModel, jets: &[FourMomentum], is_data: bool) -> Vec<f64> {
    jets.iter()
        .map(|j| {
            let sigma = model.relative_resolution(j);
            if is_data { sigma * data_mc_ratio(j.eta()) } else { sigma }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_resolution_is_plausible_and_falls_with_pt() {
        let model = ParametrizedResolution::default();
        let soft = model.relative_resolution(&FourMomentum::from_pt_eta_phi_m(30.0, 0.2, 0.0, 5.0));
        let hard = model.relative_resolution(&FourMomentum::from_pt_eta_phi_m(300.0, 0.2, 0.0, 5.0));
        assert!(soft > 0.05 && soft < 0.3, "soft={soft}");
        assert!(hard < soft);
    }

    #[test]
    fn forward_jets_use_last_bin() {
        let model = ParametrizedResolution::default();
        let j = FourMomentum::from_pt_eta_phi_m(50.0, 6.0, 0.0, 0.0);
        let last = model.bins.last().unwrap().evaluate(50.0);
        assert!((model.relative_resolution(&j) - last.max(MIN_RELATIVE_RESOLUTION)).abs() < 1e-12);
    }

    #[test]
    fn data_mc_ratio_bins_are_symmetric() {
        assert_eq!(data_mc_ratio(0.0), 1.052);
        assert_eq!(data_mc_ratio(-0.7), 1.057);
        assert_eq!(data_mc_ratio(1.2), 1.096);
        assert_eq!(data_mc_ratio(-2.0), 1.134);
        assert_eq!(data_mc_ratio(4.9), 1.288);
        assert_eq!(data_mc_ratio(5.2), 1.0);
    }

    #[test]
    fn data_events_get_scaled_resolution() {
        let model = ConstantResolution(0.1);
        let jets = [FourMomentum::from_pt_eta_phi_m(40.0, 0.3, 0.0, 4.0)];
        assert_eq!(jet_resolutions(&model, &jets, false), vec![0.1]);
        let data = jet_resolutions(&model, &jets, true);
        assert!((data[0] - 0.1052).abs() < 1e-12);
    }

    #[test]
    fn backward_data_jets_are_scaled_like_forward_ones() {
        let model = ConstantResolution(0.1);
        let jets = [
            FourMomentum::from_pt_eta_phi_m(40.0, 1.9, 0.5, 4.0),
            FourMomentum::from_pt_eta_phi_m(40.0, -1.9, 0.5, 4.0),
        ];
        let data = jet_resolutions(&model, &jets, true);
        assert!((data[0] - 0.1134).abs() < 1e-12);
        assert!((data[1] - data[0]).abs() < 1e-12);
    }

    #[test]
    fn rejects_unsorted_table() {
        let mut bins = ParametrizedResolution::default().bins;
        bins.swap(0, 1);
        assert!(ParametrizedResolution::new(bins).is_err());
    }

    #[test]
    fn loads_table_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("res.json");
        std::fs::write(&path, r#"{"bins":[{"eta_max":5.0,"n":0.0,"s":0.5,"c":0.03,"m":0.0}]}"#).unwrap();
        let model = ParametrizedResolution::from_json_file(&path).unwrap();
        // S^2 / pT + C^2 at pT = 100
        let expected = (0.25 / 100.0 + 0.0009f64).sqrt();
        let j = FourMomentum::from_pt_eta_phi_m(100.0, 1.0, 0.0, 0.0);
        assert!((model.relative_resolution(&j) - expected).abs() < 1e-12);
    }
}
