//! The three MT2-family discriminants of one (leptonic b, hadronic b) assignment.

use nalgebra::Vector2;
use serde::Serialize;

use crate::math::lorentz::FourMomentum;
use crate::mt2::bisect::{Mt2, Visible};
use crate::mt2::mt2w::Mt2w;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mt2Values {
    pub mt2b: f64,
    pub mt2bl: f64,
    pub mt2w: f64,
}

/// Stateless calculator parameterised by the physical masses it assumes.
#[derive(Debug, Clone, Copy)]
pub struct Mt2Engine {
    w_mass: f64,
    top_mass: f64,
}

impl Mt2Engine {
    pub fn new(w_mass: f64, top_mass: f64) -> Self {
        Self { w_mass, top_mass }
    }

    /// mt2b: the two b jets as visible systems, the lepton added to the missing
    /// momentum, and W-mass invisibles on both sides.
    pub fn mt2b(&self, lepton: &FourMomentum, jet_o: &FourMomentum, jet_b: &FourMomentum, met: Vector2<f64>) -> f64 {
        let pmiss = met + lepton.pt_vec();
        Mt2::symmetric(Visible::from_p4(jet_o), Visible::from_p4(jet_b), pmiss, self.w_mass).solve()
    }

    /// mt2bl: (lepton + leptonic b) against the hadronic b with massless invisibles.
    pub fn mt2bl(&self, lepton: &FourMomentum, jet_o: &FourMomentum, jet_b: &FourMomentum, met: Vector2<f64>) -> f64 {
        let lb = *lepton + *jet_o;
        Mt2::symmetric(Visible::from_p4(&lb), Visible::from_p4(jet_b), met, 0.0).solve()
    }

    pub fn mt2w(&self, lepton: &FourMomentum, jet_o: &FourMomentum, jet_b: &FourMomentum, met: Vector2<f64>) -> f64 {
        Mt2w::new(*lepton, *jet_o, *jet_b, met, self.w_mass, self.top_mass).solve()
    }

    pub fn compute_all(
        &self,
        lepton: &FourMomentum,
        jet_o: &FourMomentum,
        jet_b: &FourMomentum,
        met: Vector2<f64>,
    ) -> Mt2Values {
        Mt2Values {
            mt2b: self.mt2b(lepton, jet_o, jet_b, met),
            mt2bl: self.mt2bl(lepton, jet_o, jet_b, met),
            mt2w: self.mt2w(lepton, jet_o, jet_b, met),
        }
    }
}
