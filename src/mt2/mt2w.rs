//! MT2W: the smallest parent mass compatible with a semi-leptonic top-pair topology.
//!
//! One side is the chain `t -> b1 W -> b1 l nu` with a massless neutrino and
//! `(l + nu)^2 = M_W^2`. The other side is `t -> b2 W` with the W invisible. Both
//! parents share the trial mass `m_y`, and the neutrino plus the invisible W carry
//! the missing transverse momentum.
//!
//! For a given `m_y` the two mass-shell conditions on the lepton side are linear in
//! the neutrino energy and longitudinal momentum, so the neutrino solutions form a
//! curve in the transverse plane (an ellipse). The trial mass is compatible when that
//! curve reaches the region where the b2 side stays below `m_y`.
//!
//! Search (absolute precision in GeV):
//! - start from `m_y = M_top`; if incompatible, scan upwards in coarse steps
//! - give up at `UPPER_BOUND` and report it
//! - bisect between the last incompatible and first compatible masses

use nalgebra::{Matrix2, Vector2};

use crate::math::conic::Conic;
use crate::math::lorentz::FourMomentum;
use crate::mt2::bisect::{Visible, mt_region};

pub const MT2W_PRECISION: f64 = 1e-3;
pub const MT2W_UPPER_BOUND: f64 = 500.0;
const SCAN_STEP: f64 = 0.5;
/// Lepton-side systems with a smaller determinant have no unique neutrino solution.
const MIN_DETERMINANT: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct Mt2w {
    lepton: FourMomentum,
    b1: FourMomentum,
    b2: FourMomentum,
    pmiss: Vector2<f64>,
    w_mass: f64,
    start: f64,
}

impl Mt2w {
    /// `b1` is paired with the lepton, `b2` with the invisible W.
    pub fn new(
        lepton: FourMomentum,
        b1: FourMomentum,
        b2: FourMomentum,
        pmiss: Vector2<f64>,
        w_mass: f64,
        top_mass: f64,
    ) -> Self {
        Self {
            lepton,
            b1,
            b2,
            pmiss,
            w_mass,
            start: top_mass,
        }
    }

    /// Curve of neutrino transverse momenta satisfying both lepton-side mass shells.
    fn neutrino_curve(&self, my: f64) -> Option<Conic> {
        let (l, b1) = (&self.lepton, &self.b1);
        let mw2 = self.w_mass * self.w_mass;
        let ml2 = l.mass2().max(0.0);
        let mb1sq = b1.mass2().max(0.0);

        // E_l E - pz_l pz = d1 + pT_l . v
        // E_b E - pz_b pz = d2 + pT_b . v
        let d1 = 0.5 * (mw2 - ml2);
        let d2 = 0.5 * (my * my - mw2 - mb1sq - 2.0 * l.dot(b1));
        let det = b1.e * l.pz - l.e * b1.pz;
        if det.abs() < MIN_DETERMINANT * l.e * b1.e {
            return None;
        }

        // E = e0 + e.v, pz = z0 + z.v
        let e = (b1.pt_vec() * l.pz - l.pt_vec() * b1.pz) / det;
        let e0 = (l.pz * d2 - b1.pz * d1) / det;
        let z = (b1.pt_vec() * l.e - l.pt_vec() * b1.e) / det;
        let z0 = (l.e * d2 - b1.e * d1) / det;

        // Massless neutrino: |v|^2 + pz^2 - E^2 = 0
        let q = Matrix2::identity() + z * z.transpose() - e * e.transpose();
        let b = z * z0 - e * e0;
        let c = z0 * z0 - e0 * e0;
        Some(Conic::new(q, b, c))
    }

    /// Whether the trial parent mass admits a consistent event.
    pub fn compatible(&self, my: f64) -> bool {
        let mb1 = self.b1.mass_or_zero();
        let mb2 = self.b2.mass_or_zero();
        if my < mb1 + self.w_mass || my < mb2 + self.w_mass {
            return false;
        }
        let Some(curve) = self.neutrino_curve(my) else {
            return false;
        };
        let Some(ellipse) = curve.ellipse() else {
            return false;
        };
        let other = mt_region(&Visible::from_p4(&self.b2), self.w_mass, my).reflected(&self.pmiss);
        ellipse.min_on_boundary(&other).0 <= 0.0
    }

    pub fn solve(&self) -> f64 {
        let mut low = self.w_mass + self.b1.mass_or_zero().max(self.b2.mass_or_zero());
        let mut high = self.start.max(low);

        while !self.compatible(high) {
            if high > MT2W_UPPER_BOUND {
                return MT2W_UPPER_BOUND;
            }
            low = high;
            high += SCAN_STEP;
        }

        while high - low > MT2W_PRECISION {
            let mid = 0.5 * (high + low);
            if self.compatible(mid) {
                high = mid;
            } else {
                low = mid;
            }
        }
        high
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;
    use crate::domain::{PDG_TOP_MASS, PDG_W_MASS};
    use crate::math::lorentz::two_body_decay;

    fn decay(parent: &FourMomentum, m1: f64, m2: f64, dir: Vector3<f64>) -> (FourMomentum, FourMomentum) {
        two_body_decay(parent, m1, m2, dir).unwrap()
    }

    fn semileptonic() -> (FourMomentum, FourMomentum, FourMomentum, FourMomentum, FourMomentum) {
        let top = FourMomentum::from_p3_m(Vector3::new(60.0, -20.0, 90.0), PDG_TOP_MASS);
        let (b1, w) = decay(&top, 4.8, PDG_W_MASS, Vector3::new(0.3, 1.0, -0.2));
        let (l, nu) = decay(&w, 0.0, 0.0, Vector3::new(-1.0, 0.4, 0.7));
        let antitop = FourMomentum::from_p3_m(Vector3::new(-45.0, 35.0, -140.0), PDG_TOP_MASS);
        let (b2, w2) = decay(&antitop, 4.8, PDG_W_MASS, Vector3::new(0.8, -0.1, 0.5));
        (l, nu, b1, b2, w2)
    }

    #[test]
    fn true_masses_are_compatible() {
        let (l, nu, b1, b2, w2) = semileptonic();
        let pmiss = nu.pt_vec() + w2.pt_vec();
        let m = Mt2w::new(l, b1, b2, pmiss, PDG_W_MASS, PDG_TOP_MASS);
        assert!(m.compatible(PDG_TOP_MASS + 1e-3));
        let mt2w = m.solve();
        assert!(mt2w <= PDG_TOP_MASS + 2.0 * MT2W_PRECISION, "mt2w={mt2w}");
        assert!(mt2w >= PDG_W_MASS + 4.8 - 1e-9);
    }

    #[test]
    fn compatibility_is_monotone() {
        let (l, nu, b1, b2, w2) = semileptonic();
        let pmiss = nu.pt_vec() + w2.pt_vec();
        let m = Mt2w::new(l, b1, b2, pmiss, PDG_W_MASS, PDG_TOP_MASS);
        let mt2w = m.solve();
        assert!(!m.compatible(mt2w - 0.5));
        assert!(m.compatible(mt2w + 0.5));
        assert!(m.compatible(mt2w + 50.0));
    }

    #[test]
    fn mass_below_constituents_is_incompatible() {
        let (l, nu, b1, b2, w2) = semileptonic();
        let m = Mt2w::new(l, b1, b2, nu.pt_vec() + w2.pt_vec(), PDG_W_MASS, PDG_TOP_MASS);
        assert!(!m.compatible(PDG_W_MASS));
    }

    #[test]
    fn huge_missing_momentum_saturates_at_upper_bound() {
        let (l, _, b1, b2, _) = semileptonic();
        let m = Mt2w::new(l, b1, b2, Vector2::new(4000.0, -3000.0), PDG_W_MASS, PDG_TOP_MASS);
        assert_eq!(m.solve(), MT2W_UPPER_BOUND);
    }
}
