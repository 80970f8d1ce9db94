//! W-mass constrained rescaling of a jet pair.
//!
//! Two jets `A`, `B` are scaled by `c1`, `c2` so that `(c1 A + c2 B)^2 = M_W^2`. With
//! `m1^2 = A^2`, `m2^2 = B^2` and `m0^2 = (A + B)^2` the constraint reads
//!
//! ```text
//! m2^2 c2^2 + (m0^2 - m1^2 - m2^2) c1 c2 + m1^2 c1^2 - M_W^2 = 0
//! ```
//!
//! and `c2(c1)` is its larger root. The remaining freedom is fixed by minimizing the
//! pull of both scale factors with respect to the jet resolutions:
//!
//! ```text
//! chi2(c1) = ((1 - c1) / s_A)^2 + ((1 - c2(c1)) / s_B)^2
//! ```
//!
//! with `s_A`, `s_B` the relative pT resolutions.

use crate::math::lorentz::FourMomentum;
use crate::math::minimize::{MinimizeOptions, minimize_scalar};

/// Starting value of `c1` for the minimization.
pub const RESCALE_START: f64 = 1.1;
/// `|m2^2|` below this fraction of `M_W^2` is treated as a massless second jet.
const MASSLESS_FRACTION: f64 = 1e-12;

/// Solution of the constrained rescaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairFit {
    pub c1: f64,
    pub c2: f64,
    /// Value of the pull objective at the solution.
    pub chi2: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PairRescaler {
    w_mass: f64,
    options: MinimizeOptions,
}

impl PairRescaler {
    pub fn new(w_mass: f64) -> Self {
        Self {
            w_mass,
            options: MinimizeOptions::default(),
        }
    }

    /// Larger root `c2` of the mass constraint for a given `c1`.
    ///
    /// `None` when the discriminant is negative or the root is not positive.
    pub fn c2_for(&self, c1: f64, m1sq: f64, m2sq: f64, m0sq: f64) -> Option<f64> {
        let mw2 = self.w_mass * self.w_mass;
        let a = m2sq;
        let b = (m0sq - m1sq - m2sq) * c1;
        let c = m1sq * c1 * c1 - mw2;

        let c2 = if a.abs() <= mw2 * MASSLESS_FRACTION {
            // Massless second jet: the constraint is linear in c2.
            if b <= 0.0 {
                return None;
            }
            -c / b
        } else {
            let disc = b * b - 4.0 * a * c;
            if disc < 0.0 {
                return None;
            }
            (-b + disc.sqrt()) / (2.0 * a)
        };

        (c2.is_finite() && c2 > 0.0).then_some(c2)
    }

    /// Solve the constrained rescaling for one pair.
    ///
    /// `sigma_a` and `sigma_b` are relative pT resolutions. Returns `None` when no
    /// positive pair of scale factors satisfies the constraint near the optimum; the
    /// pair hypothesis is then dropped.
    pub fn solve(&self, a: &FourMomentum, b: &FourMomentum, sigma_a: f64, sigma_b: f64) -> Option<PairFit> {
        if !(sigma_a > 0.0 && sigma_b > 0.0) {
            return None;
        }
        let m1sq = a.mass2();
        let m2sq = b.mass2();
        let m0sq = (*a + *b).mass2();

        let objective = |c1: f64| match self.c2_for(c1, m1sq, m2sq, m0sq) {
            Some(c2) if c1 > 0.0 => ((1.0 - c1) / sigma_a).powi(2) + ((1.0 - c2) / sigma_b).powi(2),
            _ => f64::NAN,
        };

        let min = minimize_scalar(objective, RESCALE_START, &self.options);
        if !min.converged {
            log::warn!(
                "W rescaling did not converge after {} iterations; using c1={:.6}",
                min.iterations,
                min.x
            );
        }
        if !min.fx.is_finite() || min.x <= 0.0 {
            return None;
        }
        let c2 = self.c2_for(min.x, m1sq, m2sq, m0sq)?;
        Some(PairFit {
            c1: min.x,
            c2,
            chi2: min.fx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PDG_W_MASS;

    #[test]
    fn rescaled_pair_has_w_mass() {
        let r = PairRescaler::new(PDG_W_MASS);
        let a = FourMomentum::from_pt_eta_phi_m(55.0, 0.3, 0.2, 6.0);
        let b = FourMomentum::from_pt_eta_phi_m(38.0, -0.4, 1.9, 4.5);
        let fit = r.solve(&a, &b, 0.12, 0.15).unwrap();
        assert!(fit.c1 > 0.0 && fit.c2 > 0.0);
        let w = a * fit.c1 + b * fit.c2;
        assert!((w.mass() - PDG_W_MASS).abs() < 1e-6, "m={}", w.mass());
        assert!(fit.chi2 >= 0.0);
    }

    #[test]
    fn pair_already_at_w_mass_is_barely_rescaled() {
        let r = PairRescaler::new(PDG_W_MASS);
        // Boost a W -> q q' decay at rest into the lab.
        let half = 0.5 * PDG_W_MASS;
        let q1 = FourMomentum::new(0.0, half, 0.0, half);
        let q2 = FourMomentum::new(0.0, -half, 0.0, half);
        let beta = nalgebra::Vector3::new(0.4, 0.1, 0.2);
        let (a, b) = (q1.boost(beta), q2.boost(beta));
        assert!(((a + b).mass() - PDG_W_MASS).abs() < 1e-9);
        let fit = r.solve(&a, &b, 0.1, 0.1).unwrap();
        assert!((fit.c1 - 1.0).abs() < 1e-5, "c1={}", fit.c1);
        assert!((fit.c2 - 1.0).abs() < 1e-5, "c2={}", fit.c2);
        assert!(fit.chi2 < 1e-8);
    }

    #[test]
    fn collinear_massless_pair_is_dropped() {
        let r = PairRescaler::new(PDG_W_MASS);
        let a = FourMomentum::new(3.0, 4.0, 0.0, 5.0);
        let b = a * 1.5;
        assert!(r.solve(&a, &b, 0.1, 0.1).is_none());
    }

    #[test]
    fn larger_root_is_returned() {
        let r = PairRescaler::new(PDG_W_MASS);
        // m1 = m2 = 0: c2 = M_W^2 / ((m0^2) c1)
        let c2 = r.c2_for(2.0, 0.0, 0.0, 50.0 * 50.0).unwrap();
        assert!((c2 - PDG_W_MASS * PDG_W_MASS / (2.0 * 2500.0)).abs() < 1e-9);
        // Massive case: the root must satisfy the quadratic.
        let (c1, m1sq, m2sq, m0sq) = (0.9, 25.0, 16.0, 70.0 * 70.0);
        let c2 = r.c2_for(c1, m1sq, m2sq, m0sq).unwrap();
        let residual = m2sq * c2 * c2 + (m0sq - m1sq - m2sq) * c1 * c2 + m1sq * c1 * c1 - PDG_W_MASS.powi(2);
        assert!(residual.abs() < 1e-6);
    }
}
