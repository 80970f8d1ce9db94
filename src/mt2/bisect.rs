//! Stransverse mass (MT2) by bisection on the trial mass.
//!
//! For two visible systems `a`, `b` and a total missing transverse momentum `pmiss`,
//!
//! ```text
//! MT2 = min_{q_a + q_b = pmiss} max( mT(a, q_a; m_na), mT(b, q_b; m_nb) )
//! ```
//!
//! For a trial mass `M` each constraint `mT <= M` is a filled ellipse in the plane of
//! the splitting `q = q_a`. The trial mass is admissible when the two ellipses
//! intersect, and admissibility is monotone in `M`, so MT2 is found by bisection
//! between a lower bound (`max(m_a + m_na, m_b + m_nb)`) and the best of a few trial
//! splittings.
//!
//! Numerical notes:
//! - visible masses below `MIN_MASS_FRACTION * scale` are raised to that floor so the
//!   regions stay ellipses (a massless visible system gives a parabola)
//! - the bisection stops once the bracket is narrower than `RELATIVE_PRECISION * scale`,
//!   with `scale` the largest transverse energy / missing momentum in the event
//! - the reported value is `max_mt` at an explicit splitting found along the way, so it
//!   is attained and never falls below the true minimum

use nalgebra::{Matrix2, Vector2};

use crate::math::conic::Conic;
use crate::math::lorentz::FourMomentum;

/// Relative precision of the bisection.
pub const RELATIVE_PRECISION: f64 = 1e-5;
/// Visible-mass floor as a fraction of the event scale.
const MIN_MASS_FRACTION: f64 = 1e-3;
const MAX_BISECTIONS: usize = 200;

/// Transverse view of a visible system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visible {
    pub mass: f64,
    pub pt: Vector2<f64>,
}

impl Visible {
    pub fn new(mass: f64, pt: Vector2<f64>) -> Self {
        Self { mass: mass.max(0.0), pt }
    }

    pub fn from_p4(p: &FourMomentum) -> Self {
        Self::new(p.mass_or_zero(), p.pt_vec())
    }

    /// Transverse energy `sqrt(m^2 + pT^2)`.
    pub fn et(&self) -> f64 {
        (self.mass * self.mass + self.pt.norm_squared()).sqrt()
    }
}

/// Squared transverse mass of a visible system and an invisible particle of mass
/// `inv_mass` carrying transverse momentum `q`.
pub fn transverse_mass2(vis: &Visible, q: &Vector2<f64>, inv_mass: f64) -> f64 {
    let et_inv = (inv_mass * inv_mass + q.norm_squared()).sqrt();
    vis.mass * vis.mass + inv_mass * inv_mass + 2.0 * (vis.et() * et_inv - vis.pt.dot(q))
}

pub fn transverse_mass(vis: &Visible, q: &Vector2<f64>, inv_mass: f64) -> f64 {
    transverse_mass2(vis, q, inv_mass).max(0.0).sqrt()
}

/// Region `{q : mT(vis, q; inv_mass) <= trial}` as a conic in `q`.
///
/// Valid for `trial >= vis.mass + inv_mass`, where squaring the defining inequality
/// introduces no spurious branch.
pub fn mt_region(vis: &Visible, inv_mass: f64, trial: f64) -> Conic {
    let et2 = vis.et().powi(2);
    let k = 0.5 * (trial * trial - vis.mass * vis.mass - inv_mass * inv_mass);
    let p = vis.pt;
    let q = Matrix2::identity() * et2 - p * p.transpose();
    let b = -p * k;
    let c = et2 * inv_mass * inv_mass - k * k;
    Conic::new(q, b, c)
}

/// MT2 problem with (possibly different) invisible mass hypotheses per side.
#[derive(Debug, Clone, Copy)]
pub struct Mt2 {
    a: Visible,
    b: Visible,
    pmiss: Vector2<f64>,
    inv_mass_a: f64,
    inv_mass_b: f64,
    precision: f64,
}

impl Mt2 {
    pub fn new(a: Visible, b: Visible, pmiss: Vector2<f64>, inv_mass_a: f64, inv_mass_b: f64) -> Self {
        let scale = a.et().max(b.et()).max(pmiss.norm());
        let floor = scale * MIN_MASS_FRACTION;
        let a = Visible::new(a.mass.max(floor), a.pt);
        let b = Visible::new(b.mass.max(floor), b.pt);
        Self {
            a,
            b,
            pmiss,
            inv_mass_a: inv_mass_a.max(0.0),
            inv_mass_b: inv_mass_b.max(0.0),
            precision: (scale * RELATIVE_PRECISION).max(f64::MIN_POSITIVE),
        }
    }

    /// Symmetric invisible mass hypothesis.
    pub fn symmetric(a: Visible, b: Visible, pmiss: Vector2<f64>, inv_mass: f64) -> Self {
        Self::new(a, b, pmiss, inv_mass, inv_mass)
    }

    /// Larger of the two transverse masses for the splitting `q_a = q`.
    pub fn max_mt(&self, q: &Vector2<f64>) -> f64 {
        let mta = transverse_mass(&self.a, q, self.inv_mass_a);
        let mtb = transverse_mass(&self.b, &(self.pmiss - q), self.inv_mass_b);
        mta.max(mtb)
    }

    /// Whether some splitting keeps both transverse masses at or below `trial`.
    pub fn admissible(&self, trial: f64) -> bool {
        self.witness(trial).is_some()
    }

    /// A splitting `q_a` that keeps both transverse masses at or below `trial`.
    pub fn witness(&self, trial: f64) -> Option<Vector2<f64>> {
        let ra = mt_region(&self.a, self.inv_mass_a, trial);
        let rb = mt_region(&self.b, self.inv_mass_b, trial).reflected(&self.pmiss);
        let (ea, eb) = (ra.ellipse()?, rb.ellipse()?);
        if ra.contains(&eb.center) {
            return Some(eb.center);
        }
        if rb.contains(&ea.center) {
            return Some(ea.center);
        }
        let (value, at) = ea.min_on_boundary(&rb);
        (value <= 0.0).then_some(at)
    }

    pub fn solve(&self) -> f64 {
        self.solve_with_splitting().0
    }

    /// MT2 together with the splitting `q_a` that attains it.
    pub fn solve_with_splitting(&self) -> (f64, Vector2<f64>) {
        let floor_a = self.a.mass + self.inv_mass_a;
        let floor_b = self.b.mass + self.inv_mass_b;
        let lower = floor_a.max(floor_b);

        // Invisible momentum that puts one side exactly at its kinematic floor.
        let q_floor_a = self.a.pt * (self.inv_mass_a / self.a.mass);
        let q_floor_b = self.pmiss - self.b.pt * (self.inv_mass_b / self.b.mass);

        // Unbalanced configurations: the heavier side sits at its floor and the
        // other side is already below it.
        if floor_a >= floor_b && self.max_mt(&q_floor_a) <= lower {
            return (lower, q_floor_a);
        }
        if floor_b >= floor_a && self.max_mt(&q_floor_b) <= lower {
            return (lower, q_floor_b);
        }

        let trials = [
            self.pmiss * 0.5,
            q_floor_a,
            q_floor_b,
            Vector2::zeros(),
            self.pmiss,
        ];
        let mut best_q = trials[0];
        let mut best = f64::INFINITY;
        for q in trials {
            let v = self.max_mt(&q);
            if v < best {
                best = v;
                best_q = q;
            }
        }
        if !(best.is_finite() && best > lower) {
            return (lower, best_q);
        }

        let mut lo = lower;
        let mut upper = best;
        let mut iterations = 0;
        while upper - lo > self.precision && iterations < MAX_BISECTIONS {
            let mid = 0.5 * (upper + lo);
            match self.witness(mid) {
                Some(q) => {
                    upper = mid;
                    let v = self.max_mt(&q);
                    if v < best {
                        best = v;
                        best_q = q;
                    }
                }
                None => lo = mid,
            }
            iterations += 1;
        }
        if iterations == MAX_BISECTIONS {
            log::warn!("mt2 bisection stopped at [{lo:.6}, {upper:.6}] without reaching precision");
        }
        (best, best_q)
    }
}
