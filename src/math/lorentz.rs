//! Four-momentum arithmetic in natural units (`c = 1`, GeV).
//!
//! Mass conventions follow the usual collider-physics tooling: `mass2()` may be
//! slightly negative for numerically massless objects, and `mass()` then returns
//! `-sqrt(-m^2)` rather than NaN.

use std::ops::{Add, AddAssign, Mul, Sub};

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Cartesian four-momentum `(px, py, pz, E)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FourMomentum {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub e: f64,
}

impl FourMomentum {
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// Build from collider coordinates (transverse momentum, pseudorapidity,
    /// azimuth, mass).
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let p2 = px * px + py * py + pz * pz;
        let e = (p2 + m * m).sqrt();
        Self { px, py, pz, e }
    }

    /// Build from a three-momentum and a mass.
    pub fn from_p3_m(p: Vector3<f64>, m: f64) -> Self {
        let e = (p.norm_squared() + m * m).sqrt();
        Self::new(p.x, p.y, p.z, e)
    }

    pub fn p3(&self) -> Vector3<f64> {
        Vector3::new(self.px, self.py, self.pz)
    }

    /// Transverse momentum vector `(px, py)`.
    pub fn pt_vec(&self) -> Vector2<f64> {
        Vector2::new(self.px, self.py)
    }

    pub fn pt2(&self) -> f64 {
        self.px * self.px + self.py * self.py
    }

    pub fn pt(&self) -> f64 {
        self.pt2().sqrt()
    }

    pub fn p(&self) -> f64 {
        (self.pt2() + self.pz * self.pz).sqrt()
    }

    pub fn mass2(&self) -> f64 {
        self.e * self.e - self.pt2() - self.pz * self.pz
    }

    pub fn mass(&self) -> f64 {
        let m2 = self.mass2();
        if m2 >= 0.0 { m2.sqrt() } else { -(-m2).sqrt() }
    }

    /// Mass clamped at zero, for places that need a physical (non-negative) mass.
    pub fn mass_or_zero(&self) -> f64 {
        self.mass2().max(0.0).sqrt()
    }

    pub fn phi(&self) -> f64 {
        if self.px == 0.0 && self.py == 0.0 {
            0.0
        } else {
            self.py.atan2(self.px)
        }
    }

    /// Pseudorapidity. Returns `±f64::MAX`-like large values along the beam axis
    /// instead of infinities.
    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt > 0.0 {
            (self.pz / pt).asinh()
        } else if self.pz == 0.0 {
            0.0
        } else {
            self.pz.signum() * 1e10
        }
    }

    /// Minkowski product with metric `(+,-,-,-)`.
    pub fn dot(&self, other: &FourMomentum) -> f64 {
        self.e * other.e - self.px * other.px - self.py * other.py - self.pz * other.pz
    }

    /// Velocity vector `p/E` used to boost from this object's rest frame.
    pub fn boost_vector(&self) -> Vector3<f64> {
        self.p3() / self.e
    }

    /// Lorentz boost by velocity `beta`.
    pub fn boost(&self, beta: Vector3<f64>) -> Self {
        let b2 = beta.norm_squared();
        if b2 <= 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = beta.dot(&self.p3());
        let gamma2 = (gamma - 1.0) / b2;
        let p = self.p3() + beta * (gamma2 * bp + gamma * self.e);
        Self::new(p.x, p.y, p.z, gamma * (self.e + bp))
    }

    /// Transverse mass of a visible object with a massless invisible partner of
    /// transverse momentum `pmiss`.
    pub fn transverse_mass(&self, pmiss: Vector2<f64>) -> f64 {
        let et = self.pt();
        let met = pmiss.norm();
        let mt2 = 2.0 * (et * met - self.pt_vec().dot(&pmiss));
        mt2.max(0.0).sqrt()
    }
}

/// Isotropic-frame two-body decay: `parent -> (m1, m2)` with daughter 1 emitted along
/// `dir` in the parent rest frame. `None` below threshold or for a null direction.
pub fn two_body_decay(
    parent: &FourMomentum,
    m1: f64,
    m2: f64,
    dir: Vector3<f64>,
) -> Option<(FourMomentum, FourMomentum)> {
    let m = parent.mass();
    let lambda = (m * m - (m1 + m2).powi(2)) * (m * m - (m1 - m2).powi(2));
    let norm = dir.norm();
    if !(m > 0.0 && lambda >= 0.0 && norm > 0.0) {
        return None;
    }
    let p = lambda.sqrt() / (2.0 * m);
    let d = dir * (p / norm);
    let beta = parent.boost_vector();
    Some((
        FourMomentum::from_p3_m(d, m1).boost(beta),
        FourMomentum::from_p3_m(-d, m2).boost(beta),
    ))
}

impl Add for FourMomentum {
    type Output = FourMomentum;

    fn add(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum::new(
            self.px + rhs.px,
            self.py + rhs.py,
            self.pz + rhs.pz,
            self.e + rhs.e,
        )
    }
}

impl AddAssign for FourMomentum {
    fn add_assign(&mut self, rhs: FourMomentum) {
        *self = *self + rhs;
    }
}

impl Sub for FourMomentum {
    type Output = FourMomentum;

    fn sub(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum::new(
            self.px - rhs.px,
            self.py - rhs.py,
            self.pz - rhs.pz,
            self.e - rhs.e,
        )
    }
}

impl Mul<f64> for FourMomentum {
    type Output = FourMomentum;

    fn mul(self, k: f64) -> FourMomentum {
        FourMomentum::new(self.px * k, self.py * k, self.pz * k, self.e * k)
    }
}
