//! Planar conics `q(x) = xᵀ Q x + 2 bᵀ x + c`.
//!
//! Transverse-mass constraints on an invisible momentum are quadratic inequalities in
//! the transverse plane. For a massive visible system they describe ellipses, and the
//! MT2 bisections reduce to two geometric questions:
//!
//! - is a point inside a region (`q(x) <= 0`)?
//! - what is the smallest value a conic takes on the boundary of an ellipse?
//!
//! The second is answered on the boundary parametrisation
//! `x(θ) = center + R (r1 cos θ, r2 sin θ)`. A quadratic evaluated along an ellipse is
//! a trigonometric polynomial of degree two in `θ`, so a uniform scan followed by
//! golden-section refinement of the best brackets finds the global minimum.

use nalgebra::{Matrix2, SymmetricEigen, Vector2};

use crate::math::minimize::golden_section;

/// Number of uniform samples on the ellipse boundary before refinement.
const BOUNDARY_SAMPLES: usize = 64;
/// Golden-section iterations per refined bracket.
const REFINE_ITERATIONS: usize = 48;
/// Number of sampled local minima that get refined.
const REFINED_BRACKETS: usize = 4;

/// Quadratic form `xᵀ Q x + 2 bᵀ x + c` with symmetric `Q`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conic {
    pub q: Matrix2<f64>,
    pub b: Vector2<f64>,
    pub c: f64,
}

/// Filled ellipse `(x - center)ᵀ Q (x - center) <= rhs`, with its boundary
/// parametrisation precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub center: Vector2<f64>,
    /// Columns are the semi-axes (principal directions scaled by their radii).
    pub axes: Matrix2<f64>,
}

impl Conic {
    pub fn new(q: Matrix2<f64>, b: Vector2<f64>, c: f64) -> Self {
        Self { q, b, c }
    }

    pub fn value(&self, x: &Vector2<f64>) -> f64 {
        (x.transpose() * self.q * x)[(0, 0)] + 2.0 * self.b.dot(x) + self.c
    }

    pub fn contains(&self, x: &Vector2<f64>) -> bool {
        self.value(x) <= 0.0
    }

    /// Re-express the conic in the variable `y = shift - x`.
    ///
    /// If `self` constrains `x`, the result constrains `y` such that
    /// `result.value(y) == self.value(shift - y)`.
    pub fn reflected(&self, shift: &Vector2<f64>) -> Conic {
        let qs = self.q * shift;
        let b = -(qs + self.b);
        let c = shift.dot(&qs) + 2.0 * self.b.dot(shift) + self.c;
        Conic::new(self.q, b, c)
    }

    /// Interpret the conic as a filled ellipse.
    ///
    /// Returns `None` when `Q` is not positive definite or the region is empty.
    /// A region that shrinks to a point (up to rounding) yields a zero-radius ellipse.
    pub fn ellipse(&self) -> Option<Ellipse> {
        let eig = SymmetricEigen::new(self.q);
        let (l0, l1) = (eig.eigenvalues[0], eig.eigenvalues[1]);
        let lmax = l0.abs().max(l1.abs());
        if !(lmax.is_finite() && lmax > 0.0) || l0 <= lmax * 1e-14 || l1 <= lmax * 1e-14 {
            return None;
        }

        let q_inv = self.q.try_inverse()?;
        let center = -(q_inv * self.b);
        // Value at the center is the (negated) squared size of the region.
        let c0 = self.c - self.b.dot(&(q_inv * self.b));
        let scale = self.c.abs().max(self.b.dot(&(q_inv * self.b)).abs()).max(1.0);
        let rhs = if -c0 >= 0.0 {
            -c0
        } else if -c0 > -scale * 1e-12 {
            0.0
        } else {
            return None;
        };

        let r0 = (rhs / l0).sqrt();
        let r1 = (rhs / l1).sqrt();
        let v0 = eig.eigenvectors.column(0) * r0;
        let v1 = eig.eigenvectors.column(1) * r1;
        Some(Ellipse {
            center,
            axes: Matrix2::from_columns(&[v0, v1]),
        })
    }
}

impl Ellipse {
    pub fn point(&self, theta: f64) -> Vector2<f64> {
        self.center + self.axes * Vector2::new(theta.cos(), theta.sin())
    }

    /// Smallest value of `conic` on the boundary of this ellipse, with the point where
    /// it is attained.
    pub fn min_on_boundary(&self, conic: &Conic) -> (f64, Vector2<f64>) {
        let f = |theta: f64| conic.value(&self.point(theta));
        let step = std::f64::consts::TAU / BOUNDARY_SAMPLES as f64;
        let samples: Vec<f64> = (0..BOUNDARY_SAMPLES).map(|i| f(i as f64 * step)).collect();

        // Local minima of the periodic sample sequence, best first.
        let mut minima: Vec<usize> = (0..BOUNDARY_SAMPLES)
            .filter(|&i| {
                let prev = samples[(i + BOUNDARY_SAMPLES - 1) % BOUNDARY_SAMPLES];
                let next = samples[(i + 1) % BOUNDARY_SAMPLES];
                samples[i] <= prev && samples[i] <= next
            })
            .collect();
        minima.sort_by(|&a, &b| samples[a].total_cmp(&samples[b]));
        if minima.is_empty() {
            minima.push(0);
        }

        let mut best_theta = 0.0;
        let mut best = f64::INFINITY;
        for &i in minima.iter().take(REFINED_BRACKETS) {
            let center = i as f64 * step;
            let (theta, value) = golden_section(&f, center - step, center + step, REFINE_ITERATIONS);
            let (theta, value) = if samples[i] < value {
                (center, samples[i])
            } else {
                (theta, value)
            };
            if value < best {
                best = value;
                best_theta = theta;
            }
        }

        (best, self.point(best_theta))
    }
}
