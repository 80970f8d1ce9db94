//! One-dimensional local minimization.
//!
//! The W-mass constrained rescaling has exactly one free parameter, so a dedicated
//! scalar minimizer is all we need:
//!
//! 1. bracket a minimum by golden-ratio expansion from a starting point
//! 2. refine it with Brent's method (parabolic interpolation + golden sections)
//!
//! Non-finite objective values are treated as `+inf`, which keeps the search away
//! from regions where the objective is undefined.

/// Golden ratio used for bracket expansion.
const GOLD: f64 = 1.618_033_988_749_895;
/// `(3 - sqrt(5)) / 2`, the golden-section step fraction.
const CGOLD: f64 = 0.381_966_011_250_105;
/// Protects against a zero fractional tolerance when the minimum sits at `x = 0`.
const ZEPS: f64 = 1e-12;

/// Result of a scalar minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    pub x: f64,
    pub fx: f64,
    pub iterations: usize,
    /// False when the iteration budget ran out; `x` is then the best iterate seen.
    pub converged: bool,
}

/// Options for [`minimize_scalar`].
#[derive(Debug, Clone, Copy)]
pub struct MinimizeOptions {
    /// Initial step used to build the bracket.
    pub step: f64,
    /// Fractional tolerance on `x`.
    pub tol: f64,
    pub max_bracket_iter: usize,
    pub max_iter: usize,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            step: 0.1,
            tol: 1e-8,
            max_bracket_iter: 60,
            max_iter: 200,
        }
    }
}

fn finite_or_inf(v: f64) -> f64 {
    if v.is_finite() { v } else { f64::INFINITY }
}

/// Minimize `f` starting from `x0`.
pub fn minimize_scalar<F>(f: F, x0: f64, opts: &MinimizeOptions) -> Minimum
where
    F: Fn(f64) -> f64,
{
    let eval = |x: f64| finite_or_inf(f(x));

    let Some((a, b, c, fb)) = bracket(&eval, x0, opts.step, opts.max_bracket_iter) else {
        // Could not bracket: return the best point we know about.
        let fx0 = eval(x0);
        return Minimum {
            x: x0,
            fx: fx0,
            iterations: opts.max_bracket_iter,
            converged: false,
        };
    };

    brent(&eval, a, b, c, fb, opts.tol, opts.max_iter)
}

/// Golden-ratio expansion until `f(b) < f(a)` and `f(b) < f(c)`.
///
/// Returns `(a, b, c, f(b))` with `b` between `a` and `c`.
fn bracket<F>(f: &F, x0: f64, step: f64, max_iter: usize) -> Option<(f64, f64, f64, f64)>
where
    F: Fn(f64) -> f64,
{
    let mut a = x0;
    let mut b = x0 + step;
    let mut fa = f(a);
    let mut fb = f(b);
    if fb > fa {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    if !fb.is_finite() {
        return None;
    }

    let mut c = b + GOLD * (b - a);
    let mut fc = f(c);
    let mut iter = 0;
    while fc < fb {
        if iter >= max_iter {
            return None;
        }
        a = b;
        b = c;
        fb = fc;
        c = b + GOLD * (b - a);
        fc = f(c);
        iter += 1;
    }

    Some((a, b, c, fb))
}

fn brent<F>(f: &F, ax: f64, bx: f64, cx: f64, fbx: f64, tol: f64, max_iter: usize) -> Minimum
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = if ax < cx { (ax, cx) } else { (cx, ax) };
    let mut x = bx;
    let mut w = bx;
    let mut v = bx;
    let mut fx = fbx;
    let mut fw = fbx;
    let mut fv = fbx;
    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;

    for iter in 0..max_iter {
        let xm = 0.5 * (a + b);
        let tol1 = tol * x.abs() + ZEPS;
        let tol2 = 2.0 * tol1;
        if (x - xm).abs() <= tol2 - 0.5 * (b - a) {
            return Minimum {
                x,
                fx,
                iterations: iter,
                converged: true,
            };
        }

        let mut golden = true;
        if e.abs() > tol1 {
            // Trial parabolic fit through x, v, w.
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let etemp = e;
            e = d;
            let acceptable = p.is_finite()
                && q.is_finite()
                && p.abs() < (0.5 * q * etemp).abs()
                && p > q * (a - x)
                && p < q * (b - x);
            if acceptable {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = tol1.copysign(xm - x);
                }
                golden = false;
            }
        }
        if golden {
            e = if x >= xm { a - x } else { b - x };
            d = CGOLD * e;
        }

        let u = if d.abs() >= tol1 {
            x + d
        } else {
            x + tol1.copysign(d)
        };
        let fu = f(u);

        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }

    Minimum {
        x,
        fx,
        iterations: max_iter,
        converged: false,
    }
}

/// Minimize `f` over `[lo, hi]` by golden-section search.
///
/// Used where the objective is only known to be unimodal inside a short interval
/// (boundary scans of conics).
pub fn golden_section<F>(f: F, lo: f64, hi: f64, iterations: usize) -> (f64, f64)
where
    F: Fn(f64) -> f64,
{
    let mut a = lo;
    let mut b = hi;
    let mut x1 = b - (b - a) / GOLD;
    let mut x2 = a + (b - a) / GOLD;
    let mut f1 = f(x1);
    let mut f2 = f(x2);
    for _ in 0..iterations {
        if f1 < f2 {
            b = x2;
            x2 = x1;
            f2 = f1;
            x1 = b - (b - a) / GOLD;
            f1 = f(x1);
        } else {
            a = x1;
            x1 = x2;
            f1 = f2;
            x2 = a + (b - a) / GOLD;
            f2 = f(x2);
        }
    }
    if f1 < f2 { (x1, f1) } else { (x2, f2) }
}
