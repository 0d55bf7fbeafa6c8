//! One-dimensional maximisation on a bounded interval.
//!
//! Variance-component likelihoods in the eigenbasis depend on a single
//! ratio, so a coarse grid followed by Brent refinement around the best grid
//! point is both robust to multimodality and cheap.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizeError {
    #[error("Objective was not finite at any of the {grid_points} grid points")]
    NoFiniteValue { grid_points: usize },

    #[error("Invalid search interval [{lo}, {hi}] with {grid_points} grid points")]
    InvalidInterval { lo: f64, hi: f64, grid_points: usize },

    #[error("Brent refinement did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// Configuration for [`grid_brent_maximize`].
#[derive(Debug, Clone)]
pub struct GridBrentConfig {
    /// Lower end of the search interval.
    pub lo: f64,
    /// Upper end of the search interval.
    pub hi: f64,
    /// Number of grid intervals (grid has `grid_points + 1` nodes).
    pub grid_points: usize,
    /// Absolute tolerance on the argument.
    pub tol: f64,
    /// Maximum Brent iterations.
    pub max_iter: usize,
}

/// Location and value of a maximum.
#[derive(Debug, Clone)]
pub struct Maximum {
    pub x: f64,
    pub value: f64,
    /// Brent iterations used in the refinement.
    pub iterations: usize,
    /// max - min of the finite objective values seen on the grid.
    pub grid_range: f64,
    /// The best grid node was one of the two interval ends.
    pub at_boundary: bool,
}

/// Maximise `f` over `[cfg.lo, cfg.hi]`: evaluate on an even grid, then
/// refine with Brent's method inside the bracket around the best node.
pub fn grid_brent_maximize<F>(f: F, cfg: &GridBrentConfig) -> Result<Maximum, OptimizeError>
where
    F: Fn(f64) -> f64,
{
    if !(cfg.lo < cfg.hi) || cfg.grid_points < 2 {
        return Err(OptimizeError::InvalidInterval {
            lo: cfg.lo,
            hi: cfg.hi,
            grid_points: cfg.grid_points,
        });
    }

    let step = (cfg.hi - cfg.lo) / cfg.grid_points as f64;
    let mut best: Option<(usize, f64)> = None;
    let mut lowest = f64::INFINITY;
    let mut highest = f64::NEG_INFINITY;
    for k in 0..=cfg.grid_points {
        let v = f(cfg.lo + step * k as f64);
        if !v.is_finite() {
            continue;
        }
        lowest = lowest.min(v);
        highest = highest.max(v);
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((k, v));
        }
    }
    let (k_best, v_best) = best.ok_or(OptimizeError::NoFiniteValue {
        grid_points: cfg.grid_points + 1,
    })?;

    let at_boundary = k_best == 0 || k_best == cfg.grid_points;
    let a = cfg.lo + step * k_best.saturating_sub(1) as f64;
    let b = (cfg.lo + step * (k_best + 1) as f64).min(cfg.hi);

    let neg = |x: f64| {
        let v = f(x);
        if v.is_finite() {
            -v
        } else {
            f64::INFINITY
        }
    };
    let (x, fx, iterations) = brent_minimize(neg, a, b, cfg.tol, cfg.max_iter)?;

    // Brent only searches the interior of the bracket; keep the grid node
    // if it is still better (e.g. the optimum sits on the interval end).
    let grid_x = cfg.lo + step * k_best as f64;
    let (x, value) = if -fx >= v_best { (x, -fx) } else { (grid_x, v_best) };

    Ok(Maximum {
        x,
        value,
        iterations,
        grid_range: highest - lowest,
        at_boundary,
    })
}

/// Brent's method for minimising a unimodal function on `[a, b]`.
///
/// Returns `(x_min, f(x_min), iterations)`.
pub fn brent_minimize<F>(
    f: F,
    mut a: f64,
    mut b: f64,
    tol: f64,
    max_iter: usize,
) -> Result<(f64, f64, usize), OptimizeError>
where
    F: Fn(f64) -> f64,
{
    const CGOLD: f64 = 0.381_966_011_250_105_1;
    const ZEPS: f64 = 1e-12;

    let mut x = a + CGOLD * (b - a);
    let mut w = x;
    let mut v = x;
    let mut fx = f(x);
    let mut fw = fx;
    let mut fv = fx;
    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;

    for iter in 0..max_iter {
        let xm = 0.5 * (a + b);
        let tol1 = tol * x.abs() + ZEPS;
        let tol2 = 2.0 * tol1;
        if (x - xm).abs() <= tol2 - 0.5 * (b - a) {
            return Ok((x, fx, iter));
        }

        let mut golden = true;
        if e.abs() > tol1 {
            // parabolic fit through x, w, v
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let etemp = e;
            if p.abs() < (0.5 * q * etemp).abs() && p > q * (a - x) && p < q * (b - x) {
                e = d;
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

    Err(OptimizeError::NotConverged {
        iterations: max_iter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(lo: f64, hi: f64) -> GridBrentConfig {
        GridBrentConfig {
            lo,
            hi,
            grid_points: 50,
            tol: 1e-8,
            max_iter: 200,
        }
    }

    #[test]
    fn test_brent_quadratic() {
        let (x, fx, _) = brent_minimize(|x| (x - 1.3).powi(2) + 2.0, 0.0, 3.0, 1e-10, 200).unwrap();
        assert!((x - 1.3).abs() < 1e-6, "x={}", x);
        assert!((fx - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_grid_brent_finds_interior_maximum() {
        let m = grid_brent_maximize(|x| -(x - 0.37).powi(2), &cfg(-5.0, 5.0)).unwrap();
        assert!((m.x - 0.37).abs() < 1e-5, "x={}", m.x);
        assert!(!m.at_boundary);
        assert!(m.grid_range > 0.0);
    }

    #[test]
    fn test_grid_brent_multimodal_picks_global() {
        // two bumps, the right one is higher
        let f = |x: f64| (-(x + 2.0).powi(2)).exp() + 2.0 * (-(x - 2.0).powi(2)).exp();
        let m = grid_brent_maximize(f, &cfg(-5.0, 5.0)).unwrap();
        assert!((m.x - 2.0).abs() < 1e-4, "x={}", m.x);
    }

    #[test]
    fn test_grid_brent_monotone_hits_boundary() {
        let m = grid_brent_maximize(|x| x, &cfg(-1.0, 1.0)).unwrap();
        assert!(m.at_boundary);
        assert!((m.x - 1.0).abs() < 1e-6, "x={}", m.x);
    }

    #[test]
    fn test_grid_brent_skips_non_finite() {
        let f = |x: f64| if x < 0.0 { f64::NAN } else { -(x - 0.5).powi(2) };
        let m = grid_brent_maximize(f, &cfg(-1.0, 1.0)).unwrap();
        assert!((m.x - 0.5).abs() < 1e-5);

        let err = grid_brent_maximize(|_| f64::NAN, &cfg(-1.0, 1.0)).unwrap_err();
        assert_eq!(err, OptimizeError::NoFiniteValue { grid_points: 51 });
    }

    #[test]
    fn test_invalid_interval() {
        assert!(matches!(
            grid_brent_maximize(|x| x, &cfg(1.0, 1.0)),
            Err(OptimizeError::InvalidInterval { .. })
        ));
    }
}
