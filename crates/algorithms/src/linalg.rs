//! Dense linear solvers for the estimators
//!
//! - [`LuFactorization`]: Gaussian elimination with partial pivoting,
//!   sized for Kriging systems (tens of unknowns) and reusable across
//!   many right-hand sides.
//! - [`WeightedLeastSquares`]: Householder QR of the weighted design
//!   matrix, used by locally weighted regression instead of forming and
//!   inverting the normal equations.

use nalgebra::{DMatrix, DVector};
use ndarray::Array2;

use geoestim_core::{Error, Result};

/// Pivots smaller than this fraction of the largest entry count as zero.
const SINGULAR_TOL: f64 = 1e-12;

/// LU factorization `PA = LU` of a square matrix.
#[derive(Debug, Clone)]
pub struct LuFactorization {
    /// Unit-lower L (below the diagonal) and U (on and above), packed
    lu: Array2<f64>,
    /// Row permutation: row `i` of PA is row `perm[i]` of A
    perm: Vec<usize>,
}

impl LuFactorization {
    /// Factor `a` in place. Fails on a (numerically) singular matrix.
    pub fn factor(mut a: Array2<f64>) -> Result<Self> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: a.ncols(),
            });
        }

        let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if !scale.is_finite() {
            return Err(Error::Numerical("matrix has non-finite entries".into()));
        }
        let tol = scale * SINGULAR_TOL;
        let mut perm: Vec<usize> = (0..n).collect();

        for col in 0..n {
            let mut max_val = a[[col, col]].abs();
            let mut max_row = col;
            for row in (col + 1)..n {
                let val = a[[row, col]].abs();
                if val > max_val {
                    max_val = val;
                    max_row = row;
                }
            }

            if max_val <= tol {
                return Err(Error::Numerical(format!(
                    "singular matrix: pivot {:.3e} in column {} of {}",
                    max_val, col, n
                )));
            }

            if max_row != col {
                for j in 0..n {
                    a.swap([col, j], [max_row, j]);
                }
                perm.swap(col, max_row);
            }

            let pivot = a[[col, col]];
            for row in (col + 1)..n {
                let factor = a[[row, col]] / pivot;
                a[[row, col]] = factor;
                for j in (col + 1)..n {
                    a[[row, j]] -= factor * a[[col, j]];
                }
            }
        }

        Ok(Self { lu: a, perm })
    }

    /// Size of the factored system
    pub fn dim(&self) -> usize {
        self.perm.len()
    }

    /// Solve `A x = b`.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        let n = self.dim();
        if b.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: b.len(),
            });
        }

        // Forward substitution with the unit-lower factor
        let mut y: Vec<f64> = self.perm.iter().map(|&p| b[p]).collect();
        for i in 0..n {
            let mut sum = y[i];
            for j in 0..i {
                sum -= self.lu[[i, j]] * y[j];
            }
            y[i] = sum;
        }

        // Back substitution
        let mut x = vec![0.0_f64; n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum -= self.lu[[i, j]] * x[j];
            }
            x[i] = sum / self.lu[[i, i]];
        }

        Ok(x)
    }
}

/// Solution of a weighted linear least-squares problem
/// `min ‖W^½ (Xθ - z)‖`.
#[derive(Debug, Clone)]
pub struct WeightedLeastSquares {
    coefficients: DVector<f64>,
    /// Upper-triangular factor of W^½X, so that XᵀWX = RᵀR
    r: DMatrix<f64>,
}

impl WeightedLeastSquares {
    /// Fit via QR of the weighted design matrix.
    ///
    /// `design` is `m × p`, `weights` and `z` have length `m`. Fails when
    /// fewer than `p` rows carry weight or the columns are (numerically)
    /// linearly dependent.
    pub fn fit(design: &DMatrix<f64>, weights: &[f64], z: &[f64]) -> Result<Self> {
        let (m, p) = design.shape();
        if weights.len() != m || z.len() != m {
            return Err(Error::DimensionMismatch {
                expected: m,
                actual: weights.len().min(z.len()),
            });
        }
        if m < p {
            return Err(Error::Numerical(format!(
                "under-determined local fit: {} rows for {} coefficients",
                m, p
            )));
        }

        let sqrt_w: Vec<f64> = weights.iter().map(|w| w.max(0.0).sqrt()).collect();
        let weighted = DMatrix::from_fn(m, p, |i, j| sqrt_w[i] * design[(i, j)]);
        let mut rhs = DVector::from_fn(m, |i, _| sqrt_w[i] * z[i]);

        let qr = weighted.qr();
        let r = qr.r();

        let diag_max = r.diagonal().iter().fold(0.0_f64, |a, v| a.max(v.abs()));
        let diag_min = r.diagonal().iter().fold(f64::INFINITY, |a, v| a.min(v.abs()));
        if diag_max.is_nan() || diag_max <= 0.0 || diag_min <= diag_max * SINGULAR_TOL * (m.max(p) as f64) {
            return Err(Error::Numerical(format!(
                "rank-deficient weighted design matrix (|R| diagonal range {:.3e}..{:.3e})",
                diag_min, diag_max
            )));
        }

        qr.q_tr_mul(&mut rhs);
        let head = DVector::from_iterator(p, rhs.iter().take(p).copied());
        let coefficients = r
            .solve_upper_triangular(&head)
            .ok_or_else(|| Error::Numerical("triangular solve failed".into()))?;

        Ok(Self { coefficients, r })
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }

    /// Solve the normal equations `(XᵀWX) v = rhs` through the R factor.
    pub fn solve_normal(&self, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        let u = self
            .r
            .tr_solve_upper_triangular(rhs)
            .ok_or_else(|| Error::Numerical("triangular solve failed".into()))?;
        self.r
            .solve_upper_triangular(&u)
            .ok_or_else(|| Error::Numerical("triangular solve failed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_lu_solve_basic() {
        let lu = LuFactorization::factor(array![[2.0, 1.0], [1.0, 3.0]]).unwrap();
        let x = lu.solve(&[5.0, 7.0]).unwrap();
        assert!((x[0] - 1.6).abs() < 1e-10, "x[0] = {}", x[0]);
        assert!((x[1] - 1.8).abs() < 1e-10, "x[1] = {}", x[1]);
    }

    #[test]
    fn test_lu_needs_pivoting() {
        // Zero on the leading diagonal, as in a Lagrange-augmented system
        let a = array![[0.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0]];
        let lu = LuFactorization::factor(a.clone()).unwrap();
        let b = [2.0, 3.0, 4.0];
        let x = lu.solve(&b).unwrap();
        for i in 0..3 {
            let row: f64 = (0..3).map(|j| a[[i, j]] * x[j]).sum();
            assert!((row - b[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_lu_reused_for_many_rhs() {
        let a = array![[4.0, 1.0, 0.0], [1.0, 4.0, 1.0], [0.0, 1.0, 4.0]];
        let lu = LuFactorization::factor(a.clone()).unwrap();
        for k in 0..5 {
            let b = [k as f64, 1.0, -(k as f64)];
            let x = lu.solve(&b).unwrap();
            for i in 0..3 {
                let row: f64 = (0..3).map(|j| a[[i, j]] * x[j]).sum();
                assert!((row - b[i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_lu_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let err = LuFactorization::factor(a).unwrap_err();
        assert!(err.is_numerical());
    }

    #[test]
    fn test_lu_dimension_checks() {
        assert!(LuFactorization::factor(Array2::zeros((2, 3))).is_err());
        let lu = LuFactorization::factor(array![[1.0]]).unwrap();
        assert!(lu.solve(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_wls_exact_line() {
        // z = 1 + 2x, unit weights
        let design = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let z = [1.0, 3.0, 5.0, 7.0];
        let fit = WeightedLeastSquares::fit(&design, &[1.0; 4], &z).unwrap();
        assert!((fit.coefficients()[0] - 1.0).abs() < 1e-10);
        assert!((fit.coefficients()[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_wls_normal_solve() {
        let design = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let w = [1.0, 2.0, 3.0];
        let fit = WeightedLeastSquares::fit(&design, &w, &[0.0, 1.0, 1.0]).unwrap();

        let xtwx = design.transpose() * DMatrix::from_diagonal(&DVector::from_column_slice(&w)) * &design;
        let rhs = DVector::from_column_slice(&[1.0, 0.5]);
        let v = fit.solve_normal(&rhs).unwrap();
        let back = &xtwx * &v;
        assert!((back[0] - 1.0).abs() < 1e-10);
        assert!((back[1] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_wls_rank_deficient() {
        // Duplicate column
        let design = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        let err = WeightedLeastSquares::fit(&design, &[1.0; 3], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(err.is_numerical());
    }

    #[test]
    fn test_wls_under_determined() {
        let design = DMatrix::from_row_slice(1, 2, &[1.0, 5.0]);
        assert!(WeightedLeastSquares::fit(&design, &[1.0], &[1.0]).is_err());
    }
}
