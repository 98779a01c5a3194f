use super::util::{finite, fuzzy_zero, sign_transfer};
use super::SvdError;
use crate::matrix::DynMatrix;
use crate::traits::Real;

/// QR decomposition of a dense matrix (m >= n) via Householder reflections.
///
/// Stores the packed Householder vectors, R, and tau scalars. Consumed by
/// [`crate::RobustSvd`] as the fallback factorization; a zero column yields
/// tau = 0 (the reflection is skipped) rather than an error, so
/// rank-deficient matrices factor cleanly.
///
/// # Example
///
/// ```
/// use svdsolve::{DynMatrix, QrDecomposition};
///
/// let a = DynMatrix::from_rows(3, 2, &[
///     1.0_f64, 0.0,
///     1.0, 1.0,
///     1.0, 2.0,
/// ]);
/// let qr = QrDecomposition::new(&a).unwrap();
/// let recon = &qr.q() * &qr.r();
/// assert!((&recon - &a).max_abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct QrDecomposition<T> {
    qr: DynMatrix<T>,
    tau: Vec<T>,
}

impl<T: Real> QrDecomposition<T> {
    /// Decompose a matrix. Fails only if a NaN or infinity is produced.
    pub fn new(a: &DynMatrix<T>) -> Result<Self, SvdError> {
        let m = a.nrows();
        let n = a.ncols();
        assert!(m >= n, "QR decomposition requires m >= n");

        let mut qr = a.clone();
        let mut tau = vec![T::zero(); n];

        for col in 0..n {
            let mut norm_sq = T::zero();
            for i in col..m {
                let v = qr[(i, col)];
                norm_sq = norm_sq + v * v;
            }

            if fuzzy_zero(norm_sq, T::epsilon()) {
                // tau stays zero: H_col = I, and R gets a zero column
                for i in col..m {
                    qr[(i, col)] = T::zero();
                }
                continue;
            }

            let norm = finite(norm_sq.sqrt())?;
            let a_cc = qr[(col, col)];
            let sigma = sign_transfer(norm, a_cc);

            // v = [1, a[col+1,col]/v0, ...] stored in-place below the diagonal
            let v0 = a_cc + sigma;
            qr[(col, col)] = v0;
            let tau_val = finite(v0 / sigma)?;
            tau[col] = tau_val;

            for i in (col + 1)..m {
                qr[(i, col)] = qr[(i, col)] / v0;
            }

            // Apply H to trailing columns: A[col:m, col+1:n] -= tau * v * (v^T A)
            for j in (col + 1)..n {
                let mut dot = qr[(col, j)];
                for i in (col + 1)..m {
                    dot = dot + qr[(i, col)] * qr[(i, j)];
                }
                dot = dot * tau_val;

                qr[(col, j)] = qr[(col, j)] - dot;
                for i in (col + 1)..m {
                    let vi = qr[(i, col)];
                    qr[(i, j)] = qr[(i, j)] - dot * vi;
                }
            }

            qr[(col, col)] = -sigma;
        }

        Ok(Self { qr, tau })
    }

    /// Extract the upper-triangular R factor (n x n).
    pub fn r(&self) -> DynMatrix<T> {
        let n = self.qr.ncols();
        let mut r = DynMatrix::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                r[(i, j)] = self.qr[(i, j)];
            }
        }
        r
    }

    /// Compute the thin Q factor (m x n, orthonormal columns).
    ///
    /// Applies the Householder reflections in reverse to the first n columns
    /// of the identity.
    pub fn q(&self) -> DynMatrix<T> {
        let m = self.qr.nrows();
        let n = self.qr.ncols();

        let mut q = DynMatrix::zeros(m, n);
        for i in 0..n {
            q[(i, i)] = T::one();
        }

        for col in (0..n).rev() {
            let tau_val = self.tau[col];

            for j in col..n {
                let mut dot = q[(col, j)];
                for i in (col + 1)..m {
                    dot = dot + self.qr[(i, col)] * q[(i, j)];
                }
                dot = dot * tau_val;

                q[(col, j)] = q[(col, j)] - dot;
                for i in (col + 1)..m {
                    q[(i, j)] = q[(i, j)] - dot * self.qr[(i, col)];
                }
            }
        }

        q
    }
}
