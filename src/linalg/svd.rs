use log::error;

use super::util::{finite, fuzzy_zero, pythag, sign_transfer};
use super::SvdError;
use crate::matrix::{DynMatrix, DynVector};
use crate::traits::Real;

/// Singular value decomposition of a dense rectangular matrix.
///
/// [`set`](Self::set) computes `A = U * diag(W) * V^T` with thin `u` (m x n),
/// singular values `w` (length n, nonnegative, in no particular order), and
/// orthonormal `v` (n x n). The decomposition then serves linear-algebra
/// queries: truncated and damped least-squares solves, explicit
/// pseudo-inverses, rank and nullspace extraction.
///
/// The reduction to bidiagonal form uses Householder reflections; the
/// bidiagonal form is then diagonalized by implicit-shift QR sweeps with at
/// most `max_iters` sweeps per singular value. Singular values at or below
/// `epsilon` are treated as exactly zero by the solves; that is how
/// under-determined systems are handled, and it is not an error.
///
/// After a failed `set` the factors are unspecified and must not be read.
///
/// # Example
///
/// ```
/// use svdsolve::{DynMatrix, DynVector, SvdDecomposition};
///
/// let a = DynMatrix::from_rows(2, 2, &[3.0_f64, 0.0, 0.0, 2.0]);
/// let mut svd = SvdDecomposition::new();
/// svd.set(&a).unwrap();
/// assert_eq!(svd.rank(), 2);
///
/// let x = svd.back_sub(&DynVector::from_slice(&[3.0, 4.0]));
/// assert!((x[0] - 1.0).abs() < 1e-12);
/// assert!((x[1] - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct SvdDecomposition<T: Real> {
    /// Left singular vectors, m x n. Overwritten wholesale by `set`.
    pub u: DynMatrix<T>,
    /// Singular values, length n. Nonnegative after `set`; unsorted unless
    /// [`sort_singular_values`](Self::sort_singular_values) is called.
    pub w: DynVector<T>,
    /// Right singular vectors, n x n orthonormal.
    pub v: DynMatrix<T>,
    /// Rank cutoff: singular values at or below this count as zero.
    pub epsilon: T,
    /// Sweep budget per singular value.
    pub max_iters: usize,
}

impl<T: Real> SvdDecomposition<T> {
    /// Create an empty decomposition with default tolerances.
    pub fn new() -> Self {
        Self {
            u: DynMatrix::zeros(0, 0),
            w: DynVector::zeros(0),
            v: DynMatrix::zeros(0, 0),
            epsilon: T::default_epsilon(),
            max_iters: 100,
        }
    }

    /// Decompose `a` directly.
    pub fn from_matrix(a: &DynMatrix<T>) -> Result<Self, SvdError> {
        let mut svd = Self::new();
        svd.set(a)?;
        Ok(svd)
    }

    /// Compute the decomposition of `a`, overwriting `u`, `w`, and `v`.
    ///
    /// Fails with [`SvdError::ConvergenceFailure`] if a singular value does
    /// not converge within `max_iters` sweeps, or
    /// [`SvdError::NumericalInvalid`] if a NaN or infinity appears in any
    /// intermediate scalar.
    pub fn set(&mut self, a: &DynMatrix<T>) -> Result<(), SvdError> {
        let m = a.nrows();
        let n = a.ncols();
        let eps = self.epsilon;
        let max_iters = self.max_iters;

        self.u = a.clone();
        self.w = DynVector::zeros(n);
        self.v = DynMatrix::zeros(n, n);
        let Self { u, w, v, .. } = self;

        let two = T::one() + T::one();
        let mut rv1 = vec![T::zero(); n];
        let mut anorm = T::zero();
        let mut g = T::zero();
        let mut scale = T::zero();
        let mut l = 0usize;

        // Householder reduction to upper bidiagonal form. The diagonal lands
        // in w, the superdiagonal in rv1; u accumulates the column
        // reflections in place.
        for i in 0..n {
            l = i + 1;
            rv1[i] = scale * g;
            g = T::zero();
            scale = T::zero();
            if i < m {
                for k in i..m {
                    scale = scale + u[(k, i)].abs();
                }
                if !fuzzy_zero(scale, eps) {
                    let mut s = T::zero();
                    for k in i..m {
                        u[(k, i)] = u[(k, i)] / scale;
                        s = s + u[(k, i)] * u[(k, i)];
                    }
                    let f = u[(i, i)];
                    g = -sign_transfer(s.sqrt(), f);
                    let h = f * g - s;
                    u[(i, i)] = f - g;
                    for j in l..n {
                        let mut s = T::zero();
                        for k in i..m {
                            s = s + u[(k, i)] * u[(k, j)];
                        }
                        let f = finite(s / h)?;
                        for k in i..m {
                            u[(k, j)] = u[(k, j)] + f * u[(k, i)];
                        }
                    }
                    for k in i..m {
                        u[(k, i)] = u[(k, i)] * scale;
                    }
                }
            }
            w[i] = scale * g;
            g = T::zero();
            scale = T::zero();
            if i < m && i + 1 != n {
                for k in l..n {
                    scale = scale + u[(i, k)].abs();
                }
                if !fuzzy_zero(scale, eps) {
                    let mut s = T::zero();
                    for k in l..n {
                        u[(i, k)] = u[(i, k)] / scale;
                        s = s + u[(i, k)] * u[(i, k)];
                    }
                    let f = u[(i, l)];
                    g = -sign_transfer(s.sqrt(), f);
                    let h = f * g - s;
                    u[(i, l)] = f - g;
                    for k in l..n {
                        rv1[k] = finite(u[(i, k)] / h)?;
                    }
                    for j in l..m {
                        let mut s = T::zero();
                        for k in l..n {
                            s = s + u[(j, k)] * u[(i, k)];
                        }
                        for k in l..n {
                            u[(j, k)] = u[(j, k)] + s * rv1[k];
                        }
                    }
                    for k in l..n {
                        u[(i, k)] = u[(i, k)] * scale;
                    }
                }
            }
            anorm = anorm.max(w[i].abs() + rv1[i].abs());
        }

        // Accumulation of the right-hand transformations into v.
        for i in (0..n).rev() {
            if i < n - 1 {
                if !fuzzy_zero(g, eps) {
                    for j in l..n {
                        // double division avoids a possible underflow
                        v[(j, i)] = finite((u[(i, j)] / u[(i, l)]) / g)?;
                    }
                    for j in l..n {
                        let mut s = T::zero();
                        for k in l..n {
                            s = s + u[(i, k)] * v[(k, j)];
                        }
                        for k in l..n {
                            v[(k, j)] = v[(k, j)] + s * v[(k, i)];
                        }
                    }
                }
                for j in l..n {
                    v[(i, j)] = T::zero();
                    v[(j, i)] = T::zero();
                }
            }
            v[(i, i)] = T::one();
            g = rv1[i];
            l = i;
        }

        // Accumulation of the left-hand transformations into u.
        for i in (0..m.min(n)).rev() {
            let l = i + 1;
            let mut g = w[i];
            for j in l..n {
                u[(i, j)] = T::zero();
            }
            if !fuzzy_zero(g, eps) {
                g = T::one() / g;
                for j in l..n {
                    let mut s = T::zero();
                    for k in l..m {
                        s = s + u[(k, i)] * u[(k, j)];
                    }
                    let f = finite((s / u[(i, i)]) * g)?;
                    for k in i..m {
                        u[(k, j)] = u[(k, j)] + f * u[(k, i)];
                    }
                }
                for j in i..m {
                    u[(j, i)] = u[(j, i)] * g;
                }
            } else {
                for j in i..m {
                    u[(j, i)] = T::zero();
                }
            }
            u[(i, i)] = u[(i, i)] + T::one();
        }

        // Diagonalization of the bidiagonal form: loop over singular values
        // (last to first) and over allowed sweeps per value.
        for k in (0..n).rev() {
            for its in 1..=max_iters {
                // Test for splitting: a superdiagonal entry is negligible
                // when adding it to the bidiagonal norm changes nothing.
                // rv1[0] is always exactly zero, so falling off the bottom
                // of this scan is the same as splitting there.
                let mut l = k;
                let mut cancel = false;
                while l > 0 {
                    if rv1[l].abs() + anorm == anorm {
                        break;
                    }
                    if w[l - 1].abs() + anorm == anorm {
                        cancel = true;
                        break;
                    }
                    l -= 1;
                }

                if cancel {
                    // w[l-1] is negligible: rotate rv1[l] to zero so the
                    // block splits at l.
                    let nm = l - 1;
                    let mut c = T::zero();
                    let mut s = T::one();
                    for i in l..=k {
                        let f = s * rv1[i];
                        rv1[i] = c * rv1[i];
                        if f.abs() + anorm == anorm {
                            break;
                        }
                        let g = w[i];
                        let h = finite(pythag(f, g))?;
                        w[i] = h;
                        let h = finite(T::one() / h)?;
                        c = g * h;
                        s = -f * h;
                        for j in 0..m {
                            let y = u[(j, nm)];
                            let z = u[(j, i)];
                            u[(j, nm)] = y * c + z * s;
                            u[(j, i)] = z * c - y * s;
                        }
                    }
                }

                let z = w[k];
                if l == k {
                    // converged; make the singular value nonnegative
                    if z < T::zero() {
                        w[k] = -z;
                        for j in 0..n {
                            v[(j, k)] = -v[(j, k)];
                        }
                    }
                    break;
                }
                if its == max_iters {
                    error!(
                        "SVD: no convergence for a singular value in {} sweeps",
                        max_iters
                    );
                    return Err(SvdError::ConvergenceFailure);
                }

                // Shift from the bottom 2x2 minor.
                let mut x = w[l];
                let nm = k - 1;
                let mut y = w[nm];
                let mut g = rv1[nm];
                let mut h = rv1[k];
                let mut f =
                    finite(((y - z) * (y + z) + (g - h) * (g + h)) / (two * h * y))?;
                g = finite(pythag(f, T::one()))?;
                f = finite(
                    ((x - z) * (x + z) + h * ((y / (f + sign_transfer(g, f))) - h)) / x,
                )?;

                // Next QR sweep: chase the bulge down the bidiagonal,
                // accumulating the rotations into u and v.
                let mut c = T::one();
                let mut s = T::one();
                for j in l..=nm {
                    let i = j + 1;
                    g = rv1[i];
                    y = w[i];
                    h = s * g;
                    g = c * g;
                    let z = finite(pythag(f, h))?;
                    rv1[j] = z;
                    c = finite(f / z)?;
                    s = finite(h / z)?;
                    f = x * c + g * s;
                    g = g * c - x * s;
                    h = y * s;
                    y = y * c;
                    for jj in 0..n {
                        let xv = v[(jj, j)];
                        let zv = v[(jj, i)];
                        v[(jj, j)] = xv * c + zv * s;
                        v[(jj, i)] = zv * c - xv * s;
                    }
                    let z = finite(pythag(f, h))?;
                    w[j] = z;
                    // rotation can be arbitrary if z is zero
                    if !fuzzy_zero(z, eps) {
                        let zinv = T::one() / z;
                        c = f * zinv;
                        s = h * zinv;
                    }
                    f = c * g + s * y;
                    x = c * y - s * g;
                    for jj in 0..m {
                        let yu = u[(jj, j)];
                        let zu = u[(jj, i)];
                        u[(jj, j)] = yu * c + zu * s;
                        u[(jj, i)] = zu * c - yu * s;
                    }
                }
                rv1[l] = T::zero();
                rv1[k] = f;
                w[k] = x;
            }
        }

        Ok(())
    }

    /// Empty all three factors.
    pub fn clear(&mut self) {
        self.u = DynMatrix::zeros(0, 0);
        self.w = DynVector::zeros(0);
        self.v = DynMatrix::zeros(0, 0);
    }

    /// Allocate m x n storage without populating values.
    pub fn resize(&mut self, m: usize, n: usize) {
        self.u.resize(m, n);
        self.w = DynVector::zeros(n);
        self.v.resize(n, n);
    }

    /// Install the trivial decomposition of the m x n identity map without
    /// running the iteration.
    pub fn set_identity(&mut self, m: usize, n: usize) {
        self.u = DynMatrix::zeros(m, n);
        self.w = DynVector::zeros(n);
        self.v = DynMatrix::eye(n);
        for i in 0..m.min(n) {
            self.u[(i, i)] = T::one();
            self.w[i] = T::one();
        }
    }

    /// Install the trivial decomposition of the m x n zero map.
    pub fn set_zero(&mut self, m: usize, n: usize) {
        self.u = DynMatrix::zeros(m, n);
        self.w = DynVector::zeros(n);
        self.v = DynMatrix::eye(n);
        for i in 0..m.min(n) {
            self.u[(i, i)] = T::one();
        }
    }

    /// Numerical rank: number of singular values strictly above `epsilon`.
    pub fn rank(&self) -> usize {
        let eps = self.epsilon;
        self.w.iter().filter(|&&wi| wi > eps).count()
    }

    /// Dimension of the nullspace: n minus the rank.
    pub fn nullity(&self) -> usize {
        self.u.ncols() - self.rank()
    }

    /// Minimum-norm least-squares solve `x = V * diag(1/w) * U^T * b`.
    ///
    /// Singular values at or below `epsilon` are treated as exactly zero, so
    /// near-singular directions contribute nothing instead of blowing up.
    pub fn back_sub(&self, b: &DynVector<T>) -> DynVector<T> {
        let m = self.u.nrows();
        let n = self.u.ncols();
        assert_eq!(b.len(), m, "rhs length mismatch");

        let mut tmp = DynVector::zeros(n);
        for j in 0..n {
            if self.w[j] > self.epsilon {
                tmp[j] = self.u.col_dot(j, b) / self.w[j];
            }
        }
        self.v.mul_vector(&tmp)
    }

    /// Damped least-squares solve `x = V * diag(1/(w + lambda)) * U^T * b`.
    ///
    /// The damping term is linear in the singular value, deliberately not
    /// the Tikhonov form `w/(w^2 + lambda^2)`. A damped divisor at or below
    /// `epsilon` contributes zero.
    pub fn damped_back_sub(&self, b: &DynVector<T>, lambda: T) -> DynVector<T> {
        let m = self.u.nrows();
        let n = self.u.ncols();
        assert_eq!(b.len(), m, "rhs length mismatch");

        let mut tmp = DynVector::zeros(n);
        for j in 0..n {
            let d = self.w[j] + lambda;
            if !fuzzy_zero(d, self.epsilon) {
                tmp[j] = self.u.col_dot(j, b) / d;
            }
        }
        self.v.mul_vector(&tmp)
    }

    /// Truncated pseudo-inverse `A+ = V * diag(1/w) * U^T` (n x m).
    ///
    /// Built one output column at a time against unit basis vectors,
    /// O(m n^2).
    pub fn pseudo_inverse(&self) -> DynMatrix<T> {
        let m = self.u.nrows();
        let n = self.u.ncols();
        let mut ainv = DynMatrix::zeros(n, m);
        let mut tmp = DynVector::zeros(n);
        for i in 0..m {
            for j in 0..n {
                tmp[j] = if self.w[j] > self.epsilon {
                    self.u[(i, j)] / self.w[j]
                } else {
                    T::zero()
                };
            }
            let col = self.v.mul_vector(&tmp);
            ainv.set_col(i, &col);
        }
        ainv
    }

    /// Damped pseudo-inverse `V * diag(1/(w + lambda)) * U^T` (n x m).
    pub fn damped_pseudo_inverse(&self, lambda: T) -> DynMatrix<T> {
        let m = self.u.nrows();
        let n = self.u.ncols();
        let mut ainv = DynMatrix::zeros(n, m);
        let mut tmp = DynVector::zeros(n);
        for i in 0..m {
            for j in 0..n {
                let d = self.w[j] + lambda;
                tmp[j] = if fuzzy_zero(d, self.epsilon) {
                    T::zero()
                } else {
                    self.u[(i, j)] / d
                };
            }
            let col = self.v.mul_vector(&tmp);
            ainv.set_col(i, &col);
        }
        ainv
    }

    /// Project `x` onto the nullspace of the decomposed matrix.
    ///
    /// Computes `y = V^T x`, zeros the coordinates paired with near-zero
    /// singular values, reconstructs `z = V y`, and returns `x - z`: the
    /// component of `x` annihilated by A.
    pub fn nullspace_component(&self, x: &DynVector<T>) -> DynVector<T> {
        let n = self.u.ncols();
        assert_eq!(x.len(), n, "vector length mismatch");

        let mut y = self.v.mul_transpose_vector(x);
        for i in 0..n {
            if self.w[i] <= self.epsilon {
                y[i] = T::zero();
            }
        }
        let z = self.v.mul_vector(&y);
        let mut out = DynVector::zeros(n);
        for i in 0..n {
            out[i] = x[i] - z[i];
        }
        out
    }

    /// Basis for the nullspace: the columns of V paired with singular values
    /// at or below `epsilon`, as an n x nullity matrix.
    pub fn nullspace(&self) -> DynMatrix<T> {
        let n = self.u.ncols();
        let mut basis = DynMatrix::zeros(n, self.nullity());
        let mut nz = 0;
        for j in 0..n {
            if self.w[j] <= self.epsilon {
                for i in 0..n {
                    basis[(i, nz)] = self.v[(i, j)];
                }
                nz += 1;
            }
        }
        basis
    }

    /// Stably reorder the singular values descending by magnitude, permuting
    /// the columns of U and V in lock-step.
    ///
    /// The iteration gives no ordering guarantee, so callers wanting the
    /// conventional ordering must ask for it.
    pub fn sort_singular_values(&mut self) {
        let m = self.u.nrows();
        let n = self.w.len();

        let mut order: Vec<usize> = (0..n).collect();
        let w = &self.w;
        order.sort_by(|&a, &b| {
            w[b].abs()
                .partial_cmp(&w[a].abs())
                .unwrap_or(core::cmp::Ordering::Equal)
        });

        let mut tu = DynMatrix::zeros(m, n);
        let mut tv = DynMatrix::zeros(n, n);
        let mut tw = DynVector::zeros(n);
        for (dst, &src) in order.iter().enumerate() {
            tw[dst] = self.w[src];
            for i in 0..m {
                tu[(i, dst)] = self.u[(i, src)];
            }
            for i in 0..n {
                tv[(i, dst)] = self.v[(i, src)];
            }
        }
        self.u = tu;
        self.w = tw;
        self.v = tv;
    }
}

impl<T: Real> Default for SvdDecomposition<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    fn assert_near(a: f64, b: f64, tol: f64, msg: &str) {
        assert!(
            (a - b).abs() < tol,
            "{}: {} vs {} (diff {})",
            msg,
            a,
            b,
            (a - b).abs()
        );
    }

    fn reconstruct(svd: &SvdDecomposition<f64>) -> DynMatrix<f64> {
        let m = svd.u.nrows();
        let n = svd.u.ncols();
        DynMatrix::from_fn(m, n, |i, j| {
            let mut sum = 0.0;
            for k in 0..n {
                sum += svd.u[(i, k)] * svd.w[k] * svd.v[(j, k)];
            }
            sum
        })
    }

    fn assert_reconstructs(a: &DynMatrix<f64>, svd: &SvdDecomposition<f64>, tol: f64) {
        let recon = reconstruct(svd);
        for i in 0..a.nrows() {
            for j in 0..a.ncols() {
                assert_near(
                    recon[(i, j)],
                    a[(i, j)],
                    tol,
                    &format!("UWV^T[({},{})]", i, j),
                );
            }
        }
    }

    fn assert_v_orthonormal(svd: &SvdDecomposition<f64>, tol: f64) {
        let vtv = &svd.v.transpose() * &svd.v;
        let n = svd.v.ncols();
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(vtv[(i, j)], expected, tol, &format!("VtV[({},{})]", i, j));
            }
        }
    }

    #[test]
    fn identity_2x2() {
        // W = [1, 1], rank 2, pseudo-inverse is the identity
        let a = DynMatrix::<f64>::eye(2);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();

        for i in 0..2 {
            assert_near(svd.w[i], 1.0, TOL, &format!("w[{}]", i));
        }
        assert_eq!(svd.rank(), 2);

        let inv = svd.pseudo_inverse();
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(inv[(i, j)], expected, TOL, &format!("inv[({},{})]", i, j));
            }
        }
    }

    #[test]
    fn reconstruction_3x3() {
        let a = DynMatrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 0.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        assert_reconstructs(&a, &svd, 1e-9);
        assert_v_orthonormal(&svd, 1e-9);
    }

    #[test]
    fn reconstruction_tall_5x3() {
        let a = DynMatrix::from_rows(
            5,
            3,
            &[
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 0.0, 10.0, 11.0, 1.0, 13.0, 14.0, 2.0,
            ],
        );
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        assert_reconstructs(&a, &svd, 1e-8);
        assert_v_orthonormal(&svd, 1e-9);
    }

    #[test]
    fn reconstruction_wide_2x4() {
        let a = DynMatrix::from_rows(2, 4, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        assert_reconstructs(&a, &svd, 1e-9);
        assert_v_orthonormal(&svd, 1e-9);
        // a wide matrix has at least n - m zero singular values
        assert!(svd.nullity() >= 2);
    }

    #[test]
    fn singular_values_nonnegative() {
        let a = DynMatrix::from_rows(2, 2, &[-3.0, 0.0, 0.0, 2.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        for i in 0..2 {
            assert!(svd.w[i] >= 0.0, "w[{}] = {}", i, svd.w[i]);
        }
        assert_reconstructs(&a, &svd, TOL);
    }

    #[test]
    fn u_columns_orthonormal_for_nonzero_w() {
        let a = DynMatrix::from_rows(3, 3, &[4.0, 1.0, -1.0, 1.0, 3.0, 2.0, -1.0, 2.0, 5.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        for p in 0..3 {
            if svd.w[p] <= svd.epsilon {
                continue;
            }
            for q in 0..3 {
                if svd.w[q] <= svd.epsilon {
                    continue;
                }
                let dot = svd.u.col_dot(p, &svd.u.col(q));
                let expected = if p == q { 1.0 } else { 0.0 };
                assert_near(dot, expected, 1e-9, &format!("UtU[({},{})]", p, q));
            }
        }
    }

    #[test]
    fn rank_deficient_2x2() {
        // rank 1: second row is twice the first
        let a = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();

        assert_eq!(svd.rank(), 1);
        assert_eq!(svd.nullity(), 1);

        let ns = svd.nullspace();
        assert_eq!(ns.nrows(), 2);
        assert_eq!(ns.ncols(), 1);

        // basis column is a unit vector proportional to [2, -1]
        let c = ns.col(0);
        assert_near(c.dot(&c), 1.0, TOL, "|c|^2");
        assert_near(c[0] * (-1.0) - c[1] * 2.0, 0.0, 1e-7, "c parallel to [2,-1]");

        // A * c = 0
        let ac = a.mul_vector(&c);
        assert_near(ac[0], 0.0, 1e-7, "Ac[0]");
        assert_near(ac[1], 0.0, 1e-7, "Ac[1]");
    }

    #[test]
    fn rank_plus_nullity_is_n() {
        let a = DynMatrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 3.0, 6.0, 9.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        assert_eq!(svd.rank() + svd.nullity(), 3);
        assert_eq!(svd.rank(), 1);
    }

    #[test]
    fn back_sub_full_rank() {
        let a = DynMatrix::from_rows(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        // x = [1, 2] gives b = [4, 7]
        let x = svd.back_sub(&DynVector::from_slice(&[4.0, 7.0]));
        assert_near(x[0], 1.0, 1e-9, "x[0]");
        assert_near(x[1], 2.0, 1e-9, "x[1]");
    }

    #[test]
    fn back_sub_minimum_norm() {
        // singular A: the second coordinate is unconstrained, and the
        // truncated solve must leave it at zero
        let a = DynMatrix::from_rows(2, 2, &[1.0, 0.0, 0.0, 0.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        let x = svd.back_sub(&DynVector::from_slice(&[3.0, 4.0]));
        assert_near(x[0], 3.0, TOL, "x[0]");
        assert_near(x[1], 0.0, TOL, "x[1]");
    }

    #[test]
    fn damped_back_sub_zero_lambda_matches_back_sub() {
        let a = DynMatrix::from_rows(2, 2, &[3.0, 1.0, 1.0, 2.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        let b = DynVector::from_slice(&[1.0, -2.0]);
        let plain = svd.back_sub(&b);
        let damped = svd.damped_back_sub(&b, 0.0);
        for i in 0..2 {
            assert_near(damped[i], plain[i], 1e-9, &format!("x[{}]", i));
        }
    }

    #[test]
    fn damped_back_sub_linear_damping() {
        // diagonal matrix: the damped solve divides by w + lambda exactly
        let a = DynMatrix::from_rows(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        let x = svd.damped_back_sub(&DynVector::from_slice(&[2.0, 4.0]), 0.5);
        assert_near(x[0], 2.0 / 2.5, 1e-9, "x[0]");
        assert_near(x[1], 4.0 / 4.5, 1e-9, "x[1]");
    }

    #[test]
    fn damped_pseudo_inverse_matches_damped_back_sub() {
        let a = DynMatrix::from_rows(2, 2, &[3.0, 1.0, 2.0, 5.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        let lambda = 0.25;
        let ainv = svd.damped_pseudo_inverse(lambda);
        let b = DynVector::from_slice(&[1.0, 1.0]);
        let x_inv = ainv.mul_vector(&b);
        let x_sub = svd.damped_back_sub(&b, lambda);
        for i in 0..2 {
            assert_near(x_inv[i], x_sub[i], 1e-9, &format!("x[{}]", i));
        }
    }

    #[test]
    fn pseudo_inverse_full_rank_square() {
        let a = DynMatrix::from_rows(3, 3, &[2.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 4.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        let ainv = svd.pseudo_inverse();
        let id = &a * &ainv;
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(id[(i, j)], expected, 1e-9, &format!("AAinv[({},{})]", i, j));
            }
        }
    }

    #[test]
    fn nullspace_component_splits_vector() {
        let a = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        let x = DynVector::from_slice(&[1.0, 1.0]);
        let xnull = svd.nullspace_component(&x);

        // the nullspace part is annihilated by A
        let ax = a.mul_vector(&xnull);
        assert_near(ax[0], 0.0, 1e-7, "A xnull [0]");
        assert_near(ax[1], 0.0, 1e-7, "A xnull [1]");

        // the remainder x - xnull is orthogonal to the nullspace
        let ns = svd.nullspace().col(0);
        let range_part = DynVector::from_slice(&[x[0] - xnull[0], x[1] - xnull[1]]);
        assert_near(range_part.dot(&ns), 0.0, 1e-7, "range part vs nullspace");
    }

    #[test]
    fn nullspace_component_of_full_rank_is_zero() {
        let a = DynMatrix::from_rows(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        let xnull = svd.nullspace_component(&DynVector::from_slice(&[5.0, -7.0]));
        assert_near(xnull[0], 0.0, 1e-9, "xnull[0]");
        assert_near(xnull[1], 0.0, 1e-9, "xnull[1]");
    }

    #[test]
    fn sort_is_descending_and_idempotent() {
        let a = DynMatrix::from_rows(
            4,
            4,
            &[
                10.0, 3.0, 0.0, 0.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0, 7.0, 2.0, 0.0, 0.0, 2.0, 4.0,
            ],
        );
        let mut svd = SvdDecomposition::from_matrix(&a).unwrap();
        svd.sort_singular_values();
        for i in 0..3 {
            assert!(
                svd.w[i] >= svd.w[i + 1],
                "not descending: w[{}]={} < w[{}]={}",
                i,
                svd.w[i],
                i + 1,
                svd.w[i + 1]
            );
        }
        // sorting again changes nothing, and the factorization survives
        let once = svd.clone();
        svd.sort_singular_values();
        for i in 0..4 {
            assert_eq!(svd.w[i], once.w[i]);
        }
        assert_reconstructs(&a, &svd, 1e-9);
    }

    #[test]
    fn convergence_failure_with_tiny_budget() {
        // Non-orthogonal columns leave a large bidiagonal superdiagonal, so
        // at least one QR sweep is required and a budget of 1 is exhausted
        // before the last singular value converges. (A matrix with
        // orthogonal columns would not do: it bidiagonalizes to an already
        // diagonal form and converges without sweeping.)
        let a = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let mut svd = SvdDecomposition::new();
        svd.max_iters = 1;
        assert_eq!(svd.set(&a).unwrap_err(), SvdError::ConvergenceFailure);
    }

    #[test]
    fn nan_input_fails_fast() {
        let a = DynMatrix::from_rows(2, 2, &[1.0, f64::NAN, 0.0, 1.0]);
        let mut svd = SvdDecomposition::new();
        assert_eq!(svd.set(&a).unwrap_err(), SvdError::NumericalInvalid);
    }

    #[test]
    fn set_identity_bootstrap() {
        let mut svd = SvdDecomposition::<f64>::new();
        svd.set_identity(3, 2);
        assert_eq!(svd.u.nrows(), 3);
        assert_eq!(svd.u.ncols(), 2);
        assert_eq!(svd.rank(), 2);
        let x = svd.back_sub(&DynVector::from_slice(&[5.0, 6.0, 7.0]));
        assert_near(x[0], 5.0, TOL, "x[0]");
        assert_near(x[1], 6.0, TOL, "x[1]");
    }

    #[test]
    fn set_zero_bootstrap() {
        let mut svd = SvdDecomposition::<f64>::new();
        svd.set_zero(2, 2);
        assert_eq!(svd.rank(), 0);
        assert_eq!(svd.nullity(), 2);
        let x = svd.back_sub(&DynVector::from_slice(&[1.0, 1.0]));
        assert_near(x[0], 0.0, TOL, "x[0]");
        assert_near(x[1], 0.0, TOL, "x[1]");
    }

    #[test]
    fn clear_and_resize() {
        let mut svd = SvdDecomposition::<f64>::new();
        svd.set_identity(2, 2);
        svd.clear();
        assert_eq!(svd.u.nrows(), 0);
        assert_eq!(svd.w.len(), 0);
        svd.resize(4, 3);
        assert_eq!(svd.u.nrows(), 4);
        assert_eq!(svd.u.ncols(), 3);
        assert_eq!(svd.w.len(), 3);
        assert_eq!(svd.v.nrows(), 3);
    }

    #[test]
    fn f32_direct() {
        let a = DynMatrix::from_rows(2, 2, &[3.0_f32, 1.0, 1.0, 3.0]);
        let svd = SvdDecomposition::from_matrix(&a).unwrap();
        let mut sorted = [svd.w[0], svd.w[1]];
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert!((sorted[0] - 4.0).abs() < 1e-5);
        assert!((sorted[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn known_2x2_singular_values() {
        // A^T A = [[13, 12], [12, 13]] with eigenvalues 25 and 1
        let a = DynMatrix::from_rows(2, 2, &[3.0, 2.0, 2.0, 3.0]);
        let mut svd = SvdDecomposition::from_matrix(&a).unwrap();
        svd.sort_singular_values();
        assert_near(svd.w[0], 5.0, TOL, "w[0]");
        assert_near(svd.w[1], 1.0, TOL, "w[1]");
    }
}
