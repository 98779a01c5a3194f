use log::warn;

use super::qr::QrDecomposition;
use super::svd::SvdDecomposition;
use super::util::fuzzy_zero;
use super::SvdError;
use crate::matrix::{DynMatrix, DynVector};
use crate::traits::Real;

/// Robust singular value decomposition for poorly scaled or structurally
/// rank-deficient matrices.
///
/// A successful [`set`](Self::set) establishes
/// `A = diag(pre) * U * diag(W) * V^T * diag(post)`: the input is first
/// conditioned by diagonal row and/or column scaling (per the
/// `pre_multiply` / `post_multiply` flags), entries drowned in roundoff are
/// zeroed, and the scaled matrix goes to the direct
/// [`SvdDecomposition`] engine. If the direct attempt fails, the conditioned
/// matrix is QR-factored and the decomposition is retried on the R factor
/// (with column conditioning forced), reconstructing `U = Q * U_r` and
/// composing the column scales. Only a double failure surfaces an error.
///
/// All computation runs at full ([`Real::Wide`]) precision regardless of
/// `T`, so the `f32` instantiation does not compound conditioning and
/// iteration rounding; results are narrowed on the way out.
///
/// The query methods express their results in the caller's original
/// coordinates by undoing the conditioning scales.
///
/// # Example
///
/// ```
/// use svdsolve::{DynMatrix, RobustSvd};
///
/// // rows differ in magnitude by a factor of 1e12
/// let a = DynMatrix::from_rows(2, 2, &[1e12_f64, 2e12, 3.0, -4.0]);
/// let mut rsvd = RobustSvd::new();
/// rsvd.set(&a).unwrap();
/// assert_eq!(rsvd.rank(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RobustSvd<T: Real> {
    /// The wrapped direct engine holding U, W, V.
    pub svd: SvdDecomposition<T>,
    /// Diagonal row scales, length m.
    pub pre: DynVector<T>,
    /// Diagonal column scales, length n.
    pub post: DynVector<T>,
    /// Condition by row scaling (default true).
    pub pre_multiply: bool,
    /// Condition by column scaling (default false).
    pub post_multiply: bool,
    /// Entries of the conditioned matrix at or below this are zeroed to
    /// suppress roundoff noise.
    pub zero_element_epsilon: T,
}

impl<T: Real> RobustSvd<T> {
    /// Create an empty robust decomposition with default conditioning
    /// (row scaling on, column scaling off) and a 500-sweep budget.
    pub fn new() -> Self {
        let mut svd = SvdDecomposition::new();
        svd.max_iters = 500;
        Self {
            svd,
            pre: DynVector::zeros(0),
            post: DynVector::zeros(0),
            pre_multiply: true,
            post_multiply: false,
            zero_element_epsilon: T::default_epsilon(),
        }
    }

    /// Decompose `a` directly.
    pub fn from_matrix(a: &DynMatrix<T>) -> Result<Self, SvdError> {
        let mut rsvd = Self::new();
        rsvd.set(a)?;
        Ok(rsvd)
    }

    /// Compute the conditioned decomposition of `a`, retrying through a QR
    /// factorization if the direct attempt fails.
    ///
    /// Always computes at [`Real::Wide`] precision and narrows the results;
    /// for `f64` the widening is the identity.
    pub fn set(&mut self, a: &DynMatrix<T>) -> Result<(), SvdError> {
        let mut wide: RobustSvd<T::Wide> = RobustSvd::new();
        wide.pre_multiply = self.pre_multiply;
        wide.post_multiply = self.post_multiply;
        wide.zero_element_epsilon = self.zero_element_epsilon.widen();
        wide.svd.epsilon = self.svd.epsilon.widen();
        wide.svd.max_iters = self.svd.max_iters;

        wide.set_with_fallback(&a.map(|x| x.widen()))?;

        self.pre = wide.pre.map(T::narrow);
        self.post = wide.post.map(T::narrow);
        self.svd.u = wide.svd.u.map(T::narrow);
        self.svd.w = wide.svd.w.map(T::narrow);
        self.svd.v = wide.svd.v.map(T::narrow);
        Ok(())
    }

    /// Compute the row/column conditioning scales of `a` per the flags.
    ///
    /// Scales are the per-row (and/or per-column) maximum absolute values;
    /// an all-zero row or column gets scale 1. Enabling both flags at once
    /// is a degraded, only partially supported mode: it warns and falls back
    /// to row scaling alone rather than inventing a combined formula.
    pub fn calc_conditioning(&mut self, a: &DynMatrix<T>) {
        let m = a.nrows();
        let n = a.ncols();
        self.pre = DynVector::ones(m);
        self.post = DynVector::ones(n);

        if self.pre_multiply && self.post_multiply {
            warn!("RobustSvd: combined pre/post conditioning is only partially supported; using row scaling only");
            self.calc_row_scales(a);
        } else if self.pre_multiply {
            self.calc_row_scales(a);
        } else if self.post_multiply {
            self.calc_col_scales(a);
        }
    }

    fn calc_row_scales(&mut self, a: &DynMatrix<T>) {
        for i in 0..a.nrows() {
            let mut s = T::zero();
            for j in 0..a.ncols() {
                s = s.max(a[(i, j)].abs());
            }
            self.pre[i] = if s == T::zero() { T::one() } else { s };
        }
    }

    fn calc_col_scales(&mut self, a: &DynMatrix<T>) {
        for j in 0..a.ncols() {
            let mut s = T::zero();
            for i in 0..a.nrows() {
                s = s.max(a[(i, j)].abs());
            }
            self.post[j] = if s == T::zero() { T::one() } else { s };
        }
    }

    /// Working copy of `a` with the conditioning scales divided out and
    /// roundoff-level entries zeroed.
    fn conditioned_copy(&self, a: &DynMatrix<T>) -> DynMatrix<T> {
        let mut work = a.clone();
        for j in 0..work.ncols() {
            for i in 0..work.nrows() {
                let mut x = work[(i, j)];
                if self.pre_multiply {
                    x = x / self.pre[i];
                }
                if self.post_multiply {
                    x = x / self.post[j];
                }
                work[(i, j)] = if fuzzy_zero(x, self.zero_element_epsilon) {
                    T::zero()
                } else {
                    x
                };
            }
        }
        work
    }

    /// Condition `a` and run the direct engine, without the QR fallback.
    pub fn set_conditioned(&mut self, a: &DynMatrix<T>) -> Result<(), SvdError> {
        self.calc_conditioning(a);
        let work = self.conditioned_copy(a);
        self.svd.set(&work)
    }

    /// The full pipeline at the current precision: direct attempt, then one
    /// QR-fallback attempt. The nested attempt never falls back again, so
    /// the retry chain is bounded by construction.
    fn set_with_fallback(&mut self, a: &DynMatrix<T>) -> Result<(), SvdError> {
        self.calc_conditioning(a);
        let work = self.conditioned_copy(a);
        let err = match self.svd.set(&work) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        // The Householder QR below needs m >= n; for wide inputs the direct
        // error stands.
        if work.nrows() < work.ncols() {
            return Err(err);
        }
        let qr = match QrDecomposition::new(&work) {
            Ok(qr) => qr,
            Err(_) => return Err(err),
        };

        // work = Q * R and R = U_r * W * V^T * diag(post_r), so
        // U = Q * U_r and the column scales compose.
        let mut rsvd = RobustSvd::new();
        rsvd.pre_multiply = false;
        rsvd.post_multiply = true;
        rsvd.zero_element_epsilon = self.zero_element_epsilon;
        rsvd.svd.epsilon = self.svd.epsilon;
        rsvd.svd.max_iters = self.svd.max_iters;
        if rsvd.set_conditioned(&qr.r()).is_err() {
            return Err(err);
        }

        self.svd.u = &qr.q() * &rsvd.svd.u;
        self.svd.w = rsvd.svd.w;
        self.svd.v = rsvd.svd.v;
        for j in 0..self.post.len() {
            self.post[j] = self.post[j] * rsvd.post[j];
        }
        Ok(())
    }

    /// Empty all factors and scales.
    pub fn clear(&mut self) {
        self.pre = DynVector::zeros(0);
        self.post = DynVector::zeros(0);
        self.svd.clear();
    }

    /// Allocate storage for an m x n decomposition without populating it.
    pub fn resize(&mut self, m: usize, n: usize) {
        self.pre = DynVector::ones(m);
        self.post = DynVector::ones(n);
        self.svd.resize(m, n);
    }

    /// Install the trivial decomposition of the identity map.
    pub fn set_identity(&mut self, m: usize, n: usize) {
        self.pre = DynVector::ones(m);
        self.post = DynVector::ones(n);
        self.svd.set_identity(m, n);
    }

    /// Install the trivial decomposition of the zero map.
    pub fn set_zero(&mut self, m: usize, n: usize) {
        self.pre = DynVector::ones(m);
        self.post = DynVector::ones(n);
        self.svd.set_zero(m, n);
    }

    /// Numerical rank of the conditioned matrix.
    pub fn rank(&self) -> usize {
        self.svd.rank()
    }

    /// Dimension of the nullspace.
    pub fn nullity(&self) -> usize {
        self.svd.nullity()
    }

    /// Minimum-norm least-squares solve in the caller's coordinates.
    ///
    /// `A+ = diag(post)^-1 * V * diag(1/w) * U^T * diag(pre)^-1`.
    pub fn back_sub(&self, b: &DynVector<T>) -> DynVector<T> {
        let x = self.svd.back_sub(&div_elements(b, &self.pre));
        div_elements(&x, &self.post)
    }

    /// Damped least-squares solve in the caller's coordinates.
    pub fn damped_back_sub(&self, b: &DynVector<T>, lambda: T) -> DynVector<T> {
        let x = self.svd.damped_back_sub(&div_elements(b, &self.pre), lambda);
        div_elements(&x, &self.post)
    }

    /// Truncated pseudo-inverse (n x m) in the caller's coordinates.
    pub fn pseudo_inverse(&self) -> DynMatrix<T> {
        self.unscale_inverse(self.svd.pseudo_inverse())
    }

    /// Damped pseudo-inverse (n x m) in the caller's coordinates.
    pub fn damped_pseudo_inverse(&self, lambda: T) -> DynMatrix<T> {
        self.unscale_inverse(self.svd.damped_pseudo_inverse(lambda))
    }

    fn unscale_inverse(&self, mut ainv: DynMatrix<T>) -> DynMatrix<T> {
        for j in 0..ainv.ncols() {
            for i in 0..ainv.nrows() {
                ainv[(i, j)] = ainv[(i, j)] / self.pre[j] / self.post[i];
            }
        }
        ainv
    }

    /// Project `x` onto the nullspace of A, in the caller's coordinates.
    pub fn nullspace_component(&self, x: &DynVector<T>) -> DynVector<T> {
        let scaled = mul_elements(x, &self.post);
        let xnull = self.svd.nullspace_component(&scaled);
        div_elements(&xnull, &self.post)
    }

    /// Basis for the nullspace of A (n x nullity), in the caller's
    /// coordinates.
    pub fn nullspace(&self) -> DynMatrix<T> {
        let mut basis = self.svd.nullspace();
        for j in 0..basis.ncols() {
            for i in 0..basis.nrows() {
                basis[(i, j)] = basis[(i, j)] / self.post[i];
            }
        }
        basis
    }
}

impl<T: Real> Default for RobustSvd<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn div_elements<T: Real>(v: &DynVector<T>, scales: &DynVector<T>) -> DynVector<T> {
    assert_eq!(v.len(), scales.len(), "vector length mismatch");
    let mut out = DynVector::zeros(v.len());
    for i in 0..v.len() {
        out[i] = v[i] / scales[i];
    }
    out
}

fn mul_elements<T: Real>(v: &DynVector<T>, scales: &DynVector<T>) -> DynVector<T> {
    assert_eq!(v.len(), scales.len(), "vector length mismatch");
    let mut out = DynVector::zeros(v.len());
    for i in 0..v.len() {
        out[i] = v[i] * scales[i];
    }
    out
}
