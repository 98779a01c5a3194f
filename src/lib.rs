//! # svdsolve
//!
//! Robust singular value decomposition for dense rectangular matrices, with
//! the derived operations needed to solve ill-conditioned linear systems:
//! truncated and damped pseudo-inverse solves, rank and nullspace
//! extraction. Built for callers like differential-kinematics and control
//! code that invert Jacobians which are frequently near-singular.
//!
//! ## Quick start
//!
//! ```
//! use svdsolve::{DynMatrix, DynVector, SvdDecomposition};
//!
//! let a = DynMatrix::from_rows(2, 2, &[3.0_f64, 0.0, 0.0, 2.0]);
//! let mut svd = SvdDecomposition::new();
//! svd.set(&a).unwrap();
//!
//! assert_eq!(svd.rank(), 2);
//! let x = svd.back_sub(&DynVector::from_slice(&[3.0, 4.0]));
//! assert!((x[0] - 1.0).abs() < 1e-12);
//! assert!((x[1] - 2.0).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - [`matrix`] — Heap-allocated `DynMatrix<T>` / `DynVector<T>` with
//!   runtime dimensions; column-major `Vec<T>` storage. The container the
//!   decompositions consume: element access, resize, transpose, products.
//!
//! - [`linalg`] — The decompositions. [`SvdDecomposition`] is the direct
//!   engine (Householder bidiagonalization plus implicit-shift QR
//!   diagonalization) and serves the solve/rank/nullspace queries.
//!   [`RobustSvd`] wraps it with diagonal row/column conditioning, a QR
//!   fallback retry ([`QrDecomposition`]), and full-precision computation
//!   for reduced-precision callers. Failures are [`SvdError`] values, never
//!   panics; diagnostics go through the `log` facade.
//!
//! - [`traits`] — Element traits: [`Scalar`] for anything matrix-shaped,
//!   [`Real`] for the floating types the decompositions accept (`f32`,
//!   `f64`), including the widening bridge `RobustSvd` uses to run `f32`
//!   inputs at `f64` precision.
//!
//! ## Concurrency
//!
//! Everything is single-threaded and synchronous; a decomposition instance
//! mutates only its own buffers. One instance must not be shared across
//! threads mid-`set`; callers wanting parallelism use one instance per
//! matrix.

pub mod linalg;
pub mod matrix;
pub mod traits;

pub use linalg::{QrDecomposition, RobustSvd, SvdDecomposition, SvdError};
pub use matrix::{DynMatrix, DynVector};
pub use traits::{Real, Scalar};
