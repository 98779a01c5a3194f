pub(crate) mod qr;
pub(crate) mod robust;
pub(crate) mod svd;
pub(crate) mod util;

pub use qr::QrDecomposition;
pub use robust::RobustSvd;
pub use svd::SvdDecomposition;

use thiserror::Error;

/// Errors from the decomposition routines.
///
/// Under-determined inputs are deliberately not an error: near-zero singular
/// values are kept in the factorization and truncated by the solves.
/// Dimension mismatches between arguments are precondition violations and
/// panic instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SvdError {
    /// The iteration budget was exhausted before a singular value converged.
    #[error("iteration budget exhausted before a singular value converged")]
    ConvergenceFailure,
    /// A NaN or infinity was produced mid-computation.
    #[error("NaN or infinity produced during decomposition")]
    NumericalInvalid,
}
