use log::error;

use super::SvdError;
use crate::traits::Real;

/// `|x| <= eps`, the tolerance comparison used before unguarded divisions.
#[inline]
pub(crate) fn fuzzy_zero<T: Real>(x: T, eps: T) -> bool {
    x.abs() <= eps
}

/// `|a|` carrying the sign of `b`, with `b >= 0` counting as positive.
///
/// Not `copysign`: a negative-zero `b` transfers a positive sign here.
#[inline]
pub(crate) fn sign_transfer<T: Real>(a: T, b: T) -> T {
    if b >= T::zero() {
        a.abs()
    } else {
        -a.abs()
    }
}

/// Overflow-safe `sqrt(a^2 + b^2)`.
///
/// Factors out the larger magnitude so intermediate squares stay in range.
pub(crate) fn pythag<T: Real>(a: T, b: T) -> T {
    let absa = a.abs();
    let absb = b.abs();
    if absa > absb {
        let r = absb / absa;
        absa * (T::one() + r * r).sqrt()
    } else if absb == T::zero() {
        T::zero()
    } else {
        let r = absa / absb;
        absb * (T::one() + r * r).sqrt()
    }
}

/// Fail-fast guard on a freshly computed scalar.
///
/// A NaN or infinity anywhere aborts the decomposition immediately rather
/// than propagating corrupted values through the factors.
#[inline]
pub(crate) fn finite<T: Real>(x: T) -> Result<T, SvdError> {
    if x.is_nan() {
        error!("SVD: NaN encountered");
        return Err(SvdError::NumericalInvalid);
    }
    if x.is_infinite() {
        error!("SVD: infinity encountered");
        return Err(SvdError::NumericalInvalid);
    }
    Ok(x)
}
