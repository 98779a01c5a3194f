use core::fmt::Debug;
use num_traits::{Float, Num, One, Zero};

/// Trait for types that can be used as matrix elements.
///
/// Blanket-implemented for all types satisfying the bounds.
pub trait Scalar: Copy + PartialEq + Debug + Zero + One + Num {}

impl<T: Copy + PartialEq + Debug + Zero + One + Num> Scalar for T {}

/// Trait for real floating-point matrix elements.
///
/// Required by the decompositions (`sqrt`, `abs`, NaN/Inf detection) and by
/// the robust wrapper's precision bridge: every `Real` names a `Wide`
/// companion type at which conditioning and iteration are actually carried
/// out. For `f64` the wide type is `f64` itself, so the wide path is the one
/// and only implementation; for `f32` it is `f64`, and results are narrowed
/// on the way back out. The `Wide: Real<Wide = Self::Wide>` bound makes
/// widening a fixed point rather than a recursion.
pub trait Real: Scalar + Float {
    /// Full-precision type used internally by [`crate::RobustSvd`].
    type Wide: Real<Wide = Self::Wide>;

    /// Promote to the full-precision computation type.
    fn widen(self) -> Self::Wide;

    /// Demote a full-precision value back to `Self`.
    fn narrow(wide: Self::Wide) -> Self;

    /// Default rank cutoff for singular values.
    ///
    /// A rank tolerance, not an ulp bound: singular values at or below this
    /// are treated as exactly zero by the truncated solves.
    fn default_epsilon() -> Self;
}

impl Real for f64 {
    type Wide = f64;

    #[inline]
    fn widen(self) -> f64 {
        self
    }

    #[inline]
    fn narrow(wide: f64) -> f64 {
        wide
    }

    #[inline]
    fn default_epsilon() -> f64 {
        1e-8
    }
}

impl Real for f32 {
    type Wide = f64;

    #[inline]
    fn widen(self) -> f64 {
        self as f64
    }

    #[inline]
    fn narrow(wide: f64) -> f32 {
        wide as f32
    }

    #[inline]
    fn default_epsilon() -> f32 {
        1e-5
    }
}
