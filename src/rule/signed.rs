use std::fmt;
use std::ops::Neg;

/// A signed surface number denoting one half-space of a registered surface.
///
/// The magnitude is the surface id, the sign selects the side: `+n` is the
/// outer (positive) side of surface `n`, `-n` the inner side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignedSurface(i32);

impl SignedSurface {
    /// Creates a signed surface, or `None` for zero and for `i32::MIN`,
    /// which has no negation.
    #[must_use]
    pub fn new(value: i32) -> Option<Self> {
        (value != 0 && value != i32::MIN).then_some(Self(value))
    }

    /// Surface id (always positive).
    #[must_use]
    pub fn id(self) -> i32 {
        self.0.abs()
    }

    /// Raw signed value.
    #[must_use]
    pub fn value(self) -> i32 {
        self.0
    }

    /// Whether this denotes the positive side.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Applies the sign of `other` on top of this one.
    #[must_use]
    pub fn signed_by(self, other: Self) -> Self {
        if other.is_positive() {
            self
        } else {
            -self
        }
    }
}

impl Neg for SignedSurface {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Display for SignedSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(SignedSurface::new(0).is_none());
    }

    #[test]
    fn unnegatable_value_is_rejected() {
        assert!(SignedSurface::new(i32::MIN).is_none());
        let s = SignedSurface::new(-i32::MAX).unwrap();
        assert_eq!((-s).value(), i32::MAX);
        assert_eq!(s.id(), i32::MAX);
    }

    #[test]
    fn negation_flips_side_only() {
        let s = SignedSurface::new(12).unwrap();
        assert_eq!((-s).id(), 12);
        assert!(!(-s).is_positive());
        assert_eq!(-(-s), s);
    }

    #[test]
    fn signed_by_combines_signs() {
        let a = SignedSurface::new(-4).unwrap();
        let neg = SignedSurface::new(-1).unwrap();
        assert_eq!(a.signed_by(neg).value(), 4);
        assert_eq!(a.signed_by(-neg).value(), -4);
    }
}
