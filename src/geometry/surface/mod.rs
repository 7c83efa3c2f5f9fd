mod cylinder;
mod plane;

pub use cylinder::Cylinder;
pub use plane::Plane;

use crate::math::{Point3, Vector3};

/// Relative orientation of two registered surfaces that describe the same locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// Same locus, same positive side.
    Same,
    /// Same locus, positive sides swapped.
    Reversed,
}

/// Trait for implicit surfaces that split space into two half-spaces.
pub trait Surface {
    /// Signed implicit value at `point`: positive on the outer (+) side,
    /// negative on the inner (-) side, zero on the surface.
    fn side_value(&self, point: &Point3) -> f64;

    /// Compares with another surface of the same kind within `tol`.
    fn matches(&self, other: &Self, tol: f64) -> Option<Sense>;
}

/// A surface as stored in the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceKind {
    Plane(Plane),
    Cylinder(Cylinder),
}

impl SurfaceKind {
    /// Signed implicit value at `point`.
    #[must_use]
    pub fn side_value(&self, point: &Point3) -> f64 {
        match self {
            Self::Plane(p) => p.side_value(point),
            Self::Cylinder(c) => c.side_value(point),
        }
    }

    /// Compares two registered surfaces; different kinds never match.
    #[must_use]
    pub fn matches(&self, other: &Self, tol: f64) -> Option<Sense> {
        match (self, other) {
            (Self::Plane(a), Self::Plane(b)) => a.matches(b, tol),
            (Self::Cylinder(a), Self::Cylinder(b)) => a.matches(b, tol),
            _ => None,
        }
    }

    /// Returns the plane normal if this is a plane.
    #[must_use]
    pub fn plane_normal(&self) -> Option<&Vector3> {
        match self {
            Self::Plane(p) => Some(p.normal()),
            Self::Cylinder(_) => None,
        }
    }

    /// Returns the plane if this is a plane.
    #[must_use]
    pub fn as_plane(&self) -> Option<&Plane> {
        match self {
            Self::Plane(p) => Some(p),
            Self::Cylinder(_) => None,
        }
    }
}

impl From<Plane> for SurfaceKind {
    fn from(p: Plane) -> Self {
        Self::Plane(p)
    }
}

impl From<Cylinder> for SurfaceKind {
    fn from(c: Cylinder) -> Self {
        Self::Cylinder(c)
    }
}
