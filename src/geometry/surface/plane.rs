use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Sense, Surface};

/// An infinite plane in 3D space.
///
/// Stored as a unit normal `n` and a distance `d` so that the plane is
/// `n · x = d`. The positive half-space is `n · x > d`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    normal: Vector3,
    distance: f64,
}

impl Plane {
    /// Creates a plane through `origin` with the given normal.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal vector is zero-length.
    pub fn from_normal(origin: Point3, normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / len;
        Ok(Self {
            normal,
            distance: normal.dot(&origin.coords),
        })
    }

    /// Returns the unit normal.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Returns the signed distance of the plane from the origin along its normal.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Position of the plane along `axis` (a unit vector parallel to the normal).
    #[must_use]
    pub fn position_along(&self, axis: &Vector3) -> f64 {
        self.distance * self.normal.dot(axis)
    }
}

impl Surface for Plane {
    fn side_value(&self, point: &Point3) -> f64 {
        self.normal.dot(&point.coords) - self.distance
    }

    fn matches(&self, other: &Self, tol: f64) -> Option<Sense> {
        if (self.normal - other.normal).norm() < tol && (self.distance - other.distance).abs() < tol
        {
            Some(Sense::Same)
        } else if (self.normal + other.normal).norm() < tol
            && (self.distance + other.distance).abs() < tol
        {
            Some(Sense::Reversed)
        } else {
            None
        }
    }
}
