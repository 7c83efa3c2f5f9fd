use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Sense, Surface};

/// An infinite circular cylinder in 3D space.
///
/// Defined by a point on the axis, a unit axis direction and a radius.
/// The positive half-space is the outside of the cylinder.
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    centre: Point3,
    axis: Vector3,
    radius: f64,
}

impl Cylinder {
    /// Creates a new cylinder.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive or the axis is zero-length.
    pub fn new(centre: Point3, axis: Vector3, radius: f64) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("cylinder radius must be positive".into()).into(),
            );
        }
        let axis_len = axis.norm();
        if axis_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            centre,
            axis: axis / axis_len,
            radius,
        })
    }

    /// Returns the point on the axis.
    #[must_use]
    pub fn centre(&self) -> &Point3 {
        &self.centre
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Distance of `point` from the cylinder axis.
    #[must_use]
    pub fn axial_distance(&self, point: &Point3) -> f64 {
        let dp = point - self.centre;
        (dp - self.axis * dp.dot(&self.axis)).norm()
    }
}

impl Surface for Cylinder {
    fn side_value(&self, point: &Point3) -> f64 {
        self.axial_distance(point) - self.radius
    }

    fn matches(&self, other: &Self, tol: f64) -> Option<Sense> {
        let parallel = self.axis.cross(&other.axis).norm() < tol;
        if parallel
            && (self.radius - other.radius).abs() < tol
            && self.axial_distance(&other.centre) < tol
        {
            Some(Sense::Same)
        } else {
            None
        }
    }
}
