use crate::error::{ComponentError, GeometryError, Result};
use crate::math::{unit, Point3, Vector3};
use crate::rule::HeadRule;

/// A tagged anchor exposed by a component for chaining.
///
/// `rule` is the half-space on the far side of the face: the region the next
/// component along `axis` occupies. The owning component lies in its
/// complement.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPoint {
    pub name: String,
    pub origin: Point3,
    pub axis: Vector3,
    pub rule: HeadRule,
}

impl LinkPoint {
    /// Creates a link point; the axis is normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if the axis is zero-length.
    pub fn new(
        name: impl Into<String>,
        origin: Point3,
        axis: Vector3,
        rule: HeadRule,
    ) -> Result<Self> {
        let axis = unit(&axis).ok_or(GeometryError::ZeroVector)?;
        Ok(Self {
            name: name.into(),
            origin,
            axis,
            rule,
        })
    }

    /// The same face seen from the other side.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            name: format!("#{}", self.name),
            origin: self.origin,
            axis: -self.axis,
            rule: self.rule.complement(),
        }
    }

    /// Signed distance of `other`'s origin ahead of this point along the axis.
    #[must_use]
    pub fn separation(&self, other: &LinkPoint) -> f64 {
        (other.origin - self.origin).dot(&self.axis)
    }
}

/// The ordered link points of one component.
///
/// Index 0 is conventionally `front`, index 1 `back`. A name prefixed with
/// `#` resolves to the reversed link.
#[derive(Debug, Clone, Default)]
pub struct LinkSet {
    owner: String,
    points: Vec<LinkPoint>,
}

impl LinkSet {
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            points: Vec::new(),
        }
    }

    /// Adds a link point.
    ///
    /// # Errors
    ///
    /// Returns an error if a link point with the same name exists.
    pub fn add(&mut self, point: LinkPoint) -> Result<usize> {
        if self.points.iter().any(|p| p.name == point.name) {
            return Err(ComponentError::DuplicateTag {
                component: self.owner.clone(),
                kind: "link point",
                tag: point.name,
            }
            .into());
        }
        self.points.push(point);
        Ok(self.points.len() - 1)
    }

    /// Looks up a link point by name.
    ///
    /// # Errors
    ///
    /// Returns an error if no link point has that name.
    pub fn point(&self, name: &str) -> Result<&LinkPoint> {
        self.points.iter().find(|p| p.name == name).ok_or_else(|| {
            ComponentError::LinkNotFound {
                component: self.owner.clone(),
                link: name.to_owned(),
            }
            .into()
        })
    }

    /// Looks up a link point by index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range.
    pub fn point_at(&self, index: usize) -> Result<&LinkPoint> {
        self.points.get(index).ok_or_else(|| {
            ComponentError::IndexOutOfRange {
                component: self.owner.clone(),
                kind: "link point",
                index,
                len: self.points.len(),
            }
            .into()
        })
    }

    /// Resolves a name, honouring the `#` prefix for the reversed face.
    ///
    /// # Errors
    ///
    /// Returns an error if no link point has that name.
    pub fn resolve(&self, name: &str) -> Result<LinkPoint> {
        match name.strip_prefix('#') {
            Some(base) => Ok(self.point(base)?.reversed()),
            None => Ok(self.point(name)?.clone()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkPoint> {
        self.points.iter()
    }
}
