use crate::context::Geometry;
use crate::error::Result;
use crate::link::{LinkPoint, LinkSet, NamedCells, NamedSurfaces, BACK, FRONT};
use crate::math::{Point3, Vector3};
use crate::vars::VariableStore;

use super::{Component, FixedComp, HasNamedCells};

/// A cell-less origin: a single plane through a point, exposing it as the
/// `back` link so a beamline can start from it.
#[derive(Debug, Clone)]
pub struct Marker {
    fixed: FixedComp,
    origin: Point3,
    axis: Vector3,
}

impl Marker {
    #[must_use]
    pub fn new(key: impl Into<String>, origin: Point3, axis: Vector3) -> Self {
        Self {
            fixed: FixedComp::new(key),
            origin,
            axis,
        }
    }
}

impl HasNamedCells for Marker {
    fn named_cells(&self) -> &NamedCells {
        self.fixed.cells()
    }
}

impl Component for Marker {
    fn name(&self) -> &str {
        self.fixed.key()
    }

    fn populate(&mut self, vars: &VariableStore) -> Result<()> {
        self.fixed.populate_offset(vars)
    }

    fn create_unit_vector(&mut self, anchor: Option<&LinkPoint>) {
        self.fixed.create_unit_vector(anchor, self.origin, self.axis);
    }

    fn create_surfaces(&mut self, geometry: &mut Geometry) -> Result<()> {
        let (origin, y) = (self.fixed.origin(), self.fixed.y());
        let plane = self.fixed.add_plane(&mut geometry.surfaces, 1, origin, y)?;
        self.fixed.surfaces_mut().add("plane", plane)
    }

    fn create_objects(&mut self, _geometry: &mut Geometry) -> Result<()> {
        Ok(())
    }

    fn create_links(&mut self, geometry: &Geometry) -> Result<()> {
        let base = self.fixed.base().unwrap_or_default();
        let ahead = geometry.surfaces.rule(base, "1")?;
        let (origin, y) = (self.fixed.origin(), self.fixed.y());
        let front = LinkPoint::new(FRONT, origin, -y, ahead.complement())?;
        let back = LinkPoint::new(BACK, origin, y, ahead)?;
        self.fixed.links_mut().add(front)?;
        self.fixed.links_mut().add(back)?;
        Ok(())
    }

    fn links(&self) -> &LinkSet {
        self.fixed.links()
    }

    fn named_surfaces(&self) -> &NamedSurfaces {
        self.fixed.surfaces()
    }

    fn nominal_length(&self) -> Option<f64> {
        Some(0.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn back_link_points_down_beam() {
        let mut geometry = Geometry::default();
        let mut marker = Marker::new("origin", Point3::origin(), Vector3::y());
        marker
            .create_all(&VariableStore::new(), &mut geometry, None)
            .unwrap();
        let back = marker.links().point(BACK).unwrap();
        assert!(back
            .rule
            .is_valid(&Point3::new(0.0, 1.0, 0.0), &geometry.surfaces)
            .unwrap());
        assert!(geometry.cells.is_empty());
        assert_eq!(marker.links().point(FRONT).unwrap().rule, back.rule.complement());
    }
}
