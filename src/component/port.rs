use std::collections::BTreeSet;

use tracing::debug;

use crate::context::Geometry;
use crate::error::{ComponentError, GeometryError, Result};
use crate::math::segment_3d::segment_segment_distance;
use crate::math::{unit, Point3, Vector3, TOLERANCE};
use crate::registry::{CellId, CellStore, MaterialId, VOID};
use crate::rule::{HeadRule, SignedSurface};

use super::FixedComp;

/// Surface offsets of port `i` start at `PORT_OFFSET + PORT_STRIDE * i`.
const PORT_OFFSET: i32 = 1000;
const PORT_STRIDE: i32 = 10;

/// A cylindrical side port leaving a tube.
///
/// The port starts on the tube axis at `centre`, runs along `axis` and ends at
/// a flat cap `length` away. Its bore has radius `radius`; an optional wall of
/// thickness `wall` surrounds it.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    centre: Point3,
    axis: Vector3,
    radius: f64,
    wall: f64,
    length: f64,
    wall_mat: MaterialId,
    wall_density: f64,
}

impl Port {
    /// Creates a port.
    ///
    /// # Errors
    ///
    /// Returns an error if the axis is zero, the radius or length is not
    /// positive, or the wall is negative.
    pub fn new(centre: Point3, axis: Vector3, radius: f64, wall: f64, length: f64) -> Result<Self> {
        let axis = unit(&axis).ok_or(GeometryError::ZeroVector)?;
        if radius <= TOLERANCE || length <= TOLERANCE {
            return Err(GeometryError::Degenerate(
                "port radius and length must be positive".into(),
            )
            .into());
        }
        if wall < 0.0 {
            return Err(GeometryError::Degenerate("negative port wall".into()).into());
        }
        Ok(Self {
            centre,
            axis,
            radius,
            wall,
            length,
            wall_mat: 1,
            wall_density: 1.0,
        })
    }

    /// Sets the wall material.
    #[must_use]
    pub fn with_wall_material(mut self, material: MaterialId, density: f64) -> Self {
        self.wall_mat = material;
        self.wall_density = density;
        self
    }

    #[must_use]
    pub fn centre(&self) -> Point3 {
        self.centre
    }

    #[must_use]
    pub fn axis(&self) -> Vector3 {
        self.axis
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[must_use]
    pub fn outer_radius(&self) -> f64 {
        self.radius + self.wall
    }

    #[must_use]
    pub fn has_wall(&self) -> bool {
        self.wall > TOLERANCE
    }

    /// Centre of the cap.
    #[must_use]
    pub fn tip(&self) -> Point3 {
        self.centre + self.axis * self.length
    }

    /// Whether the outer cylinders of the two ports can share volume.
    #[must_use]
    pub fn overlaps(&self, other: &Port) -> bool {
        let gap = segment_segment_distance(&self.centre, &self.tip(), &other.centre, &other.tip());
        gap < self.outer_radius() + other.outer_radius()
    }
}

/// Cells and regions of one built port.
///
/// `void_rule` and `outer_rule` are the regions as first built and are not
/// changed by intersection corrections.
#[derive(Debug, Clone)]
pub struct PortCells {
    pub void_cell: CellId,
    pub wall_cell: Option<CellId>,
    pub void_rule: HeadRule,
    pub outer_rule: HeadRule,
}

/// The ordered ports of one tube and the corrections applied between them.
#[derive(Debug, Clone, Default)]
pub struct PortSet {
    owner: String,
    ports: Vec<Port>,
    port_cells: Vec<PortCells>,
    built: bool,
    resolved: BTreeSet<(usize, usize)>,
    void_resolved: BTreeSet<(usize, usize)>,
}

impl PortSet {
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..Self::default()
        }
    }

    /// Appends a port and returns its index.
    ///
    /// # Errors
    ///
    /// Returns an error once the ports have been built.
    pub fn add_port(&mut self, port: Port) -> Result<usize> {
        if self.is_built() {
            return Err(self.invalid("ports already built"));
        }
        self.ports.push(port);
        Ok(self.ports.len() - 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn port(&self, index: usize) -> Result<&Port> {
        self.ports
            .get(index)
            .ok_or_else(|| self.out_of_range(index, self.ports.len()))
    }

    /// # Errors
    ///
    /// Returns an error if `index` is out of range or the ports are not built.
    pub fn cells(&self, index: usize) -> Result<&PortCells> {
        self.port_cells
            .get(index)
            .ok_or_else(|| self.out_of_range(index, self.port_cells.len()))
    }

    /// Registers the port surfaces and cells.
    ///
    /// Each void is bounded by its bore cylinder, its cap, the half-space on
    /// the port side of the tube axis and `outside_bore`, so it never reaches
    /// into the tube's own void. Returns the union of the port outer regions.
    ///
    /// # Errors
    ///
    /// Returns an error if the ports were built before or a surface is
    /// degenerate.
    pub fn build(
        &mut self,
        fixed: &mut FixedComp,
        geometry: &mut Geometry,
        outside_bore: SignedSurface,
    ) -> Result<HeadRule> {
        if self.is_built() {
            return Err(self.invalid("ports already built"));
        }
        let reg = &mut geometry.surfaces;
        let outside_bore = HeadRule::surface(outside_bore);
        let mut built = Vec::with_capacity(self.ports.len());

        for (i, port) in self.ports.iter().enumerate() {
            let o = PORT_OFFSET + PORT_STRIDE * i32::try_from(i).unwrap_or(i32::MAX / PORT_STRIDE);
            fixed.add_cylinder(reg, o + 1, port.centre, port.axis, port.radius)?;
            fixed.add_plane(reg, o + 3, port.tip(), port.axis)?;
            fixed.add_plane(reg, o + 4, port.centre, port.axis)?;

            let bound = fixed.rule(reg, &format!("-{} {}", o + 3, o + 4))?;
            let bound = bound.intersect(&outside_bore);
            let void_rule = fixed.rule(reg, &format!("-{}", o + 1))?.intersect(&bound);
            let void_cell = geometry.cells.make_cell(
                format!("{}Port{i}Void", self.owner),
                VOID,
                0.0,
                void_rule.clone(),
            );
            fixed.cells_mut().add(format!("Port{i}Void"), void_cell);

            let (wall_cell, outer_rule) = if port.has_wall() {
                fixed.add_cylinder(reg, o + 2, port.centre, port.axis, port.outer_radius())?;
                let wall = fixed
                    .rule(reg, &format!("{} -{}", o + 1, o + 2))?
                    .intersect(&bound);
                let id = geometry.cells.make_cell(
                    format!("{}Port{i}Wall", self.owner),
                    port.wall_mat,
                    port.wall_density,
                    wall.clone(),
                );
                fixed.cells_mut().add(format!("Port{i}Wall"), id);
                (Some(id), void_rule.unite(&wall))
            } else {
                (None, void_rule.clone())
            };

            built.push(PortCells {
                void_cell,
                wall_cell,
                void_rule,
                outer_rule,
            });
        }

        let outer = HeadRule::unite_all(built.iter().map(|b| &b.outer_rule));
        debug!(component = %self.owner, ports = built.len(), "ports built");
        self.port_cells = built;
        self.built = true;
        Ok(outer)
    }

    /// Resolves the shared volume of two overlapping ports.
    ///
    /// With `l` the lower and `h` the higher index: the void of `h` gives up
    /// the void of `l`, the wall of `h` gives up everything of `l`, and the
    /// wall of `l` gives up the original void of `h`. The result does not
    /// depend on argument order, and a pair is corrected at most once.
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range or repeated index, unbuilt ports,
    /// or a port cell that can no longer be retrofitted.
    pub fn intersect_ports(&mut self, cells: &mut CellStore, i: usize, j: usize) -> Result<()> {
        let (l, h) = self.ordered(i, j)?;
        if self.resolved.contains(&(l, h)) {
            debug!(component = %self.owner, l, h, "port pair already resolved");
            return Ok(());
        }
        if !self.ports[l].overlaps(&self.ports[h]) {
            debug!(component = %self.owner, l, h, "ports do not overlap");
            self.resolved.insert((l, h));
            return Ok(());
        }
        let low = self.port_cells[l].clone();
        let high = self.port_cells[h].clone();
        let void_pending = !self.void_resolved.contains(&(l, h));
        cells.check_retrofit_all(
            void_pending
                .then_some(high.void_cell)
                .into_iter()
                .chain(high.wall_cell)
                .chain(low.wall_cell),
        )?;

        if void_pending {
            cells.retrofit(high.void_cell, |r| r.exclude(&low.void_rule))?;
            self.void_resolved.insert((l, h));
        }
        if let Some(wall) = high.wall_cell {
            cells.retrofit(wall, |r| r.exclude(&low.outer_rule))?;
        }
        if let Some(wall) = low.wall_cell {
            cells.retrofit(wall, |r| r.exclude(&high.void_rule))?;
        }
        self.resolved.insert((l, h));
        debug!(component = %self.owner, l, h, "port intersection resolved");
        Ok(())
    }

    /// Like [`intersect_ports`](Self::intersect_ports) but only separates the
    /// two voids; walls are left alone.
    ///
    /// # Errors
    ///
    /// Same as [`intersect_ports`](Self::intersect_ports).
    pub fn intersect_void_ports(&mut self, cells: &mut CellStore, i: usize, j: usize) -> Result<()> {
        let (l, h) = self.ordered(i, j)?;
        if self.void_resolved.contains(&(l, h)) || self.resolved.contains(&(l, h)) {
            return Ok(());
        }
        if self.ports[l].overlaps(&self.ports[h]) {
            let low_void = self.port_cells[l].void_rule.clone();
            cells.retrofit(self.port_cells[h].void_cell, |r| r.exclude(&low_void))?;
        }
        self.void_resolved.insert((l, h));
        Ok(())
    }

    fn ordered(&self, i: usize, j: usize) -> Result<(usize, usize)> {
        for index in [i, j] {
            if index >= self.ports.len() {
                return Err(self.out_of_range(index, self.ports.len()));
            }
        }
        if i == j {
            return Err(self.invalid("cannot intersect a port with itself"));
        }
        if !self.is_built() {
            return Err(self.invalid("ports not built"));
        }
        Ok((i.min(j), i.max(j)))
    }

    fn out_of_range(&self, index: usize, len: usize) -> crate::error::BeamcsgError {
        ComponentError::IndexOutOfRange {
            component: self.owner.clone(),
            kind: "port",
            index,
            len,
        }
        .into()
    }

    fn invalid(&self, reason: &str) -> crate::error::BeamcsgError {
        ComponentError::InvalidInput {
            component: self.owner.clone(),
            reason: reason.to_owned(),
        }
        .into()
    }
}
