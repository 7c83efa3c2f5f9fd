use tracing::debug;

use crate::context::Geometry;
use crate::error::{ComponentError, Result};
use crate::link::{ExternalCut, LinkPoint, LinkSet, NamedCells, NamedSurfaces, BACK, FRONT};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::registry::{CellId, MaterialId, VOID};
use crate::rule::HeadRule;
use crate::vars::VariableStore;

use super::{Component, Contained, FixedComp, HasFrontBack, HasNamedCells};

/// A straight beam pipe: a void bore inside an optional wall, bounded by a
/// front and a back plane.
///
/// Variables read (prefixed by the component key): `Length`, `Radius`,
/// optional `WallThick`, `VoidMat`, `WallMat` and `WallDensity`.
#[derive(Debug, Clone)]
pub struct Pipe {
    fixed: FixedComp,
    cut: ExternalCut,
    contained: Contained,
    length: f64,
    radius: f64,
    wall: f64,
    void_mat: MaterialId,
    wall_mat: MaterialId,
    wall_density: f64,
    front_rule: HeadRule,
    back_rule: HeadRule,
}

impl Pipe {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            contained: Contained::single(key.clone()),
            fixed: FixedComp::new(key),
            cut: ExternalCut::new(),
            length: 0.0,
            radius: 0.0,
            wall: 0.0,
            void_mat: VOID,
            wall_mat: VOID,
            wall_density: 0.0,
            front_rule: HeadRule::universe(),
            back_rule: HeadRule::universe(),
        }
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Radius of the outermost surface: the wall if present, else the bore.
    #[must_use]
    pub fn outer_radius(&self) -> f64 {
        self.radius + self.wall
    }

    #[must_use]
    pub fn has_wall(&self) -> bool {
        self.wall > TOLERANCE
    }

    /// The wall cell, once built.
    #[must_use]
    pub fn wall_cell(&self) -> Option<CellId> {
        self.fixed.cells().first("Wall").ok()
    }

    /// Region between the front and back faces.
    #[must_use]
    pub fn ends(&self) -> HeadRule {
        self.front_rule.intersect(&self.back_rule)
    }

    #[must_use]
    pub fn fixed(&self) -> &FixedComp {
        &self.fixed
    }

    pub fn fixed_mut(&mut self) -> &mut FixedComp {
        &mut self.fixed
    }

    pub(crate) fn contained_ref(&self) -> &Contained {
        &self.contained
    }

    pub(crate) fn contained_ref_mut(&mut self) -> &mut Contained {
        &mut self.contained
    }

    fn invalid(&self, reason: &str) -> crate::error::BeamcsgError {
        ComponentError::InvalidInput {
            component: self.fixed.key().to_owned(),
            reason: reason.to_owned(),
        }
        .into()
    }
}

impl HasNamedCells for Pipe {
    fn named_cells(&self) -> &NamedCells {
        self.fixed.cells()
    }
}

impl HasFrontBack for Pipe {
    fn external_cut(&self) -> &ExternalCut {
        &self.cut
    }

    fn external_cut_mut(&mut self) -> &mut ExternalCut {
        &mut self.cut
    }
}

impl Component for Pipe {
    fn name(&self) -> &str {
        self.fixed.key()
    }

    fn populate(&mut self, vars: &VariableStore) -> Result<()> {
        let key = self.fixed.key().to_owned();
        self.fixed.populate_offset(vars)?;
        self.length = vars.eval_var(&format!("{key}Length"))?;
        self.radius = vars.eval_var(&format!("{key}Radius"))?;
        self.wall = vars.eval_def_var(&format!("{key}WallThick"), 0.0)?;
        self.void_mat = vars.eval_def_var(&format!("{key}VoidMat"), VOID)?;
        self.wall_mat = vars.eval_def_var(&format!("{key}WallMat"), 1)?;
        self.wall_density = vars.eval_def_var(&format!("{key}WallDensity"), 1.0)?;

        if self.length < 0.0 {
            return Err(self.invalid("negative length"));
        }
        if self.radius <= TOLERANCE {
            return Err(self.invalid("radius must be positive"));
        }
        if self.wall < 0.0 {
            return Err(self.invalid("negative wall thickness"));
        }
        Ok(())
    }

    fn create_unit_vector(&mut self, anchor: Option<&LinkPoint>) {
        self.fixed
            .create_unit_vector(anchor, Point3::origin(), Vector3::y());
    }

    fn create_surfaces(&mut self, geometry: &mut Geometry) -> Result<()> {
        let reg = &mut geometry.surfaces;
        let (origin, y) = (self.fixed.origin(), self.fixed.y());

        self.front_rule = match self.cut.front() {
            Some(rule) => rule.clone(),
            None => {
                self.fixed.add_plane(reg, 1, origin, y)?;
                self.fixed.rule(reg, "1")?
            }
        };
        self.back_rule = match self.cut.back() {
            Some(rule) => rule.clone(),
            None => {
                self.fixed.add_plane(reg, 2, origin + y * self.length, y)?;
                self.fixed.rule(reg, "-2")?
            }
        };

        let inner = self.fixed.add_cylinder(reg, 7, origin, y, self.radius)?;
        self.fixed.surfaces_mut().add("innerPipe", inner)?;
        let outer = if self.has_wall() {
            self.fixed
                .add_cylinder(reg, 17, origin, y, self.outer_radius())?
        } else {
            inner
        };
        self.fixed.surfaces_mut().add("outerPipe", outer)
    }

    fn create_objects(&mut self, geometry: &mut Geometry) -> Result<()> {
        let key = self.fixed.key().to_owned();
        if self.length < TOLERANCE {
            debug!(component = %key, "zero-length pipe; no cells built");
            self.contained.set_outer(HeadRule::null());
            return Ok(());
        }
        let ends = self.ends();
        let reg = &mut geometry.surfaces;

        let void = self.fixed.rule(reg, "-7")?.intersect(&ends);
        let id = geometry
            .cells
            .make_cell(format!("{key}Void"), self.void_mat, 0.0, void);
        self.fixed.cells_mut().add("Void", id);

        let outer = if self.has_wall() {
            let wall = self.fixed.rule(reg, "7 -17")?.intersect(&ends);
            let id = geometry.cells.make_cell(
                format!("{key}Wall"),
                self.wall_mat,
                self.wall_density,
                wall,
            );
            self.fixed.cells_mut().add("Wall", id);
            self.fixed.rule(reg, "-17")?
        } else {
            self.fixed.rule(reg, "-7")?
        };
        self.contained.set_outer(outer.intersect(&ends));
        Ok(())
    }

    fn create_links(&mut self, _geometry: &Geometry) -> Result<()> {
        let (origin, y) = (self.fixed.origin(), self.fixed.y());
        let front = LinkPoint::new(FRONT, origin, -y, self.front_rule.complement())?;
        let back = LinkPoint::new(
            BACK,
            origin + y * self.length,
            y,
            self.back_rule.complement(),
        )?;
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
        Some(self.length)
    }

    fn contained(&self) -> Option<&Contained> {
        Some(&self.contained)
    }

    fn contained_mut(&mut self) -> Option<&mut Contained> {
        Some(&mut self.contained)
    }

    fn as_front_back(&self) -> Option<&dyn HasFrontBack> {
        Some(self)
    }

    fn as_front_back_mut(&mut self) -> Option<&mut dyn HasFrontBack> {
        Some(self)
    }
}
