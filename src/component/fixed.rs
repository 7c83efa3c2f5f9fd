use crate::error::{RegistryError, Result};
use crate::geometry::{Cylinder, Plane};
use crate::link::{LinkPoint, LinkSet, NamedCells, NamedSurfaces};
use crate::math::{perpendicular_dir, unit, Point3, Vector3};
use crate::registry::SurfaceRegistry;
use crate::rule::{HeadRule, SignedSurface};
use crate::vars::VariableStore;

/// Shared state of a placed component: its local frame, surface block, link
/// points and tagged cells and surfaces.
///
/// `y` is the beam direction. `x` and `z` complete a right-handed frame with
/// `z` as close to global up as the beam allows.
#[derive(Debug, Clone)]
pub struct FixedComp {
    key: String,
    base: Option<i32>,
    origin: Point3,
    x: Vector3,
    y: Vector3,
    z: Vector3,
    step: Vector3,
    links: LinkSet,
    cells: NamedCells,
    surfaces: NamedSurfaces,
}

impl FixedComp {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            base: None,
            origin: Point3::origin(),
            x: Vector3::x(),
            y: Vector3::y(),
            z: Vector3::z(),
            step: Vector3::zeros(),
            links: LinkSet::new(key.clone()),
            cells: NamedCells::new(key.clone()),
            surfaces: NamedSurfaces::new(key.clone()),
            key,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the optional `XStep`, `YStep` and `ZStep` offsets of the frame.
    ///
    /// # Errors
    ///
    /// Returns an error if an offset is present but not numeric.
    pub fn populate_offset(&mut self, vars: &VariableStore) -> Result<()> {
        self.step = Vector3::new(
            vars.eval_def_var(&format!("{}XStep", self.key), 0.0)?,
            vars.eval_def_var(&format!("{}YStep", self.key), 0.0)?,
            vars.eval_def_var(&format!("{}ZStep", self.key), 0.0)?,
        );
        Ok(())
    }

    /// Places the frame at `anchor`, falling back to the given defaults, then
    /// applies the populated offset in local coordinates.
    pub fn create_unit_vector(
        &mut self,
        anchor: Option<&LinkPoint>,
        default_origin: Point3,
        default_axis: Vector3,
    ) {
        let (origin, axis) = anchor.map_or((default_origin, default_axis), |a| (a.origin, a.axis));
        let y = unit(&axis).unwrap_or_else(Vector3::y);
        let up = if y.z.abs() < 0.9 {
            Vector3::z()
        } else {
            Vector3::x()
        };
        let z = unit(&(up - y * y.dot(&up))).unwrap_or_else(|| perpendicular_dir(&y));
        let x = y.cross(&z);
        self.origin = origin + x * self.step.x + y * self.step.y + z * self.step.z;
        self.x = x;
        self.y = y;
        self.z = z;
    }

    /// Base of this component's surface block, reserving it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if no block is left to reserve.
    pub fn block(&mut self, registry: &mut SurfaceRegistry) -> Result<i32> {
        if let Some(base) = self.base {
            return Ok(base);
        }
        let base = registry.reserve_block()?;
        self.base = Some(base);
        Ok(base)
    }

    fn number(&mut self, registry: &mut SurfaceRegistry, offset: i32) -> Result<i32> {
        let base = self.block(registry)?;
        base.checked_add(offset)
            .ok_or_else(|| RegistryError::SurfaceNotFound(base).into())
    }

    /// Base of the surface block, if one has been reserved.
    #[must_use]
    pub fn base(&self) -> Option<i32> {
        self.base
    }

    /// Registers a plane at `base + offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal is zero or the number is taken.
    pub fn add_plane(
        &mut self,
        registry: &mut SurfaceRegistry,
        offset: i32,
        origin: Point3,
        normal: Vector3,
    ) -> Result<SignedSurface> {
        let number = self.number(registry, offset)?;
        registry.add(number, Plane::from_normal(origin, normal)?)
    }

    /// Registers a cylinder at `base + offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cylinder is degenerate or the number is taken.
    pub fn add_cylinder(
        &mut self,
        registry: &mut SurfaceRegistry,
        offset: i32,
        centre: Point3,
        axis: Vector3,
        radius: f64,
    ) -> Result<SignedSurface> {
        let number = self.number(registry, offset)?;
        registry.add(number, Cylinder::new(centre, axis, radius)?)
    }

    /// Resolves an offset template against this component's block.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is malformed or refers to an
    /// unregistered offset.
    pub fn rule(&mut self, registry: &mut SurfaceRegistry, template: &str) -> Result<HeadRule> {
        let base = self.block(registry)?;
        registry.rule(base, template)
    }

    #[must_use]
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    #[must_use]
    pub fn x(&self) -> Vector3 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> Vector3 {
        self.y
    }

    #[must_use]
    pub fn z(&self) -> Vector3 {
        self.z
    }

    #[must_use]
    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut LinkSet {
        &mut self.links
    }

    #[must_use]
    pub fn cells(&self) -> &NamedCells {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut NamedCells {
        &mut self.cells
    }

    #[must_use]
    pub fn surfaces(&self) -> &NamedSurfaces {
        &self.surfaces
    }

    pub fn surfaces_mut(&mut self) -> &mut NamedSurfaces {
        &mut self.surfaces
    }
}
