use tracing::{debug, info};

use crate::context::Geometry;
use crate::error::{ComponentError, Result};
use crate::link::{LinkPoint, LinkSet, NamedCells, NamedSurfaces};
use crate::math::Vector3;
use crate::vars::VariableStore;

use super::{
    Component, Contained, HasFrontBack, HasNamedCells, HasNamedPorts, Pipe, Port, PortSet,
};

/// Where a port sits on the tube, in the tube's local frame.
#[derive(Debug, Clone, PartialEq)]
struct Placement {
    offset: f64,
    axis: Vector3,
    radius: f64,
    wall: f64,
    length: f64,
}

/// A pipe carrying radial side ports.
///
/// The body is built first. The ports are cut into the body's wall and into
/// every cell the tube was inserted into, either straight away or, for a
/// deferred tube, when [`HasNamedPorts::retrofit_ports`] is called later.
///
/// Variables read on top of the pipe's: `NPorts` and, per port `i`,
/// `Port{i}YStep`, `Port{i}Radius`, `Port{i}Length` and optional
/// `Port{i}Axis` (local, default `x`) and `Port{i}Wall`.
#[derive(Debug, Clone)]
pub struct PortTube {
    body: Pipe,
    ports: PortSet,
    placements: Vec<Placement>,
    deferred: bool,
}

impl PortTube {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            ports: PortSet::new(key.clone()),
            body: Pipe::new(key),
            placements: Vec::new(),
            deferred: false,
        }
    }

    /// Leaves the ports out of the first build pass.
    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    #[must_use]
    pub fn body(&self) -> &Pipe {
        &self.body
    }

    fn invalid(&self, reason: String) -> crate::error::BeamcsgError {
        ComponentError::InvalidInput {
            component: self.body.name().to_owned(),
            reason,
        }
        .into()
    }

    /// Turns the populated placements into ports in the global frame.
    fn place_ports(&mut self) -> Result<()> {
        let fixed = self.body.fixed();
        let (origin, x, y, z) = (fixed.origin(), fixed.x(), fixed.y(), fixed.z());
        let mut ports = Vec::with_capacity(self.placements.len());
        for (i, p) in self.placements.iter().enumerate() {
            let axis = x * p.axis.x + y * p.axis.y + z * p.axis.z;
            let port = Port::new(origin + y * p.offset, axis, p.radius, p.wall, p.length)?;
            if port.length() <= self.body.outer_radius() {
                return Err(self.invalid(format!("port {i} cap lies inside the tube")));
            }
            if p.offset - port.outer_radius() < 0.0
                || p.offset + port.outer_radius() > self.body.length()
            {
                return Err(self.invalid(format!("port {i} crosses a tube end")));
            }
            ports.push(port);
        }
        for port in ports {
            self.ports.add_port(port)?;
        }
        Ok(())
    }

    /// Fails before any change if a cell the retrofit must touch is frozen.
    fn check_retrofittable(&self, geometry: &Geometry) -> Result<()> {
        let targets = self
            .body
            .wall_cell()
            .into_iter()
            .chain(self.body.contained_ref().inserted().iter().copied());
        geometry.cells.check_retrofit_all(targets)
    }
}

impl HasNamedCells for PortTube {
    fn named_cells(&self) -> &NamedCells {
        self.body.named_cells()
    }
}

impl HasNamedPorts for PortTube {
    fn port_set(&self) -> &PortSet {
        &self.ports
    }

    fn port_set_mut(&mut self) -> &mut PortSet {
        &mut self.ports
    }

    fn retrofit_ports(&mut self, geometry: &mut Geometry) -> Result<()> {
        if self.ports.is_built() {
            return Err(self.invalid("ports already retrofitted".into()));
        }
        if self.placements.is_empty() {
            return Ok(());
        }
        self.check_retrofittable(geometry)?;
        self.place_ports()?;

        let bore = self.body.named_surfaces().get("innerPipe")?;
        let outer = self.ports.build(self.body.fixed_mut(), geometry, bore)?;
        if let Some(wall) = self.body.wall_cell() {
            geometry.cells.retrofit(wall, |r| r.exclude(&outer))?;
        }
        let hosts = self.body.contained_ref().inserted().len();
        self.body
            .contained_ref_mut()
            .extend(&mut geometry.cells, "outer", &outer)?;
        info!(
            component = %self.body.name(),
            ports = self.ports.len(),
            hosts,
            "ports retrofitted"
        );
        Ok(())
    }
}

impl Component for PortTube {
    fn name(&self) -> &str {
        self.body.name()
    }

    fn populate(&mut self, vars: &VariableStore) -> Result<()> {
        self.body.populate(vars)?;
        let key = self.body.name().to_owned();
        let count: usize = vars.eval_def_var(&format!("{key}NPorts"), 0)?;
        self.placements.clear();
        for i in 0..count {
            let prefix = format!("{key}Port{i}");
            self.placements.push(Placement {
                offset: vars.eval_var(&format!("{prefix}YStep"))?,
                axis: vars.eval_def_var(&format!("{prefix}Axis"), Vector3::x())?,
                radius: vars.eval_var(&format!("{prefix}Radius"))?,
                wall: vars.eval_def_var(&format!("{prefix}Wall"), 0.0)?,
                length: vars.eval_var(&format!("{prefix}Length"))?,
            });
        }
        Ok(())
    }

    fn create_unit_vector(&mut self, anchor: Option<&LinkPoint>) {
        self.body.create_unit_vector(anchor);
    }

    fn create_surfaces(&mut self, geometry: &mut Geometry) -> Result<()> {
        self.body.create_surfaces(geometry)
    }

    fn create_objects(&mut self, geometry: &mut Geometry) -> Result<()> {
        self.body.create_objects(geometry)?;
        if self.deferred {
            debug!(component = %self.body.name(), "port retrofit deferred");
            Ok(())
        } else {
            self.retrofit_ports(geometry)
        }
    }

    fn create_links(&mut self, geometry: &Geometry) -> Result<()> {
        self.body.create_links(geometry)
    }

    fn links(&self) -> &LinkSet {
        self.body.links()
    }

    fn named_surfaces(&self) -> &NamedSurfaces {
        self.body.named_surfaces()
    }

    fn nominal_length(&self) -> Option<f64> {
        self.body.nominal_length()
    }

    fn contained(&self) -> Option<&Contained> {
        self.body.contained()
    }

    fn contained_mut(&mut self) -> Option<&mut Contained> {
        self.body.contained_mut()
    }

    fn as_front_back(&self) -> Option<&dyn HasFrontBack> {
        Some(&self.body)
    }

    fn as_front_back_mut(&mut self) -> Option<&mut dyn HasFrontBack> {
        Some(&mut self.body)
    }

    fn as_ports(&self) -> Option<&dyn HasNamedPorts> {
        Some(self)
    }

    fn as_ports_mut(&mut self) -> Option<&mut dyn HasNamedPorts> {
        Some(self)
    }
}
