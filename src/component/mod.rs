mod contained;
mod fixed;
mod marker;
mod pipe;
mod port;
mod port_tube;

pub use contained::{Boundary, Contained};
pub use fixed::FixedComp;
pub use marker::Marker;
pub use pipe::Pipe;
pub use port::{Port, PortCells, PortSet};
pub use port_tube::PortTube;

use crate::context::Geometry;
use crate::error::Result;
use crate::link::{ExternalCut, LinkPoint, LinkSet, NamedCells, NamedSurfaces};
use crate::vars::VariableStore;

/// Components that expose tagged cells.
pub trait HasNamedCells {
    fn named_cells(&self) -> &NamedCells;
}

/// Components whose entry and exit boundaries can be imposed from outside.
pub trait HasFrontBack {
    fn external_cut(&self) -> &ExternalCut;
    fn external_cut_mut(&mut self) -> &mut ExternalCut;
}

/// Components with radial side ports.
pub trait HasNamedPorts {
    fn port_set(&self) -> &PortSet;
    fn port_set_mut(&mut self) -> &mut PortSet;

    /// Cuts the ports into the already registered skeleton cells.
    ///
    /// # Errors
    ///
    /// Returns an error if a skeleton cell was observed or committed, or the
    /// ports have been built already.
    fn retrofit_ports(&mut self, geometry: &mut Geometry) -> Result<()>;
}

/// The build contract every beamline component satisfies.
///
/// After [`create_all`](Component::create_all) the component exposes a
/// `front` and a `back` link point and owns a self-contained set of cells.
/// Optional capabilities are discovered through the `as_*` methods rather than
/// by concrete type.
pub trait Component: HasNamedCells {
    /// Registry name of the component.
    fn name(&self) -> &str;

    /// Reads dimensions and materials from the variable database.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or invalid.
    fn populate(&mut self, vars: &VariableStore) -> Result<()>;

    /// Places the local frame at `anchor` (or the component's default).
    fn create_unit_vector(&mut self, anchor: Option<&LinkPoint>);

    /// Registers the component's surfaces.
    ///
    /// # Errors
    ///
    /// Returns an error if a surface is degenerate or cannot be registered.
    fn create_surfaces(&mut self, geometry: &mut Geometry) -> Result<()>;

    /// Creates the component's own cells.
    ///
    /// # Errors
    ///
    /// Returns an error if a cell rule cannot be resolved.
    fn create_objects(&mut self, geometry: &mut Geometry) -> Result<()>;

    /// Publishes the link points.
    ///
    /// # Errors
    ///
    /// Returns an error if a link point is degenerate or duplicated.
    fn create_links(&mut self, geometry: &Geometry) -> Result<()>;

    /// Runs the full build sequence.
    ///
    /// # Errors
    ///
    /// Returns the first error of any build step.
    fn create_all(
        &mut self,
        vars: &VariableStore,
        geometry: &mut Geometry,
        anchor: Option<&LinkPoint>,
    ) -> Result<()> {
        self.populate(vars)?;
        self.build(geometry, anchor)
    }

    /// Runs every build step after `populate`, using the parameters already
    /// read.
    ///
    /// # Errors
    ///
    /// Returns the first error of any build step.
    fn build(&mut self, geometry: &mut Geometry, anchor: Option<&LinkPoint>) -> Result<()> {
        self.create_unit_vector(anchor);
        self.create_surfaces(geometry)?;
        self.create_objects(geometry)?;
        self.create_links(geometry)
    }

    fn links(&self) -> &LinkSet;

    fn named_surfaces(&self) -> &NamedSurfaces;

    /// Nominal length along the beam after `populate`.
    fn nominal_length(&self) -> Option<f64> {
        None
    }

    fn contained(&self) -> Option<&Contained> {
        None
    }

    fn contained_mut(&mut self) -> Option<&mut Contained> {
        None
    }

    fn as_front_back(&self) -> Option<&dyn HasFrontBack> {
        None
    }

    fn as_front_back_mut(&mut self) -> Option<&mut dyn HasFrontBack> {
        None
    }

    fn as_ports(&self) -> Option<&dyn HasNamedPorts> {
        None
    }

    fn as_ports_mut(&mut self) -> Option<&mut dyn HasNamedPorts> {
        None
    }
}
