use std::collections::HashMap;

use slotmap::SlotMap;
use tracing::debug;

use crate::component::Component;
use crate::diagnostics::Diagnostics;
use crate::error::{ComponentError, RegistryError, Result};
use crate::link::LinkPoint;
use crate::registry::{CellId, CellSink, CellStore, SurfaceRegistry};
use crate::rule::HeadRule;
use crate::vars::VariableStore;

slotmap::new_key_type! {
    /// Unique identifier for a registered component.
    pub struct ComponentId;
}

/// Everything a build pass writes: surfaces, cells and warnings.
#[derive(Debug, Default)]
pub struct Geometry {
    pub surfaces: SurfaceRegistry,
    pub cells: CellStore,
    pub diagnostics: Diagnostics,
}

impl Geometry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Central arena owning every component of one model build.
///
/// Components are referred to by [`ComponentId`] and registered under a
/// unique name. The context is passed explicitly to every operation; there
/// is no process-wide registry.
#[derive(Default)]
pub struct BuildContext {
    pub vars: VariableStore,
    pub geometry: Geometry,
    components: SlotMap<ComponentId, Box<dyn Component>>,
    names: HashMap<String, ComponentId>,
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("components", &self.names.len())
            .field("surfaces", &self.geometry.surfaces.len())
            .field("cells", &self.geometry.cells.len())
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Creates a context over the given variable database.
    #[must_use]
    pub fn new(vars: VariableStore) -> Self {
        Self {
            vars,
            ..Self::default()
        }
    }

    /// Registers a component under its name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already taken.
    pub fn register<C: Component + 'static>(&mut self, component: C) -> Result<ComponentId> {
        self.register_boxed(Box::new(component))
    }

    /// Registers an already boxed component under its name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already taken.
    pub fn register_boxed(&mut self, component: Box<dyn Component>) -> Result<ComponentId> {
        let name = component.name().to_owned();
        if self.names.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name).into());
        }
        let id = self.components.insert(component);
        debug!(component = %name, "registered");
        self.names.insert(name, id);
        Ok(id)
    }

    /// Finds a component by name.
    ///
    /// # Errors
    ///
    /// Returns an error if no component has that name.
    pub fn lookup(&self, name: &str) -> Result<ComponentId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::NameNotFound(name.to_owned()).into())
    }

    /// # Errors
    ///
    /// Returns an error if the id does not refer to a live component.
    pub fn component(&self, id: ComponentId) -> Result<&dyn Component> {
        match self.components.get(id) {
            Some(c) => Ok(c.as_ref()),
            None => Err(RegistryError::StaleComponent.into()),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the id does not refer to a live component.
    pub fn component_mut(&mut self, id: ComponentId) -> Result<&mut dyn Component> {
        match self.components.get_mut(id) {
            Some(c) => {
                let component: &mut dyn Component = c.as_mut();
                Ok(component)
            }
            None => Err(RegistryError::StaleComponent.into()),
        }
    }

    /// Borrows a component together with the geometry it builds into.
    ///
    /// # Errors
    ///
    /// Returns an error if the id does not refer to a live component.
    pub fn parts_mut(&mut self, id: ComponentId) -> Result<(&mut dyn Component, &mut Geometry)> {
        match self.components.get_mut(id) {
            Some(c) => {
                let component: &mut dyn Component = c.as_mut();
                Ok((component, &mut self.geometry))
            }
            None => Err(RegistryError::StaleComponent.into()),
        }
    }

    /// Populates a component without building it and returns its nominal
    /// length.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or invalid.
    pub fn populate(&mut self, id: ComponentId) -> Result<Option<f64>> {
        let component = self
            .components
            .get_mut(id)
            .ok_or(RegistryError::StaleComponent)?;
        component.populate(&self.vars)?;
        Ok(component.nominal_length())
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Runs the full build sequence of one component.
    ///
    /// # Errors
    ///
    /// Returns the first error of the build.
    pub fn create_all(&mut self, id: ComponentId, anchor: Option<&LinkPoint>) -> Result<()> {
        let component = self
            .components
            .get_mut(id)
            .ok_or(RegistryError::StaleComponent)?;
        component.create_all(&self.vars, &mut self.geometry, anchor)
    }

    /// Builds a component that was already populated, without reading the
    /// variables again.
    ///
    /// # Errors
    ///
    /// Returns the first error of the build.
    pub fn build(&mut self, id: ComponentId, anchor: Option<&LinkPoint>) -> Result<()> {
        let component = self
            .components
            .get_mut(id)
            .ok_or(RegistryError::StaleComponent)?;
        component.build(&mut self.geometry, anchor)
    }

    /// Resolves a link point of a component; a `#` prefix gives the reversed
    /// face.
    ///
    /// # Errors
    ///
    /// Returns an error if the component or link does not exist.
    pub fn link(&self, id: ComponentId, name: &str) -> Result<LinkPoint> {
        self.component(id)?.links().resolve(name)
    }

    /// Imposes the entry boundary of a component.
    ///
    /// # Errors
    ///
    /// Returns an error if the component cannot take external cuts.
    pub fn set_front(&mut self, id: ComponentId, rule: HeadRule) -> Result<()> {
        let component = self.component_mut(id)?;
        let name = component.name().to_owned();
        component
            .as_front_back_mut()
            .ok_or(ComponentError::MissingCapability {
                component: name,
                capability: "front/back cuts",
            })?
            .external_cut_mut()
            .set_front(rule);
        Ok(())
    }

    /// Cuts a component's outer boundary out of `cell`.
    ///
    /// # Errors
    ///
    /// Returns an error if the component has no containment or the cell
    /// cannot be retrofitted.
    pub fn insert_in_cell(&mut self, id: ComponentId, cell: CellId) -> Result<()> {
        let component = self
            .components
            .get_mut(id)
            .ok_or(RegistryError::StaleComponent)?;
        let name = component.name().to_owned();
        component
            .contained_mut()
            .ok_or(ComponentError::MissingCapability {
                component: name,
                capability: "containment",
            })?
            .insert_in_cell(&mut self.geometry.cells, cell)
    }

    /// Cuts one named region of a component out of `cell`.
    ///
    /// # Errors
    ///
    /// Returns an error if the component has no multi-region containment,
    /// the region is unknown, or the cell cannot be retrofitted.
    pub fn insert_region_in_cell(
        &mut self,
        id: ComponentId,
        region: &str,
        cell: CellId,
    ) -> Result<()> {
        let component = self
            .components
            .get_mut(id)
            .ok_or(RegistryError::StaleComponent)?;
        let name = component.name().to_owned();
        component
            .contained_mut()
            .ok_or(ComponentError::MissingCapability {
                component: name,
                capability: "containment",
            })?
            .insert_region_in_cell(&mut self.geometry.cells, region, cell)
    }

    /// Hands a tagged cell of a component to a consumer.
    ///
    /// The cell is marked observed and can no longer be retrofitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the component, tag or index does not exist.
    pub fn capture_cell(&mut self, id: ComponentId, tag: &str, index: usize) -> Result<CellId> {
        let cell = self.component(id)?.named_cells().get(tag, index)?;
        self.geometry.cells.observe(cell)?;
        Ok(cell)
    }

    /// Runs the deferred port retrofit of a component.
    ///
    /// # Errors
    ///
    /// Returns an error if the component has no ports or a target cell was
    /// observed or committed.
    pub fn retrofit_ports(&mut self, id: ComponentId) -> Result<()> {
        let component = self
            .components
            .get_mut(id)
            .ok_or(RegistryError::StaleComponent)?;
        let name = component.name().to_owned();
        component
            .as_ports_mut()
            .ok_or(ComponentError::MissingCapability {
                component: name,
                capability: "named ports",
            })?
            .retrofit_ports(&mut self.geometry)
    }

    /// Freezes every cell and emits them to `sink` in cell-number order.
    pub fn write_cells(&mut self, sink: &mut dyn CellSink) {
        self.geometry.cells.commit_all();
        self.geometry.cells.write_to(sink);
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.geometry.diagnostics
    }
}
