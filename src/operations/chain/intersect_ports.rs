use crate::context::{BuildContext, ComponentId};
use crate::error::{ComponentError, Result};

/// Removes the double-counted volume between two ports of one tube.
pub struct IntersectPorts {
    component: ComponentId,
    first: usize,
    second: usize,
    void_only: bool,
}

impl IntersectPorts {
    /// Creates a new `IntersectPorts` operation for ports `first` and `second`.
    #[must_use]
    pub fn new(component: ComponentId, first: usize, second: usize) -> Self {
        Self {
            component,
            first,
            second,
            void_only: false,
        }
    }

    /// Only separates the two voids and leaves the walls as they are.
    #[must_use]
    pub fn void_only(mut self) -> Self {
        self.void_only = true;
        self
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the component has no ports, an index is out of
    /// range, the ports are not built yet, or a port cell is frozen.
    pub fn execute(&self, ctx: &mut BuildContext) -> Result<()> {
        let (component, geometry) = ctx.parts_mut(self.component)?;
        let name = component.name().to_owned();
        let ports = component
            .as_ports_mut()
            .ok_or(ComponentError::MissingCapability {
                component: name,
                capability: "named ports",
            })?
            .port_set_mut();
        if self.void_only {
            ports.intersect_void_ports(&mut geometry.cells, self.first, self.second)
        } else {
            ports.intersect_ports(&mut geometry.cells, self.first, self.second)
        }
    }
}
