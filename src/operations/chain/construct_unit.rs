use tracing::debug;

use crate::context::{BuildContext, ComponentId};
use crate::diagnostics::ConsistencyWarning;
use crate::error::{Result, ZoneError};
use crate::link::BACK;
use crate::registry::CellId;
use crate::zone::Zone;

/// Appends one component to a zone's beamline.
///
/// The component's front is bound to the exact boundary of the previous
/// component's link, the component is built there, the zone carves the void
/// up to its `back` link, and the component is inserted into that void.
/// Because the boundary rule itself is handed over, adjacent cells share
/// their face with opposite sign regardless of floating-point drift.
pub struct ConstructUnit {
    previous: ComponentId,
    link: String,
    next: ComponentId,
    optional: bool,
}

impl ConstructUnit {
    /// Creates a new `ConstructUnit` operation.
    #[must_use]
    pub fn new(previous: ComponentId, link: impl Into<String>, next: ComponentId) -> Self {
        Self {
            previous,
            link: link.into(),
            next,
            optional: false,
        }
    }

    /// Marks the site optional: a zero-length component is built but no void
    /// is carved for it and no warning is raised.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Executes the operation, returning the carved cell.
    ///
    /// `next` is populated once; the nominal length and the build read the
    /// same parameters. Returns `None` when no cell was carved: a skipped
    /// optional site or a collapsed placement.
    ///
    /// # Errors
    ///
    /// Returns an error if a component or link is unknown, `next` cannot take
    /// a front cut, the build fails, or the zone rejects the carve.
    pub fn execute(&self, ctx: &mut BuildContext, zone: &mut Zone) -> Result<Option<CellId>> {
        let name = ctx.component(self.next)?.name().to_owned();
        if zone.is_carved(&name) {
            return Err(ZoneError::AlreadyCarved {
                zone: zone.name().to_owned(),
                tag: name,
            }
            .into());
        }
        let exit = ctx.link(self.previous, &self.link)?;
        ctx.set_front(self.next, exit.rule.clone())?;

        let nominal = ctx.populate(self.next)?;
        let zero_tol = zone.settings().zero_tol;
        let skip = self.optional && nominal.is_some_and(|l| l < zero_tol);

        ctx.build(self.next, Some(&exit))?;
        if skip {
            debug!(component = %name, zone = %zone.name(), "optional site skipped");
            return Ok(None);
        }

        let back = ctx.link(self.next, BACK)?;
        let span = zone.span_to(&back);
        let cell = zone.create_outer_void_unit(&mut ctx.geometry, &name, &back)?;

        if let Some(expected) = nominal {
            let collapsed = cell.is_none();
            if collapsed || (span - expected).abs() > zone.settings().length_tol {
                ctx.geometry.diagnostics.warn(ConsistencyWarning::LengthMismatch {
                    component: name.clone(),
                    expected,
                    actual: span,
                    collapsed,
                });
            }
        }

        if let Some(cell) = cell {
            if ctx.component(self.next)?.contained().is_some() {
                ctx.insert_in_cell(self.next, cell)?;
            }
        }
        Ok(cell)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::component::{Marker, Pipe};
    use crate::error::{BeamcsgError, ComponentError};
    use crate::math::{Point3, Vector3};
    use crate::rule::HeadRule;
    use crate::vars::VariableStore;

    fn setup(lengths: &[(&str, f64)]) -> (BuildContext, ComponentId, Zone) {
        let mut vars = VariableStore::new();
        for &(key, length) in lengths {
            vars.add_variable(format!("{key}Length"), length);
            vars.add_variable(format!("{key}Radius"), 1.0);
        }
        let mut ctx = BuildContext::new(vars);
        let origin = ctx
            .register(Marker::new("origin", Point3::origin(), Vector3::y()))
            .unwrap();
        ctx.create_all(origin, None).unwrap();
        let entry = ctx.link(origin, BACK).unwrap();
        let mut zone = Zone::new("line", HeadRule::universe());
        zone.construct_master_cell(&mut ctx.geometry, &entry).unwrap();
        (ctx, origin, zone)
    }

    #[test]
    fn one_cell_per_component() {
        let (mut ctx, origin, mut zone) = setup(&[("a", 10.0)]);
        let a = ctx.register(Pipe::new("a")).unwrap();
        let cell = ConstructUnit::new(origin, BACK, a)
            .execute(&mut ctx, &mut zone)
            .unwrap()
            .unwrap();
        assert_eq!(zone.cells(), &[("a".to_owned(), cell)]);
        assert!(ctx.diagnostics().is_empty());
        let inside_pipe = Point3::new(0.0, 5.0, 0.0);
        let beside_pipe = Point3::new(3.0, 5.0, 0.0);
        let rule = ctx.geometry.cells.rule(cell).unwrap();
        assert!(!rule.is_valid(&inside_pipe, &ctx.geometry.surfaces).unwrap());
        assert!(rule.is_valid(&beside_pipe, &ctx.geometry.surfaces).unwrap());
    }

    #[test]
    fn repeated_construction_is_rejected() {
        let (mut ctx, origin, mut zone) = setup(&[("a", 10.0)]);
        let a = ctx.register(Pipe::new("a")).unwrap();
        let op = ConstructUnit::new(origin, BACK, a);
        op.execute(&mut ctx, &mut zone).unwrap();
        let cells = ctx.geometry.cells.len();
        assert!(matches!(
            op.execute(&mut ctx, &mut zone).unwrap_err(),
            BeamcsgError::Zone(ZoneError::AlreadyCarved { .. })
        ));
        assert_eq!(ctx.geometry.cells.len(), cells);
    }

    #[test]
    fn marker_cannot_be_chained() {
        let (mut ctx, origin, mut zone) = setup(&[]);
        let m = ctx
            .register(Marker::new("m", Point3::origin(), Vector3::y()))
            .unwrap();
        assert!(matches!(
            ConstructUnit::new(origin, BACK, m)
                .execute(&mut ctx, &mut zone)
                .unwrap_err(),
            BeamcsgError::Component(ComponentError::MissingCapability { .. })
        ));
    }

    #[test]
    fn optional_zero_length_is_skipped_quietly() {
        let (mut ctx, origin, mut zone) = setup(&[("gap", 0.0)]);
        let gap = ctx.register(Pipe::new("gap")).unwrap();
        let cells = ctx.geometry.cells.len();
        let divider = zone.divider().clone();
        let carved = ConstructUnit::new(origin, BACK, gap)
            .optional()
            .execute(&mut ctx, &mut zone)
            .unwrap();
        assert!(carved.is_none());
        assert_eq!(ctx.geometry.cells.len(), cells);
        assert_eq!(zone.divider(), &divider);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn required_zero_length_warns() {
        let (mut ctx, origin, mut zone) = setup(&[("gap", 0.0)]);
        let gap = ctx.register(Pipe::new("gap")).unwrap();
        let carved = ConstructUnit::new(origin, BACK, gap)
            .execute(&mut ctx, &mut zone)
            .unwrap();
        assert!(carved.is_none());
        assert!(matches!(
            ctx.diagnostics().warnings(),
            [ConsistencyWarning::LengthMismatch { collapsed: true, .. }]
        ));
    }

    #[test]
    fn drift_beyond_tolerance_warns() {
        let (mut ctx, origin, mut zone) = setup(&[("a", 10.0)]);
        ctx.vars.add_variable("aYStep", 0.5);
        let a = ctx.register(Pipe::new("a")).unwrap();
        ConstructUnit::new(origin, BACK, a)
            .execute(&mut ctx, &mut zone)
            .unwrap();
        assert!(matches!(
            ctx.diagnostics().warnings(),
            [ConsistencyWarning::LengthMismatch { collapsed: false, .. }]
        ));
    }
}
