mod settings;
mod split;

pub use settings::ZoneSettings;

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::context::Geometry;
use crate::error::{Result, ZoneError};
use crate::link::LinkPoint;
use crate::registry::CellId;
use crate::rule::HeadRule;

/// Lifecycle of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    Empty,
    MasterActive,
    Closed,
}

impl ZoneState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::MasterActive => "master-active",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ZoneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Walks a beamline inside a bounding `surround` and carves the unassigned
/// master void into one bounded cell per component.
///
/// The zone only keeps boundary bookkeeping. The master cell lives in the
/// [`CellStore`](crate::registry::CellStore) and is touched only through the
/// zone's own operations; it only ever shrinks.
#[derive(Debug, Clone)]
pub struct Zone {
    name: String,
    settings: ZoneSettings,
    state: ZoneState,
    surround: HeadRule,
    front: HeadRule,
    back: HeadRule,
    master: Option<CellId>,
    divider: HeadRule,
    anchor: Option<LinkPoint>,
    cells: Vec<(String, CellId)>,
    carved: BTreeSet<String>,
}

impl Zone {
    /// Creates an empty zone inside `surround`, unbounded at both ends.
    #[must_use]
    pub fn new(name: impl Into<String>, surround: HeadRule) -> Self {
        Self {
            name: name.into(),
            settings: ZoneSettings::default(),
            state: ZoneState::Empty,
            surround,
            front: HeadRule::universe(),
            back: HeadRule::universe(),
            master: None,
            divider: HeadRule::universe(),
            anchor: None,
            cells: Vec::new(),
            carved: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ZoneSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Bounds the far end of the master void.
    #[must_use]
    pub fn with_back(mut self, back: HeadRule) -> Self {
        self.back = back;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn settings(&self) -> &ZoneSettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> ZoneState {
        self.state
    }

    #[must_use]
    pub fn surround(&self) -> &HeadRule {
        &self.surround
    }

    #[must_use]
    pub fn front(&self) -> &HeadRule {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &HeadRule {
        &self.back
    }

    /// The rule the next carved cell starts from.
    #[must_use]
    pub fn divider(&self) -> &HeadRule {
        &self.divider
    }

    /// The link point the divider was last moved to.
    #[must_use]
    pub fn anchor(&self) -> Option<&LinkPoint> {
        self.anchor.as_ref()
    }

    #[must_use]
    pub fn master_cell(&self) -> Option<CellId> {
        self.master
    }

    /// Carved cells in build order.
    #[must_use]
    pub fn cells(&self) -> &[(String, CellId)] {
        &self.cells
    }

    /// The cell carved for `tag`.
    #[must_use]
    pub fn cell(&self, tag: &str) -> Option<CellId> {
        self.cells.iter().find(|(t, _)| t == tag).map(|&(_, id)| id)
    }

    /// Whether `tag` has been carved, including degenerate carves.
    #[must_use]
    pub fn is_carved(&self, tag: &str) -> bool {
        self.carved.contains(tag)
    }

    /// Opens the master void behind `entry`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the zone is empty.
    pub fn construct_master_cell(
        &mut self,
        geometry: &mut Geometry,
        entry: &LinkPoint,
    ) -> Result<CellId> {
        self.expect_state(ZoneState::Empty)?;
        let rule = HeadRule::intersect_all([&self.surround, &entry.rule, &self.back]);
        let id = geometry.cells.make_cell(
            format!("{}Master", self.name),
            self.settings.void_material,
            0.0,
            rule,
        );
        self.master = Some(id);
        self.front = entry.rule.clone();
        self.divider = entry.rule.clone();
        self.anchor = Some(entry.clone());
        self.state = ZoneState::MasterActive;
        debug!(zone = %self.name, master = %id, entry = %entry.name, "master cell opened");
        Ok(id)
    }

    /// Carves the cell between the divider and `exit` out of the master void.
    ///
    /// Returns `None` when `exit` lies within `zero_tol` of the current
    /// anchor: no cell is made, but the divider and anchor still move to
    /// `exit`. The cell never reaches past the zone's `back`.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone has no active master, `tag` was carved
    /// before, or `exit` lies behind the current anchor.
    pub fn create_outer_void_unit(
        &mut self,
        geometry: &mut Geometry,
        tag: &str,
        exit: &LinkPoint,
    ) -> Result<Option<CellId>> {
        self.expect_state(ZoneState::MasterActive)?;
        if self.carved.contains(tag) {
            return Err(ZoneError::AlreadyCarved {
                zone: self.name.clone(),
                tag: tag.to_owned(),
            }
            .into());
        }
        let span = self.span_to(exit);
        self.check_forward(exit, span)?;
        let carved = if span < self.settings.zero_tol {
            debug!(zone = %self.name, tag, span, "degenerate carve; no cell made");
            None
        } else {
            let rule = HeadRule::intersect_all([
                &self.surround,
                &self.divider,
                &self.back,
                &exit.rule.complement(),
            ]);
            let id = geometry
                .cells
                .make_cell(tag, self.settings.void_material, 0.0, rule);
            self.cells.push((tag.to_owned(), id));
            debug!(zone = %self.name, tag, cell = %id, span, "carved outer void");
            Some(id)
        };
        self.carved.insert(tag.to_owned());
        self.advance(geometry, exit)?;
        Ok(carved)
    }

    /// Moves the divider to `link` without emitting a cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone has no active master or `link` lies
    /// behind the current anchor.
    pub fn refront_master_cell(&mut self, geometry: &mut Geometry, link: &LinkPoint) -> Result<()> {
        self.expect_state(ZoneState::MasterActive)?;
        self.check_forward(link, self.span_to(link))?;
        debug!(zone = %self.name, link = %link.name, "master refronted");
        self.advance(geometry, link)
    }

    /// Discards the remaining master void and closes the zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone has no active master, or the master cell
    /// has been committed.
    pub fn remove_last_master(&mut self, geometry: &mut Geometry) -> Result<()> {
        self.expect_state(ZoneState::MasterActive)?;
        if let Some(id) = self.master.take() {
            geometry.cells.remove(id)?;
        }
        self.state = ZoneState::Closed;
        debug!(zone = %self.name, cells = self.cells.len(), "zone closed");
        Ok(())
    }

    /// Distance from the current anchor to `point` along the anchor axis.
    #[must_use]
    pub fn span_to(&self, point: &LinkPoint) -> f64 {
        self.anchor.as_ref().map_or(0.0, |a| a.separation(point))
    }

    fn advance(&mut self, geometry: &mut Geometry, link: &LinkPoint) -> Result<()> {
        if let Some(master) = self.master {
            let rule = HeadRule::intersect_all([&self.surround, &link.rule, &self.back]);
            geometry.cells.set_rule(master, rule)?;
        }
        self.divider = link.rule.clone();
        self.anchor = Some(link.clone());
        Ok(())
    }

    /// The master only shrinks: the divider never moves back over carved
    /// cells.
    fn check_forward(&self, link: &LinkPoint, span: f64) -> Result<()> {
        if span < -self.settings.zero_tol {
            return Err(ZoneError::BackwardStep {
                zone: self.name.clone(),
                link: link.name.clone(),
                distance: -span,
            }
            .into());
        }
        Ok(())
    }

    fn expect_state(&self, expected: ZoneState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ZoneError::InvalidState {
                zone: self.name.clone(),
                expected: expected.as_str(),
                found: self.state.as_str(),
            }
            .into())
        }
    }
}
