use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CellError, Result};
use crate::rule::HeadRule;

/// Material number of a cell; `0` is void.
pub type MaterialId = u32;

/// Material number used for void cells.
pub const VOID: MaterialId = 0;

/// Cell number as written to the Monte-Carlo deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u32);

impl CellId {
    #[must_use]
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    #[must_use]
    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a cell.
///
/// Draft cells may still be retrofitted (for instance when ports are cut into
/// an already registered wall); committed cells are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Draft,
    Committed,
}

/// A bounded region of space with one material.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Tag of the cell: the owning component name plus its role.
    pub tag: String,
    pub material: MaterialId,
    pub density: f64,
    rule: HeadRule,
    state: CellState,
    observed: bool,
}

impl Cell {
    /// The region of the cell.
    #[must_use]
    pub fn rule(&self) -> &HeadRule {
        &self.rule
    }

    #[must_use]
    pub fn state(&self) -> CellState {
        self.state
    }

    /// Whether a consumer captured this cell's handle.
    #[must_use]
    pub fn is_observed(&self) -> bool {
        self.observed
    }
}

/// One emitted cell: `(id, rule, material)` plus its density and tag.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub id: CellId,
    pub tag: String,
    pub material: MaterialId,
    pub density: f64,
    pub rule: String,
}

/// Destination for emitted cells.
pub trait CellSink {
    fn accept(&mut self, record: CellRecord);
}

impl CellSink for Vec<CellRecord> {
    fn accept(&mut self, record: CellRecord) {
        self.push(record);
    }
}

/// Stores every cell of the model keyed by cell number.
#[derive(Debug)]
pub struct CellStore {
    cells: BTreeMap<CellId, Cell>,
    next: u32,
}

impl Default for CellStore {
    fn default() -> Self {
        Self {
            cells: BTreeMap::new(),
            next: 1,
        }
    }
}

impl CellStore {
    /// Creates a new, empty cell store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a draft cell under the next free cell number.
    pub fn make_cell(
        &mut self,
        tag: impl Into<String>,
        material: MaterialId,
        density: f64,
        rule: HeadRule,
    ) -> CellId {
        while self.cells.contains_key(&CellId(self.next)) {
            self.next += 1;
        }
        let id = CellId(self.next);
        self.next += 1;
        self.cells.insert(id, draft(tag.into(), material, density, rule));
        id
    }

    /// Creates a draft cell under an explicit cell number.
    ///
    /// # Errors
    ///
    /// Returns an error if the number is already used.
    pub fn insert_cell(
        &mut self,
        tag: impl Into<String>,
        id: CellId,
        material: MaterialId,
        density: f64,
        rule: HeadRule,
    ) -> Result<CellId> {
        if self.cells.contains_key(&id) {
            return Err(CellError::DuplicateCell(id.0).into());
        }
        self.cells.insert(id, draft(tag.into(), material, density, rule));
        Ok(id)
    }

    /// Returns the cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist.
    pub fn cell(&self, id: CellId) -> Result<&Cell> {
        self.cells
            .get(&id)
            .ok_or_else(|| CellError::CellNotFound(id.0).into())
    }

    /// Returns the region of the cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist.
    pub fn rule(&self, id: CellId) -> Result<&HeadRule> {
        Ok(&self.cell(id)?.rule)
    }

    /// Marks the cell as captured by a consumer and returns its region.
    ///
    /// After this call the cell can no longer be retrofitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist.
    pub fn observe(&mut self, id: CellId) -> Result<&HeadRule> {
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or(CellError::CellNotFound(id.0))?;
        cell.observed = true;
        Ok(&cell.rule)
    }

    /// Replaces the region of a draft, unobserved cell with `f(old)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist, is committed, or has been
    /// observed.
    pub fn retrofit(&mut self, id: CellId, f: impl FnOnce(&HeadRule) -> HeadRule) -> Result<()> {
        self.check_retrofit(id)?;
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or(CellError::CellNotFound(id.0))?;
        cell.rule = f(&cell.rule);
        Ok(())
    }

    /// Checks that [`retrofit`](Self::retrofit) would accept every cell in
    /// `ids`, without changing any of them.
    ///
    /// # Errors
    ///
    /// Returns the error the first refused cell would raise.
    pub fn check_retrofit_all(&self, ids: impl IntoIterator<Item = CellId>) -> Result<()> {
        ids.into_iter().try_for_each(|id| self.check_retrofit(id))
    }

    fn check_retrofit(&self, id: CellId) -> Result<()> {
        let cell = self.cell(id)?;
        if cell.state == CellState::Committed {
            return Err(CellError::Committed(id.0).into());
        }
        if cell.observed {
            return Err(CellError::RetrofitAfterObservation(id.0).into());
        }
        Ok(())
    }

    /// Replaces the region of a draft, unobserved cell.
    ///
    /// # Errors
    ///
    /// Same as [`retrofit`](Self::retrofit).
    pub fn set_rule(&mut self, id: CellId, rule: HeadRule) -> Result<()> {
        self.retrofit(id, move |_| rule)
    }

    /// Commits one cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist.
    pub fn commit(&mut self, id: CellId) -> Result<()> {
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or(CellError::CellNotFound(id.0))?;
        cell.state = CellState::Committed;
        Ok(())
    }

    /// Commits every cell.
    pub fn commit_all(&mut self) {
        for cell in self.cells.values_mut() {
            cell.state = CellState::Committed;
        }
    }

    /// Removes a cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist or is committed.
    pub fn remove(&mut self, id: CellId) -> Result<Cell> {
        match self.cells.get(&id) {
            None => Err(CellError::CellNotFound(id.0).into()),
            Some(c) if c.state == CellState::Committed => Err(CellError::Committed(id.0).into()),
            Some(_) => self
                .cells
                .remove(&id)
                .ok_or_else(|| CellError::CellNotFound(id.0).into()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(&id)
    }

    /// Iterates over cells in cell-number order.
    pub fn iter(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter().map(|(&id, c)| (id, c))
    }

    /// Every cell as an output record, in cell-number order.
    #[must_use]
    pub fn records(&self) -> Vec<CellRecord> {
        self.cells
            .iter()
            .map(|(&id, cell)| CellRecord {
                id,
                tag: cell.tag.clone(),
                material: cell.material,
                density: cell.density,
                rule: cell.rule.to_string(),
            })
            .collect()
    }

    /// Emits every cell to `sink` in cell-number order.
    pub fn write_to(&self, sink: &mut dyn CellSink) {
        for record in self.records() {
            sink.accept(record);
        }
    }
}

fn draft(tag: String, material: MaterialId, density: f64, rule: HeadRule) -> Cell {
    Cell {
        tag,
        material,
        density,
        rule,
        state: CellState::Draft,
        observed: false,
    }
}
