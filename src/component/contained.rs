use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ComponentError, Result};
use crate::registry::{CellId, CellStore};
use crate::rule::HeadRule;

/// Outer boundary of a component.
#[derive(Debug, Clone)]
pub enum Boundary {
    Single(HeadRule),
    Group(BTreeMap<String, HeadRule>),
}

impl Default for Boundary {
    fn default() -> Self {
        Self::Single(HeadRule::null())
    }
}

/// The containment capability: an outer boundary plus the host cells the
/// component has been inserted into.
///
/// Inserting into a host cell intersects the host with the complement of the
/// boundary. The hosts are remembered so that a later widening of the
/// boundary reaches them as well.
#[derive(Debug, Clone, Default)]
pub struct Contained {
    owner: String,
    boundary: Boundary,
    inserted: Vec<CellId>,
}

impl Contained {
    /// Single-region containment with an empty boundary.
    #[must_use]
    pub fn single(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            boundary: Boundary::default(),
            inserted: Vec::new(),
        }
    }

    /// Multi-region containment with no regions yet.
    #[must_use]
    pub fn group(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            boundary: Boundary::Group(BTreeMap::new()),
            inserted: Vec::new(),
        }
    }

    #[must_use]
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Replaces the outer boundary of a single-region component, or every
    /// region of a group with the one region `"outer"`.
    pub fn set_outer(&mut self, rule: HeadRule) {
        match &mut self.boundary {
            Boundary::Single(outer) => *outer = rule,
            Boundary::Group(regions) => {
                regions.clear();
                regions.insert("outer".to_owned(), rule);
            }
        }
    }

    /// Adds a named region.
    ///
    /// # Errors
    ///
    /// Returns an error on single-region containment or a duplicate name.
    pub fn add_region(&mut self, name: impl Into<String>, rule: HeadRule) -> Result<()> {
        let Boundary::Group(regions) = &mut self.boundary else {
            return Err(self.missing_group());
        };
        let name = name.into();
        if regions.contains_key(&name) {
            return Err(ComponentError::DuplicateTag {
                component: self.owner.clone(),
                kind: "region",
                tag: name,
            }
            .into());
        }
        regions.insert(name, rule);
        Ok(())
    }

    /// The whole outer boundary; the union of all regions for a group.
    #[must_use]
    pub fn outer(&self) -> HeadRule {
        match &self.boundary {
            Boundary::Single(rule) => rule.clone(),
            Boundary::Group(regions) => HeadRule::unite_all(regions.values()),
        }
    }

    /// One named region of a group.
    ///
    /// # Errors
    ///
    /// Returns an error on single-region containment or an unknown region.
    pub fn region(&self, name: &str) -> Result<&HeadRule> {
        let Boundary::Group(regions) = &self.boundary else {
            return Err(self.missing_group());
        };
        regions.get(name).ok_or_else(|| {
            ComponentError::TagNotFound {
                component: self.owner.clone(),
                kind: "region",
                tag: name.to_owned(),
            }
            .into()
        })
    }

    /// Cuts the whole boundary out of `cell`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cell cannot be retrofitted.
    pub fn insert_in_cell(&mut self, cells: &mut CellStore, cell: CellId) -> Result<()> {
        let outer = self.outer();
        cells.retrofit(cell, |rule| rule.exclude(&outer))?;
        debug!(component = %self.owner, %cell, "inserted into cell");
        if !self.inserted.contains(&cell) {
            self.inserted.push(cell);
        }
        Ok(())
    }

    /// Cuts one named region out of `cell`.
    ///
    /// # Errors
    ///
    /// Returns an error on single-region containment, an unknown region, or a
    /// host cell that cannot be retrofitted.
    pub fn insert_region_in_cell(
        &mut self,
        cells: &mut CellStore,
        region: &str,
        cell: CellId,
    ) -> Result<()> {
        let rule = self.region(region)?.clone();
        cells.retrofit(cell, |host| host.exclude(&rule))?;
        debug!(component = %self.owner, region, %cell, "inserted region into cell");
        Ok(())
    }

    /// Widens the boundary by `extra` and cuts `extra` out of every host the
    /// component was already inserted into.
    ///
    /// # Errors
    ///
    /// Returns an error if a host cell cannot be retrofitted; no host and not
    /// the boundary is changed in that case.
    pub fn extend(&mut self, cells: &mut CellStore, name: &str, extra: &HeadRule) -> Result<()> {
        cells.check_retrofit_all(self.inserted.iter().copied())?;
        for &cell in &self.inserted {
            cells.retrofit(cell, |host| host.exclude(extra))?;
        }
        match &mut self.boundary {
            Boundary::Single(outer) => *outer = outer.unite(extra),
            Boundary::Group(regions) => {
                let merged = regions
                    .get(name)
                    .map_or_else(|| extra.clone(), |r| r.unite(extra));
                regions.insert(name.to_owned(), merged);
            }
        }
        Ok(())
    }

    /// Host cells this component has been inserted into.
    #[must_use]
    pub fn inserted(&self) -> &[CellId] {
        &self.inserted
    }

    fn missing_group(&self) -> crate::error::BeamcsgError {
        ComponentError::MissingCapability {
            component: self.owner.clone(),
            capability: "multi-region containment",
        }
        .into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{BeamcsgError, CellError};
    use crate::registry::VOID;

    fn r(text: &str) -> HeadRule {
        text.parse().unwrap()
    }

    #[test]
    fn insert_excludes_outer() {
        let mut cells = CellStore::new();
        let host = cells.make_cell("zone", VOID, 0.0, r("1 -2 -100"));
        let mut c = Contained::single("pipe");
        c.set_outer(r("-17 1 -2"));
        c.insert_in_cell(&mut cells, host).unwrap();
        assert_eq!(cells.rule(host).unwrap().to_string(), "1 -2 -100 (17 : -1 : 2)");
        assert_eq!(c.inserted(), &[host]);
    }

    #[test]
    fn region_on_single_is_capability_error() {
        let mut cells = CellStore::new();
        let host = cells.make_cell("zone", VOID, 0.0, r("1"));
        let mut c = Contained::single("pipe");
        assert!(matches!(
            c.insert_region_in_cell(&mut cells, "flange", host).unwrap_err(),
            BeamcsgError::Component(ComponentError::MissingCapability { .. })
        ));
    }

    #[test]
    fn group_regions_unite_into_outer() {
        let mut c = Contained::group("magnet");
        c.add_region("upper", r("3")).unwrap();
        c.add_region("lower", r("-4")).unwrap();
        assert!(c.add_region("upper", r("5")).is_err());
        assert_eq!(c.outer().to_string(), "-4 : 3");
        assert_eq!(c.region("upper").unwrap().to_string(), "3");
    }

    #[test]
    fn extend_reaches_earlier_hosts() {
        let mut cells = CellStore::new();
        let host = cells.make_cell("zone", VOID, 0.0, r("-100"));
        let mut c = Contained::single("tube");
        c.set_outer(r("-17"));
        c.insert_in_cell(&mut cells, host).unwrap();
        c.extend(&mut cells, "outer", &r("-31")).unwrap();
        assert_eq!(c.outer().to_string(), "-17 : -31");
        assert_eq!(cells.rule(host).unwrap().to_string(), "-100 17 31");
    }

    #[test]
    fn extend_after_observation_fails() {
        let mut cells = CellStore::new();
        let host = cells.make_cell("zone", VOID, 0.0, r("-100"));
        let mut c = Contained::single("tube");
        c.set_outer(r("-17"));
        c.insert_in_cell(&mut cells, host).unwrap();
        cells.observe(host).unwrap();
        assert!(matches!(
            c.extend(&mut cells, "outer", &r("-31")).unwrap_err(),
            BeamcsgError::Cell(CellError::RetrofitAfterObservation(_))
        ));
        assert_eq!(c.outer().to_string(), "-17");
    }

    #[test]
    fn refused_extend_leaves_every_host() {
        let mut cells = CellStore::new();
        let first = cells.make_cell("zoneA", VOID, 0.0, r("-100"));
        let second = cells.make_cell("zoneB", VOID, 0.0, r("-200"));
        let mut c = Contained::single("tube");
        c.set_outer(r("-17"));
        c.insert_in_cell(&mut cells, first).unwrap();
        c.insert_in_cell(&mut cells, second).unwrap();
        cells.observe(second).unwrap();
        assert!(c.extend(&mut cells, "outer", &r("-31")).is_err());
        assert_eq!(cells.rule(first).unwrap().to_string(), "-100 17");
        assert_eq!(cells.rule(second).unwrap().to_string(), "-200 17");
    }
}
