use std::collections::BTreeMap;

use crate::error::{ComponentError, Result};
use crate::registry::CellId;
use crate::rule::SignedSurface;

/// Tagged cells of one component.
///
/// Each tag maps to an ordered list so helpers that create several sibling
/// cells hand them back by name instead of by number arithmetic.
#[derive(Debug, Clone, Default)]
pub struct NamedCells {
    owner: String,
    cells: BTreeMap<String, Vec<CellId>>,
}

impl NamedCells {
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Appends a cell under `tag`.
    pub fn add(&mut self, tag: impl Into<String>, id: CellId) {
        self.cells.entry(tag.into()).or_default().push(id);
    }

    /// All cells under `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing was registered under `tag`.
    pub fn all(&self, tag: &str) -> Result<&[CellId]> {
        self.cells.get(tag).map(Vec::as_slice).ok_or_else(|| {
            ComponentError::TagNotFound {
                component: self.owner.clone(),
                kind: "cell",
                tag: tag.to_owned(),
            }
            .into()
        })
    }

    /// The `index`-th cell under `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is unknown or the index out of range.
    pub fn get(&self, tag: &str, index: usize) -> Result<CellId> {
        let list = self.all(tag)?;
        list.get(index).copied().ok_or_else(|| {
            ComponentError::IndexOutOfRange {
                component: self.owner.clone(),
                kind: "cell",
                index,
                len: list.len(),
            }
            .into()
        })
    }

    /// The first cell under `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing was registered under `tag`.
    pub fn first(&self, tag: &str) -> Result<CellId> {
        self.get(tag, 0)
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.cells.contains_key(tag)
    }

    /// Iterates over `(tag, cells)` in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CellId])> {
        self.cells.iter().map(|(t, c)| (t.as_str(), c.as_slice()))
    }
}

/// Tagged surfaces of one component, such as `"outerPipe"`.
#[derive(Debug, Clone, Default)]
pub struct NamedSurfaces {
    owner: String,
    surfaces: BTreeMap<String, SignedSurface>,
}

impl NamedSurfaces {
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            surfaces: BTreeMap::new(),
        }
    }

    /// Registers a tagged surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag already exists.
    pub fn add(&mut self, tag: impl Into<String>, s: SignedSurface) -> Result<()> {
        let tag = tag.into();
        if self.surfaces.contains_key(&tag) {
            return Err(ComponentError::DuplicateTag {
                component: self.owner.clone(),
                kind: "surface",
                tag,
            }
            .into());
        }
        self.surfaces.insert(tag, s);
        Ok(())
    }

    /// Looks up a tagged surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is unknown.
    pub fn get(&self, tag: &str) -> Result<SignedSurface> {
        self.surfaces.get(tag).copied().ok_or_else(|| {
            ComponentError::TagNotFound {
                component: self.owner.clone(),
                kind: "surface",
                tag: tag.to_owned(),
            }
            .into()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::BeamcsgError;

    #[test]
    fn cells_append_under_tag() {
        let mut cells = NamedCells::new("tube");
        cells.add("Port", CellId::new(4));
        cells.add("Port", CellId::new(9));
        assert_eq!(cells.all("Port").unwrap(), &[CellId::new(4), CellId::new(9)]);
        assert_eq!(cells.get("Port", 1).unwrap(), CellId::new(9));
        assert_eq!(cells.first("Port").unwrap(), CellId::new(4));
    }

    #[test]
    fn out_of_range_cell_index_is_fatal() {
        let mut cells = NamedCells::new("tube");
        cells.add("Void", CellId::new(1));
        assert!(matches!(
            cells.get("Void", 2).unwrap_err(),
            BeamcsgError::Component(ComponentError::IndexOutOfRange { index: 2, len: 1, .. })
        ));
        assert!(cells.get("Wall", 0).is_err());
    }

    #[test]
    fn surfaces_are_write_once() {
        let mut surfaces = NamedSurfaces::new("pipe");
        let s = SignedSurface::new(-10017).unwrap();
        surfaces.add("outerPipe", s).unwrap();
        assert_eq!(surfaces.get("outerPipe").unwrap(), s);
        assert!(surfaces.add("outerPipe", s).is_err());
        assert!(surfaces.get("innerPipe").is_err());
    }
}
