use std::collections::BTreeMap;

use crate::rule::HeadRule;

/// Name of the entry cut.
pub const FRONT: &str = "front";

/// Name of the exit cut.
pub const BACK: &str = "back";

/// Boundaries imposed on a component from outside.
///
/// A component that has a `front` cut uses it instead of building its own
/// entry plane, so that its first face is exactly the previous component's
/// exit face.
#[derive(Debug, Clone, Default)]
pub struct ExternalCut {
    cuts: BTreeMap<String, HeadRule>,
}

impl ExternalCut {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) a named cut.
    pub fn set_cut(&mut self, name: impl Into<String>, rule: HeadRule) {
        self.cuts.insert(name.into(), rule);
    }

    #[must_use]
    pub fn cut(&self, name: &str) -> Option<&HeadRule> {
        self.cuts.get(name)
    }

    #[must_use]
    pub fn has_cut(&self, name: &str) -> bool {
        self.cuts.contains_key(name)
    }

    pub fn set_front(&mut self, rule: HeadRule) {
        self.set_cut(FRONT, rule);
    }

    pub fn set_back(&mut self, rule: HeadRule) {
        self.set_cut(BACK, rule);
    }

    #[must_use]
    pub fn front(&self) -> Option<&HeadRule> {
        self.cut(FRONT)
    }

    #[must_use]
    pub fn back(&self) -> Option<&HeadRule> {
        self.cut(BACK)
    }
}
