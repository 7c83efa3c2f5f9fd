use std::fmt;

use tracing::warn;

/// A non-fatal consistency problem found during a build pass.
///
/// Warnings never change the output; they point an operator at accumulated
/// placement drift or collapsed placements.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyWarning {
    /// The span carved for a component differs from its nominal length, or
    /// the placement collapsed to nothing.
    LengthMismatch {
        component: String,
        expected: f64,
        actual: f64,
        collapsed: bool,
    },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch {
                component,
                expected,
                actual,
                collapsed,
            } => {
                write!(
                    f,
                    "length mismatch for {component}: expected {expected}, carved {actual}"
                )?;
                if *collapsed {
                    f.write_str(" (collapsed placement)")?;
                }
                Ok(())
            }
        }
    }
}

/// Collected warnings of one build pass.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<ConsistencyWarning>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and forwards it to the log.
    pub fn warn(&mut self, warning: ConsistencyWarning) {
        warn!(%warning, "consistency check failed");
        self.warnings.push(warning);
    }

    #[must_use]
    pub fn warnings(&self) -> &[ConsistencyWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
