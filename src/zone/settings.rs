use crate::error::Result;
use crate::math::MATCH_TOL;
use crate::registry::{MaterialId, VOID};
use crate::vars::VariableStore;

/// Numeric policy of a zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSettings {
    /// Separations below this are degenerate placements.
    pub zero_tol: f64,
    /// Allowed deviation between a carved span and the nominal length.
    pub length_tol: f64,
    /// Tolerance on `|n · axis|` when matching planes to an axis.
    pub axis_tol: f64,
    /// Material of carved and master cells.
    pub void_material: MaterialId,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            zero_tol: 1e-5,
            length_tol: 1e-3,
            axis_tol: MATCH_TOL,
            void_material: VOID,
        }
    }
}

impl ZoneSettings {
    /// Reads `{prefix}ZeroTol`, `{prefix}LengthTol`, `{prefix}AxisTol` and
    /// `{prefix}VoidMat`, keeping the defaults for absent entries.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry exists with the wrong kind.
    pub fn from_vars(vars: &VariableStore, prefix: &str) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            zero_tol: vars.eval_def_var(&format!("{prefix}ZeroTol"), d.zero_tol)?,
            length_tol: vars.eval_def_var(&format!("{prefix}LengthTol"), d.length_tol)?,
            axis_tol: vars.eval_def_var(&format!("{prefix}AxisTol"), d.axis_tol)?,
            void_material: vars.eval_def_var(&format!("{prefix}VoidMat"), d.void_material)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn absent_entries_keep_defaults() {
        let mut vars = VariableStore::new();
        vars.add_variable("lineLengthTol", 0.5);
        let s = ZoneSettings::from_vars(&vars, "line").unwrap();
        assert_relative_eq!(s.length_tol, 0.5);
        assert_relative_eq!(s.zero_tol, ZoneSettings::default().zero_tol);
    }

    #[test]
    fn wrong_kind_is_an_error() {
        let mut vars = VariableStore::new();
        vars.add_variable("lineZeroTol", "small");
        assert!(ZoneSettings::from_vars(&vars, "line").is_err());
    }
}
