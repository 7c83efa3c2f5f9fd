use std::collections::HashMap;

use crate::error::{Result, VariableError};
use crate::math::Vector3;

/// A value in the variable database.
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Number(f64),
    Integer(i64),
    Text(String),
    Vector(Vector3),
}

impl From<f64> for Variable {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for Variable {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<usize> for Variable {
    fn from(v: usize) -> Self {
        Self::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Variable {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Variable {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vector3> for Variable {
    fn from(v: Vector3) -> Self {
        Self::Vector(v)
    }
}

/// Conversion out of a stored [`Variable`].
pub trait FromVariable: Sized {
    /// Name of the expected kind, used in error messages.
    const KIND: &'static str;

    fn from_variable(value: &Variable) -> Option<Self>;
}

impl FromVariable for f64 {
    const KIND: &'static str = "number";

    #[allow(clippy::cast_precision_loss)]
    fn from_variable(value: &Variable) -> Option<Self> {
        match value {
            Variable::Number(v) => Some(*v),
            Variable::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromVariable for i64 {
    const KIND: &'static str = "integer";

    fn from_variable(value: &Variable) -> Option<Self> {
        match value {
            Variable::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromVariable for usize {
    const KIND: &'static str = "non-negative integer";

    fn from_variable(value: &Variable) -> Option<Self> {
        match value {
            Variable::Integer(v) => usize::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromVariable for u32 {
    const KIND: &'static str = "non-negative integer";

    fn from_variable(value: &Variable) -> Option<Self> {
        match value {
            Variable::Integer(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromVariable for bool {
    const KIND: &'static str = "flag";

    fn from_variable(value: &Variable) -> Option<Self> {
        match value {
            Variable::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl FromVariable for String {
    const KIND: &'static str = "string";

    fn from_variable(value: &Variable) -> Option<Self> {
        match value {
            Variable::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromVariable for Vector3 {
    const KIND: &'static str = "vector";

    fn from_variable(value: &Variable) -> Option<Self> {
        match value {
            Variable::Vector(v) => Some(*v),
            _ => None,
        }
    }
}

/// Named configuration values consulted by components at populate time.
///
/// Lookups are pure; a missing required variable is fatal.
#[derive(Debug, Default, Clone)]
pub struct VariableStore {
    vars: HashMap<String, Variable>,
}

impl VariableStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a variable.
    pub fn add_variable(&mut self, name: impl Into<String>, value: impl Into<Variable>) {
        self.vars.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Looks up a required variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is missing or has the wrong kind.
    pub fn eval_var<T: FromVariable>(&self, name: &str) -> Result<T> {
        let value = self
            .vars
            .get(name)
            .ok_or_else(|| VariableError::Missing(name.to_owned()))?;
        convert(name, value)
    }

    /// Looks up an optional variable, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable exists with the wrong kind.
    pub fn eval_def_var<T: FromVariable>(&self, name: &str, default: T) -> Result<T> {
        match self.vars.get(name) {
            Some(value) => convert(name, value),
            None => Ok(default),
        }
    }

    /// Looks up `primary`, then `fallback`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither exists or the found one has the wrong kind.
    pub fn eval_pair<T: FromVariable>(&self, primary: &str, fallback: &str) -> Result<T> {
        if self.vars.contains_key(primary) {
            self.eval_var(primary)
        } else {
            self.eval_var(fallback)
        }
    }
}

fn convert<T: FromVariable>(name: &str, value: &Variable) -> Result<T> {
    T::from_variable(value).ok_or_else(|| {
        VariableError::TypeMismatch {
            name: name.to_owned(),
            expected: T::KIND,
        }
        .into()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::BeamcsgError;

    fn store() -> VariableStore {
        let mut vars = VariableStore::new();
        vars.add_variable("PipeLength", 10.0);
        vars.add_variable("PipeNPorts", 2_i64);
        vars.add_variable("PipeName", "drift");
        vars.add_variable("PortAxis", Vector3::x());
        vars
    }

    #[test]
    fn eval_var_reads_kinds() {
        let vars = store();
        assert!((vars.eval_var::<f64>("PipeLength").unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(vars.eval_var::<usize>("PipeNPorts").unwrap(), 2);
        assert_eq!(vars.eval_var::<String>("PipeName").unwrap(), "drift");
        assert_eq!(vars.eval_var::<Vector3>("PortAxis").unwrap(), Vector3::x());
    }

    #[test]
    fn integer_promotes_to_number() {
        assert!((store().eval_var::<f64>("PipeNPorts").unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn missing_required_variable_is_fatal() {
        let err = store().eval_var::<f64>("PipeRadius").unwrap_err();
        assert!(matches!(err, BeamcsgError::Variable(VariableError::Missing(ref n)) if n == "PipeRadius"));
    }

    #[test]
    fn wrong_kind_is_reported() {
        let err = store().eval_var::<f64>("PipeName").unwrap_err();
        assert!(matches!(
            err,
            BeamcsgError::Variable(VariableError::TypeMismatch { expected: "number", .. })
        ));
    }

    #[test]
    fn default_used_only_when_absent() {
        let vars = store();
        assert!((vars.eval_def_var("PipeRadius", 4.0).unwrap() - 4.0).abs() < 1e-12);
        assert!((vars.eval_def_var("PipeLength", 4.0).unwrap() - 10.0).abs() < 1e-12);
        assert!(vars.eval_def_var("PipeName", 1.0).is_err());
    }

    #[test]
    fn pair_falls_back() {
        let vars = store();
        let v: f64 = vars.eval_pair("DriftLength", "PipeLength").unwrap();
        assert!((v - 10.0).abs() < 1e-12);
        assert!(vars.eval_pair::<f64>("A", "B").is_err());
    }
}
