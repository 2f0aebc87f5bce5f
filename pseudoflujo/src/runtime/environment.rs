use std::collections::HashMap;

use super::value::Value;
use crate::error::EvalError;

/// Flat variable table shared by every block of one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    variables: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<&Value, EvalError> {
        self.variables
            .get(name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables sorted by name.
    pub fn variables(&self) -> Vec<(&str, &Value)> {
        let mut list: Vec<_> = self
            .variables
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        list.sort_by(|a, b| a.0.cmp(b.0));
        list
    }
}
