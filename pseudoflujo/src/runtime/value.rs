use std::fmt;

use serde::Serialize;

use crate::ir::ast::format_decimal;

/// Runtime value. Types are only checked when an operator meets its operands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Text(String),
}

impl Value {
    /// Type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "ENTERO",
            Value::Decimal(_) => "DECIMAL",
            Value::Boolean(_) => "LOGICO",
            Value::Text(_) => "CADENA",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Converts a raw LEER answer: `VERDADERO`/`FALSO` become booleans,
    /// numerals become numbers, anything else stays text.
    pub fn from_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "VERDADERO" => return Value::Boolean(true),
            "FALSO" => return Value::Boolean(false),
            _ => {}
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Integer(n);
        }
        let numeric = trimmed.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+')
            && trimmed.chars().any(|c| c.is_ascii_digit());
        match trimmed.parse::<f64>() {
            Ok(d) if numeric && d.is_finite() => Value::Decimal(d),
            _ => Value::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{}", format_decimal(*d)),
            Value::Boolean(true) => write!(f, "VERDADERO"),
            Value::Boolean(false) => write!(f, "FALSO"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}
