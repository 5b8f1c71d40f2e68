use std::fmt;

use crate::column_type::ColumnType;

/// A scalar read from a source row or returned by the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Null and empty text both count as "no value".
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Quote a string literal for PostgreSQL (standard_conforming_strings on).
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render `value` as a SQL literal for a column of type `ty`.
///
/// Every value written into a statement goes through here.
pub fn render_literal(value: &Value, ty: ColumnType) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) if ty.is_boolean() || ty.is_numeric() => render_bool(*b, ty),
        Value::Bool(b) => quote_literal(&b.to_string()),
        Value::Int(i) if ty.is_numeric() => i.to_string(),
        Value::Int(i) => quote_literal(&i.to_string()),
        Value::Float(x) => render_float(*x, ty),
        Value::Text(s) => render_text(s, ty),
    }
}

fn render_bool(b: bool, ty: ColumnType) -> String {
    if ty.is_numeric() {
        return if b { "1" } else { "0" }.to_string();
    }
    if b { "TRUE" } else { "FALSE" }.to_string()
}

fn render_float(x: f64, ty: ColumnType) -> String {
    if !x.is_finite() {
        let text = if x.is_nan() {
            "NaN"
        } else if x.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        };
        return quote_literal(text);
    }
    if ty.is_numeric() {
        x.to_string()
    } else {
        quote_literal(&x.to_string())
    }
}

fn render_text(s: &str, ty: ColumnType) -> String {
    let trimmed = s.trim();

    if ty.is_integer() {
        if let Ok(i) = trimmed.parse::<i64>() {
            return i.to_string();
        }
    } else if ty.is_numeric() {
        if let Ok(x) = trimmed.parse::<f64>() {
            if x.is_finite() {
                return trimmed.to_string();
            }
        }
    } else if ty.is_boolean() {
        if let Some(b) = parse_bool(trimmed) {
            return render_bool(b, ty);
        }
    }

    quote_literal(s)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
