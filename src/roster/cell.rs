//! Typed roster cells.
//!
//! A roster field may be stored as text, a number or a boolean depending on
//! who edited the file last. `Cell` keeps the kind next to the payload and
//! offers the two coercions the reconciler relies on: to display text and to
//! an optional integer id.
//!
//! Kinds are only inferred from canonical spellings, so every field read from
//! the roster file is written back byte for byte. `007`, `TRUE`, `1.50` or
//! `+5` stay text.

use std::fmt;

/// A single cell of the roster table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Text(String),
    Integer(i64),
    Numeric(f64),
    Boolean(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn number(value: i64) -> Self {
        Cell::Integer(value)
    }

    /// Infer the cell kind from a raw field of the roster file.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" => return Cell::Blank,
            "true" => return Cell::Boolean(true),
            "false" => return Cell::Boolean(false),
            _ => {}
        }
        if !looks_numeric(raw) {
            return Cell::Text(raw.to_string());
        }
        if let Ok(value) = raw.parse::<i64>() {
            if value.to_string() == raw {
                return Cell::Integer(value);
            }
        } else if let Ok(value) = raw.parse::<f64>() {
            if value.is_finite() && value.fract() != 0.0 && value.to_string() == raw {
                return Cell::Numeric(value);
            }
        }
        Cell::Text(raw.to_string())
    }

    /// Text content of the cell: text trimmed, numbers truncated to integers,
    /// booleans as `true`/`false`, blanks empty.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Integer(n) => n.to_string(),
            Cell::Numeric(n) => (n.trunc() as i64).to_string(),
            Cell::Boolean(b) => b.to_string(),
            Cell::Blank => String::new(),
        }
    }

    /// Integer content of the cell. Unparsable text yields `None`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Integer(n) => Some(*n),
            Cell::Numeric(n) => Some(n.trunc() as i64),
            Cell::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Raw text, only for text cells.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for blank cells and text cells holding only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Field representation written back to the roster file.
    pub fn to_field(&self) -> String {
        match self {
            Cell::Blank => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Integer(n) => n.to_string(),
            Cell::Numeric(n) => n.to_string(),
            Cell::Boolean(b) => b.to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_field())
    }
}

// `f64::from_str` also accepts "inf", "NaN" and surrounding garbage we do not
// want to reinterpret, so only plain decimal notation counts.
fn looks_numeric(raw: &str) -> bool {
    let mut has_digit = false;
    for ch in raw.chars() {
        match ch {
            '0'..='9' => has_digit = true,
            '-' | '.' => {}
            _ => return false,
        }
    }
    has_digit
}
