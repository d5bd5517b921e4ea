use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// Optional sign, digits with optional `,` thousands groups.
static INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d{1,3}(,\d{3})+|\d+)$").expect("integer pattern"));
static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d{1,3}(,\d{3})+|\d+)?\.\d+([eE][+-]?\d+)?$|^[+-]?\d+[eE][+-]?\d+$")
        .expect("float pattern")
});

/// A single table value after coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Coerce cleaned cell text: empty, then integer, then float, else text.
    pub fn coerce(raw: &str) -> Cell {
        let s = raw.trim();
        if s.is_empty() {
            return Cell::Empty;
        }
        if INTEGER.is_match(s) {
            let digits = s.replace(',', "");
            return match digits.parse::<i64>() {
                Ok(v) => Cell::Int(v),
                // too wide for i64
                Err(_) => digits
                    .parse::<f64>()
                    .map_or_else(|_| Cell::Text(s.to_string()), Cell::Float),
            };
        }
        if FLOAT.is_match(s) {
            if let Ok(v) = s.replace(',', "").parse::<f64>() {
                return Cell::Float(v);
            }
        }
        Cell::Text(s.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(v) => write!(f, "{}", v),
            // `{:?}` keeps the `.0` and switches to exponent form for large
            // values, so the text coerces back to a float.
            Cell::Float(v) => write!(f, "{:?}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}
