//! Bound SQL literal values
//!
//! Query literals are never spliced into SQL text; they travel next to the
//! rendered statement as a parameter vector and are bound at execution time.

use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::ToSql;

/// A literal value destined for a `?` placeholder.
///
/// Unlike `Box<dyn ToSql>` this is `Clone` + `PartialEq`, which criteria
/// cloning (self-exclusion derivations) and planner tests both need.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Numeric reading of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.parse().ok(),
        }
    }

    /// Display form used for facet value labels.
    pub fn display(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            Self::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(s.as_str().into()),
        })
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<rusqlite::types::Value> for SqlValue {
    fn from(v: rusqlite::types::Value) -> Self {
        match v {
            Value::Integer(i) => Self::Int(i),
            Value::Real(f) => Self::Float(f),
            Value::Text(s) => Self::Text(s),
            Value::Blob(_) | Value::Null => Self::Text(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_f64() {
        assert_eq!(SqlValue::Int(7).as_f64(), Some(7.0));
        assert_eq!(SqlValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(SqlValue::Text("9".into()).as_f64(), Some(9.0));
        assert_eq!(SqlValue::Text("new".into()).as_f64(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlValue::Int(3).display(), "3");
        assert_eq!(SqlValue::Text("used".into()).display(), "used");
    }
}
