//! Typed parameter values for dynamic SQL
//!
//! Submissions arrive as strings. Reads also come back as strings (every
//! selected column is cast to text). Writes are the one place types matter:
//! PostgreSQL type-checks bound parameters, so each value is converted to a
//! typed [`SqlValue`] according to its column kind before binding.

use crate::error::{DynCrudError, Result};
use crate::schema::{Column, ColumnKind};

/// A typed SQL parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// 64-bit integer
    Int(i64),
    /// Double-precision float
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Text; also carries decimal/temporal/json/uuid/enum values, which the
    /// dialect casts server-side where needed
    Text(String),
}

/// A value paired with the column it binds to
#[derive(Debug, Clone)]
pub struct BoundValue {
    /// Target column name
    pub column: String,
    /// Target column kind (drives casts and typed NULLs)
    pub kind: ColumnKind,
    /// Raw SQL type name (cast target on PostgreSQL)
    pub sql_type: String,
    /// The value itself
    pub value: SqlValue,
}

/// Truthy form values for checkbox/boolean fields
const TRUTHY: [&str; 5] = ["1", "true", "on", "yes", "t"];
/// Falsy form values for checkbox/boolean fields
const FALSY: [&str; 5] = ["0", "false", "off", "no", "f"];

/// Interpret a form value as a boolean, `None` if it is neither
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    let lower = value.trim().to_ascii_lowercase();
    if TRUTHY.contains(&lower.as_str()) {
        Some(true)
    } else if FALSY.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Convert a submitted string to a bound value for its column
///
/// Returns `Ok(None)` when the value should be omitted from the statement so
/// the column default applies (empty input on a non-nullable column with a
/// default). Validation runs before coercion, so parse failures here indicate
/// a rule gap and surface as [`DynCrudError::Coerce`].
pub fn to_bound(column: &Column, raw: &str) -> Result<Option<BoundValue>> {
    let trimmed = raw.trim();

    let value = if trimmed.is_empty() {
        if column.kind.is_textual() && !column.nullable {
            SqlValue::Text(String::new())
        } else if column.nullable {
            SqlValue::Null
        } else {
            return Ok(None);
        }
    } else {
        match &column.kind {
            ColumnKind::Integer => {
                let n: i64 = trimmed.parse().map_err(|_| coerce_err(column, trimmed))?;
                SqlValue::Int(n)
            }
            ColumnKind::Float => {
                let f: f64 = trimmed.parse().map_err(|_| coerce_err(column, trimmed))?;
                SqlValue::Float(f)
            }
            ColumnKind::Boolean => match parse_bool(trimmed) {
                Some(b) => SqlValue::Bool(b),
                None => return Err(coerce_err(column, trimmed)),
            },
            // datetime-local inputs submit an ISO "T" separator
            ColumnKind::DateTime => SqlValue::Text(trimmed.replace('T', " ")),
            _ => SqlValue::Text(trimmed.to_string()),
        }
    };

    Ok(Some(BoundValue {
        column: column.name.clone(),
        kind: column.kind.clone(),
        sql_type: column.sql_type.clone(),
        value,
    }))
}

fn coerce_err(column: &Column, value: &str) -> DynCrudError {
    DynCrudError::Coerce {
        column: column.name.clone(),
        message: format!("`{value}` is not a valid {:?}", column.kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(kind: ColumnKind, nullable: bool) -> Column {
        Column {
            name: "c".into(),
            sql_type: "text".into(),
            kind,
            nullable,
            default: None,
            is_primary: false,
            max_length: None,
            meta: None,
        }
    }

    #[test]
    fn test_integer_coercion() {
        let bound = to_bound(&column(ColumnKind::Integer, false), "42").unwrap().unwrap();
        assert_eq!(bound.value, SqlValue::Int(42));
    }

    #[test]
    fn test_integer_garbage_fails() {
        assert!(to_bound(&column(ColumnKind::Integer, false), "4x").is_err());
    }

    #[test]
    fn test_boolean_truthiness() {
        let col = column(ColumnKind::Boolean, false);
        assert_eq!(to_bound(&col, "on").unwrap().unwrap().value, SqlValue::Bool(true));
        assert_eq!(to_bound(&col, "0").unwrap().unwrap().value, SqlValue::Bool(false));
        assert!(to_bound(&col, "maybe").is_err());
    }

    #[test]
    fn test_empty_nullable_becomes_null() {
        let bound = to_bound(&column(ColumnKind::Integer, true), "  ").unwrap().unwrap();
        assert_eq!(bound.value, SqlValue::Null);
    }

    #[test]
    fn test_empty_non_nullable_non_text_is_omitted() {
        assert!(to_bound(&column(ColumnKind::Integer, false), "").unwrap().is_none());
    }

    #[test]
    fn test_empty_text_not_nullable_stays_empty_string() {
        let bound = to_bound(&column(ColumnKind::Text, false), "").unwrap().unwrap();
        assert_eq!(bound.value, SqlValue::Text(String::new()));
    }

    #[test]
    fn test_datetime_local_separator_normalized() {
        let bound = to_bound(&column(ColumnKind::DateTime, true), "2024-03-01T09:30")
            .unwrap()
            .unwrap();
        assert_eq!(bound.value, SqlValue::Text("2024-03-01 09:30".into()));
    }

    #[test]
    fn test_decimal_stays_textual() {
        let bound = to_bound(&column(ColumnKind::Decimal, true), "19.99").unwrap().unwrap();
        assert_eq!(bound.value, SqlValue::Text("19.99".into()));
    }
}
