//! Table schema model and introspection
//!
//! The schema model is what the rest of the crate consumes: the validation
//! engine derives rules from it, the form generator derives inputs from it,
//! and the CRUD handler derives its SQL from it. Schemas are produced by
//! dialect-specific catalog queries (see [`crate::db`]) and optionally cached
//! (see [`cache`]).

pub mod analyzer;
pub mod cache;

pub use analyzer::SchemaAnalyzer;
#[cfg(feature = "redis")]
pub use cache::RedisSchemaCache;
pub use cache::{MemorySchemaCache, SchemaCache};

use serde::{Deserialize, Serialize};

/// Parsed category of a SQL column type
///
/// Raw type names differ across dialects; the kind is what drives field-type
/// mapping and validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer types (int, bigint, smallint, serial)
    Integer,
    /// Floating point types (float, double, real)
    Float,
    /// Fixed-precision types (decimal, numeric)
    Decimal,
    /// Boolean (PostgreSQL boolean, MySQL tinyint(1))
    Boolean,
    /// Character data (char, varchar, text)
    Text,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time (datetime, timestamp)
    DateTime,
    /// JSON documents (json, jsonb)
    Json,
    /// Binary data (blob, bytea)
    Binary,
    /// Enumerated type with its allowed values
    Enum(Vec<String>),
    /// UUID (PostgreSQL native type)
    Uuid,
}

impl ColumnKind {
    /// Whether values of this kind are rendered and submitted as free text
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::Text | Self::Json | Self::Uuid)
    }
}

/// A single table column as read from the database catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Raw type name as reported by the catalog
    pub sql_type: String,
    /// Parsed type category
    pub kind: ColumnKind,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Default expression, if any
    pub default: Option<String>,
    /// Whether the column is (part of) the primary key
    pub is_primary: bool,
    /// Character maximum length for bounded text types
    pub max_length: Option<u32>,
    /// UI metadata parsed from the column comment
    pub meta: Option<ColumnMeta>,
}

impl Column {
    /// Effective form label: metadata label, else humanized column name
    #[must_use]
    pub fn label(&self) -> String {
        if let Some(label) = self.meta.as_ref().and_then(|m| m.label.clone()) {
            return label;
        }
        humanize(&self.name)
    }

    /// Field-type override from metadata (`email`, `password`, `file`, ...)
    #[must_use]
    pub fn meta_type(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.field_type.as_deref())
    }

    /// Whether this column stores an uploaded file path
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.meta_type() == Some("file")
    }
}

/// Table schema: name, primary key, ordered columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub table: String,
    /// Primary key column name
    pub primary_key: String,
    /// Columns in catalog order
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Look up a column by name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that accept form input (everything except the primary key and
    /// binary columns without a `file` override)
    pub fn input_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| !c.is_primary && (c.kind != ColumnKind::Binary || c.is_file()))
    }

    /// Text-like columns, used for LIKE search in list views
    pub fn searchable_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| matches!(c.kind, ColumnKind::Text | ColumnKind::Enum(_)))
    }
}

/// UI metadata carried in a column comment
///
/// A comment that parses as a JSON object is interpreted as configuration;
/// any other non-empty comment is treated as a plain label. Unknown JSON keys
/// are ignored so application-specific metadata can share the channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMeta {
    /// Field-type override: `email`, `password`, `file`, `hidden`,
    /// `textarea`, `url`, `tel`, `color`, `search`
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    /// Label override
    pub label: Option<String>,
    /// Placeholder text
    pub placeholder: Option<String>,
    /// Help text shown with the field
    pub help: Option<String>,
    /// Required override (takes precedence over nullability)
    pub required: Option<bool>,
    /// Select options override
    pub options: Option<Vec<String>>,
    /// Validation rule overrides
    pub validation: Option<MetaValidation>,
    /// Allowed MIME types for `file` columns
    pub allowed_mimes: Option<Vec<String>>,
    /// Maximum upload size in bytes for `file` columns
    pub max_size: Option<u64>,
    /// Maximum number of files for multi-upload `file` columns
    pub max_files: Option<u32>,
}

impl ColumnMeta {
    /// Parse a raw column comment into metadata
    ///
    /// Returns `None` for empty comments.
    #[must_use]
    pub fn parse(comment: &str) -> Option<Self> {
        let comment = comment.trim();
        if comment.is_empty() {
            return None;
        }
        if comment.starts_with('{') {
            if let Ok(meta) = serde_json::from_str::<Self>(comment) {
                return Some(meta);
            }
        }
        Some(Self {
            label: Some(comment.to_string()),
            ..Self::default()
        })
    }
}

/// Validation overrides embedded in column metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaValidation {
    /// Minimum numeric value
    pub min: Option<f64>,
    /// Maximum numeric value
    pub max: Option<f64>,
    /// Minimum string length
    pub min_length: Option<u32>,
    /// Maximum string length
    pub max_length: Option<u32>,
    /// Regular expression the value must match
    pub pattern: Option<String>,
    /// Message reported instead of the rule default
    pub message: Option<String>,
}

/// Turn a `snake_case` column name into a display label
#[must_use]
pub fn humanize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, part) in name.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if i == 0 {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        } else {
            out.push_str(part);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, kind: ColumnKind) -> Column {
        Column {
            name: name.into(),
            sql_type: "text".into(),
            kind,
            nullable: true,
            default: None,
            is_primary: false,
            max_length: None,
            meta: None,
        }
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("first_name"), "First name");
        assert_eq!(humanize("email"), "Email");
        assert_eq!(humanize("created_at"), "Created at");
    }

    #[test]
    fn test_meta_parse_json() {
        let meta = ColumnMeta::parse(r#"{"type": "email", "label": "E-mail"}"#).unwrap();
        assert_eq!(meta.field_type.as_deref(), Some("email"));
        assert_eq!(meta.label.as_deref(), Some("E-mail"));
    }

    #[test]
    fn test_meta_parse_plain_comment_is_label() {
        let meta = ColumnMeta::parse("Customer name").unwrap();
        assert_eq!(meta.label.as_deref(), Some("Customer name"));
        assert!(meta.field_type.is_none());
    }

    #[test]
    fn test_meta_parse_empty() {
        assert!(ColumnMeta::parse("  ").is_none());
    }

    #[test]
    fn test_meta_parse_malformed_json_falls_back_to_label() {
        let meta = ColumnMeta::parse("{not json").unwrap();
        assert_eq!(meta.label.as_deref(), Some("{not json"));
    }

    #[test]
    fn test_meta_ignores_unknown_keys() {
        let meta = ColumnMeta::parse(r#"{"type": "file", "x_custom": 1}"#).unwrap();
        assert_eq!(meta.field_type.as_deref(), Some("file"));
    }

    #[test]
    fn test_column_label_prefers_meta() {
        let mut col = column("full_name", ColumnKind::Text);
        assert_eq!(col.label(), "Full name");
        col.meta = Some(ColumnMeta {
            label: Some("Name".into()),
            ..ColumnMeta::default()
        });
        assert_eq!(col.label(), "Name");
    }

    #[test]
    fn test_input_columns_skip_pk_and_binary() {
        let mut pk = column("id", ColumnKind::Integer);
        pk.is_primary = true;
        let schema = TableSchema {
            table: "files".into(),
            primary_key: "id".into(),
            columns: vec![pk, column("name", ColumnKind::Text), column("raw", ColumnKind::Binary)],
        };
        let names: Vec<_> = schema.input_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name"]);
    }
}
