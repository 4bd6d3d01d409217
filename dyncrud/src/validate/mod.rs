//! Validation engine: per-field rules derived from the schema
//!
//! Rules come from three places, in increasing precedence: the column kind
//! (type checks), the catalog (nullability, character length), and the JSON
//! metadata in the column comment (field-type overrides, explicit bounds,
//! patterns, custom messages). Validation collects every failure instead of
//! stopping at the first.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use validator::{ValidateEmail, ValidateUrl};

use crate::crud::FormData;
use crate::db::parse_bool;
use crate::schema::{ColumnKind, TableSchema};

/// Per-field validation failures, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// No failures recorded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any failure was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields with failures
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Record a failure for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    /// Failures for one field
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.errors.get(field).map_or(&[], Vec::as_slice)
    }

    /// First failure for one field, if any
    #[must_use]
    pub fn first(&self, field: &str) -> Option<&str> {
        self.field(field).first().map(String::as_str)
    }

    /// Iterate over `(field, messages)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Fold another error set into this one
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A single validation rule
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// Value must be present and non-empty
    Required,
    /// Value must parse as a whole number
    Integer,
    /// Value must parse as a number
    Numeric,
    /// Value must be a recognized boolean form value
    Boolean,
    /// Value must be a `YYYY-MM-DD` date
    Date,
    /// Value must be a `HH:MM[:SS]` time
    Time,
    /// Value must be an ISO date and time
    DateTime,
    /// Value must be well-formed JSON
    Json,
    /// Value must be a UUID
    Uuid,
    /// Value must be an email address
    Email,
    /// Value must be a URL
    Url,
    /// Minimum length in characters
    MinLength(u32),
    /// Maximum length in characters
    MaxLength(u32),
    /// Minimum numeric value
    Min(f64),
    /// Maximum numeric value
    Max(f64),
    /// Value must match the pattern
    Pattern(Regex),
    /// Value must be one of the listed options
    OneOf(Vec<String>),
}

/// Rules and messaging for one field
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    /// Display label used in generated messages
    pub label: String,
    /// Rules applied in order
    pub rules: Vec<FieldRule>,
    /// Message that replaces every generated message for this field
    pub message: Option<String>,
}

/// Validates submissions against schema-derived rules
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    fields: BTreeMap<String, FieldRules>,
}

impl ValidationEngine {
    /// Empty engine
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive rules for every input column of a schema
    #[must_use]
    pub fn from_schema(schema: &TableSchema) -> Self {
        let mut engine = Self::new();

        for column in schema.input_columns() {
            let meta = column.meta.as_ref();
            let mut rules = Vec::new();

            let required = meta
                .and_then(|m| m.required)
                .unwrap_or(!column.nullable && column.default.is_none());
            if required {
                rules.push(FieldRule::Required);
            }

            // File columns hold storage paths written by the upload step;
            // only presence is checked here.
            if !column.is_file() {
                match &column.kind {
                    ColumnKind::Integer => rules.push(FieldRule::Integer),
                    ColumnKind::Float | ColumnKind::Decimal => rules.push(FieldRule::Numeric),
                    ColumnKind::Boolean => rules.push(FieldRule::Boolean),
                    ColumnKind::Date => rules.push(FieldRule::Date),
                    ColumnKind::Time => rules.push(FieldRule::Time),
                    ColumnKind::DateTime => rules.push(FieldRule::DateTime),
                    ColumnKind::Json => rules.push(FieldRule::Json),
                    ColumnKind::Uuid => rules.push(FieldRule::Uuid),
                    ColumnKind::Enum(values) => rules.push(FieldRule::OneOf(values.clone())),
                    ColumnKind::Text | ColumnKind::Binary => {}
                }

                match column.meta_type() {
                    Some("email") => rules.push(FieldRule::Email),
                    Some("url") => rules.push(FieldRule::Url),
                    _ => {}
                }

                if let Some(options) = meta.and_then(|m| m.options.as_ref()) {
                    rules.push(FieldRule::OneOf(options.clone()));
                }

                if let Some(max) = column.max_length {
                    rules.push(FieldRule::MaxLength(max));
                }
            }

            let mut message = None;
            if let Some(validation) = meta.and_then(|m| m.validation.as_ref()) {
                if let Some(min) = validation.min_length {
                    rules.push(FieldRule::MinLength(min));
                }
                if let Some(max) = validation.max_length {
                    rules.push(FieldRule::MaxLength(max));
                }
                if let Some(min) = validation.min {
                    rules.push(FieldRule::Min(min));
                }
                if let Some(max) = validation.max {
                    rules.push(FieldRule::Max(max));
                }
                if let Some(pattern) = &validation.pattern {
                    match Regex::new(pattern) {
                        Ok(re) => rules.push(FieldRule::Pattern(re)),
                        Err(e) => tracing::warn!(
                            column = %column.name,
                            error = %e,
                            "ignoring invalid validation pattern"
                        ),
                    }
                }
                message = validation.message.clone();
            }

            engine.fields.insert(
                column.name.clone(),
                FieldRules {
                    label: column.label(),
                    rules,
                    message,
                },
            );
        }

        engine
    }

    /// Add or extend rules for a field
    pub fn add_rule(&mut self, field: impl Into<String>, rule: FieldRule) -> &mut Self {
        let field = field.into();
        let entry = self.fields.entry(field.clone()).or_insert_with(|| FieldRules {
            label: crate::schema::humanize(&field),
            ..FieldRules::default()
        });
        entry.rules.push(rule);
        self
    }

    /// Rules currently registered for a field
    #[must_use]
    pub fn rules(&self, field: &str) -> Option<&FieldRules> {
        self.fields.get(field)
    }

    /// Validate a submission, collecting every failure
    pub fn validate(&self, data: &FormData) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (name, field) in &self.fields {
            let value = data.get(name).map(|v| v.trim()).unwrap_or_default();

            if value.is_empty() {
                if field.rules.iter().any(|r| matches!(r, FieldRule::Required)) {
                    errors.add(name, field.message(format!("{} is required", field.label)));
                }
                continue;
            }

            for rule in &field.rules {
                if let Some(message) = check(rule, value, &field.label) {
                    errors.add(name, field.message(message));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl FieldRules {
    fn message(&self, generated: String) -> String {
        self.message.clone().unwrap_or(generated)
    }
}

/// Apply one rule to a non-empty value, returning the failure message
fn check(rule: &FieldRule, value: &str, label: &str) -> Option<String> {
    match rule {
        FieldRule::Required => None,
        FieldRule::Integer => value
            .parse::<i64>()
            .is_err()
            .then(|| format!("{label} must be a whole number")),
        FieldRule::Numeric => value
            .parse::<f64>()
            .is_err()
            .then(|| format!("{label} must be a number")),
        FieldRule::Boolean => parse_bool(value)
            .is_none()
            .then(|| format!("{label} must be a boolean value")),
        FieldRule::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .is_err()
            .then(|| format!("{label} must be a date (YYYY-MM-DD)")),
        FieldRule::Time => {
            let ok = NaiveTime::parse_from_str(value, "%H:%M:%S").is_ok()
                || NaiveTime::parse_from_str(value, "%H:%M").is_ok();
            (!ok).then(|| format!("{label} must be a time (HH:MM)"))
        }
        FieldRule::DateTime => {
            const FORMATS: [&str; 4] = [
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%dT%H:%M",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%d %H:%M",
            ];
            let ok = FORMATS
                .iter()
                .any(|f| NaiveDateTime::parse_from_str(value, f).is_ok());
            (!ok).then(|| format!("{label} must be a date and time"))
        }
        FieldRule::Json => serde_json::from_str::<serde_json::Value>(value)
            .is_err()
            .then(|| format!("{label} must be valid JSON")),
        FieldRule::Uuid => uuid::Uuid::try_parse(value)
            .is_err()
            .then(|| format!("{label} must be a UUID")),
        FieldRule::Email => (!value.validate_email()).then(|| format!("{label} must be a valid email address")),
        FieldRule::Url => (!value.validate_url()).then(|| format!("{label} must be a valid URL")),
        FieldRule::MinLength(min) => {
            let len = value.chars().count();
            (len < *min as usize).then(|| format!("{label} must be at least {min} characters"))
        }
        FieldRule::MaxLength(max) => {
            let len = value.chars().count();
            (len > *max as usize).then(|| format!("{label} must be at most {max} characters"))
        }
        FieldRule::Min(min) => match value.parse::<f64>() {
            Ok(n) if n < *min => Some(format!("{label} must be at least {min}")),
            _ => None,
        },
        FieldRule::Max(max) => match value.parse::<f64>() {
            Ok(n) if n > *max => Some(format!("{label} must be at most {max}")),
            _ => None,
        },
        FieldRule::Pattern(re) => (!re.is_match(value)).then(|| format!("{label} has an invalid format")),
        FieldRule::OneOf(options) => (!options.iter().any(|o| o == value))
            .then(|| format!("{label} must be one of: {}", options.join(", "))),
    }
}
