//! Form generation from a table schema
//!
//! Maps column kinds to HTML controls, layers metadata overrides on top, and
//! pre-populates values from an existing record when editing.

use super::builder::FormBuilder;
use super::field::{FormField, InputType, SelectOption};
use super::virtual_field::VirtualField;
use crate::db::Record;
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::validate::ValidationErrors;

/// Generates an HTML form for a table schema
///
/// # Examples
///
/// ```rust,no_run
/// use dyncrud::forms::FormGenerator;
/// # fn demo(schema: &dyncrud::schema::TableSchema) {
/// let html = FormGenerator::new(schema)
///     .action("/contacts")
///     .csrf_token("token")
///     .render();
/// # }
/// ```
#[derive(Debug)]
pub struct FormGenerator<'a> {
    schema: &'a TableSchema,
    values: Option<&'a Record>,
    errors: Option<&'a ValidationErrors>,
    virtual_fields: &'a [VirtualField],
    csrf_token: Option<String>,
    action: String,
    method: String,
    submit_text: Option<String>,
}

impl<'a> FormGenerator<'a> {
    /// Create a generator for a schema
    #[must_use]
    pub fn new(schema: &'a TableSchema) -> Self {
        Self {
            schema,
            values: None,
            errors: None,
            virtual_fields: &[],
            csrf_token: None,
            action: String::new(),
            method: "POST".into(),
            submit_text: None,
        }
    }

    /// Pre-populate inputs from an existing record (edit mode)
    ///
    /// Edit mode also renders the primary key as a hidden field.
    #[must_use]
    pub const fn values(mut self, record: &'a Record) -> Self {
        self.values = Some(record);
        self
    }

    /// Render validation errors inline
    #[must_use]
    pub const fn errors(mut self, errors: &'a ValidationErrors) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Append virtual fields after the column fields
    #[must_use]
    pub const fn virtual_fields(mut self, fields: &'a [VirtualField]) -> Self {
        self.virtual_fields = fields;
        self
    }

    /// Set the CSRF token rendered as a hidden field
    #[must_use]
    pub fn csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Set the form action URL
    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Set the submit button text
    #[must_use]
    pub fn submit(mut self, text: impl Into<String>) -> Self {
        self.submit_text = Some(text.into());
        self
    }

    /// Render the form to HTML
    #[must_use]
    pub fn render(self) -> String {
        let mut form = FormBuilder::new(self.action.clone(), self.method.clone());

        if let Some(token) = &self.csrf_token {
            form = form.csrf_token(token.clone());
        }
        if let Some(errors) = self.errors {
            form = form.errors(errors);
        }

        // Edit mode: carry the primary key through a hidden field.
        if let Some(pk_value) = self.record_value(&self.schema.primary_key) {
            form = form.hidden(self.schema.primary_key.clone(), pk_value);
        }

        for column in self.schema.input_columns() {
            let value = self.record_value(&column.name);
            form = form.add_field(column_field(column, value));
        }

        for vfield in self.virtual_fields {
            form = form.add_field(vfield.to_field(None));
        }

        let submit = self
            .submit_text
            .clone()
            .unwrap_or_else(|| if self.values.is_some() { "Update".into() } else { "Create".into() });
        form.submit(submit).build()
    }

    fn record_value(&self, column: &str) -> Option<String> {
        self.values.and_then(|r| r.get(column).cloned().flatten())
    }
}

/// Build the form field for one column
fn column_field(column: &Column, value: Option<String>) -> FormField {
    let required = column
        .meta
        .as_ref()
        .and_then(|m| m.required)
        .unwrap_or(!column.nullable && column.default.is_none());

    let mut field = match control_for(column) {
        Control::Input(input_type) => {
            let mut field = FormField::input(&column.name, input_type);
            field.value = match input_type {
                // Stored timestamps come back as "YYYY-MM-DD HH:MM:SS";
                // datetime-local wants the ISO "T" separator.
                InputType::DateTimeLocal => value.map(|v| v.replacen(' ', "T", 1)),
                _ => value,
            };
            if matches!(input_type, InputType::Number) {
                if !matches!(column.kind, ColumnKind::Integer) {
                    field.step = Some("any".into());
                }
            } else if let Some(max) = column.max_length {
                field.max_length = Some(max);
            }
            if input_type == InputType::File {
                field.accept = column
                    .meta
                    .as_ref()
                    .and_then(|m| m.allowed_mimes.as_ref())
                    .map(|mimes| mimes.join(","));
                field.multiple = column
                    .meta
                    .as_ref()
                    .and_then(|m| m.max_files)
                    .is_some_and(|n| n > 1);
            }
            field
        }
        Control::Textarea => {
            let mut field = FormField::textarea(&column.name);
            field.value = value;
            if let Some(max) = column.max_length {
                field.max_length = Some(max);
            }
            field
        }
        Control::Select(options) => {
            let options = options.into_iter().map(SelectOption::plain).collect();
            let mut field = FormField::select(&column.name, options);
            field.value = value;
            field
        }
        Control::Checkbox => {
            let mut field = FormField::checkbox(&column.name);
            field.value = value;
            field
        }
    };

    field.label = Some(column.label());
    // `required` on a checkbox would force it checked, which is not what
    // nullability means.
    field.required = required && !matches!(field.kind, super::field::FieldKind::Checkbox);

    if let Some(meta) = &column.meta {
        field.placeholder = meta.placeholder.clone();
        field.help_text = meta.help.clone();
        if let Some(validation) = &meta.validation {
            if let Some(min) = validation.min {
                field.min = Some(trim_float(min));
            }
            if let Some(max) = validation.max {
                field.max = Some(trim_float(max));
            }
            if let Some(min) = validation.min_length {
                field.min_length = Some(min);
            }
            if let Some(max) = validation.max_length {
                field.max_length = Some(max);
            }
            field.pattern.clone_from(&validation.pattern);
        }
    }

    field
}

enum Control {
    Input(InputType),
    Textarea,
    Select(Vec<String>),
    Checkbox,
}

/// Decide the control for a column: metadata override first, then kind
fn control_for(column: &Column) -> Control {
    if let Some(meta_type) = column.meta_type() {
        if meta_type == "textarea" {
            return Control::Textarea;
        }
        if let Some(input_type) = InputType::from_meta(meta_type) {
            return Control::Input(input_type);
        }
    }

    if let Some(options) = column.meta.as_ref().and_then(|m| m.options.clone()) {
        return Control::Select(options);
    }

    match &column.kind {
        ColumnKind::Boolean => Control::Checkbox,
        ColumnKind::Enum(values) => Control::Select(values.clone()),
        ColumnKind::Integer | ColumnKind::Float | ColumnKind::Decimal => {
            Control::Input(InputType::Number)
        }
        ColumnKind::Date => Control::Input(InputType::Date),
        ColumnKind::Time => Control::Input(InputType::Time),
        ColumnKind::DateTime => Control::Input(InputType::DateTimeLocal),
        ColumnKind::Json => Control::Textarea,
        ColumnKind::Text => {
            // Unbounded or generous text columns read better as textareas.
            if column.max_length.is_none_or(|max| max > 255) {
                Control::Textarea
            } else {
                Control::Input(InputType::Text)
            }
        }
        // Binary columns only appear here with a `file` override, which the
        // meta branch above already handled; render a file input regardless.
        ColumnKind::Binary | ColumnKind::Uuid => Control::Input(InputType::Text),
    }
}

fn trim_float(value: f64) -> String {
    if (value.fract()).abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMeta;

    fn column(name: &str, kind: ColumnKind, nullable: bool) -> Column {
        Column {
            name: name.into(),
            sql_type: "text".into(),
            kind,
            nullable,
            default: None,
            is_primary: false,
            max_length: None,
            meta: None,
        }
    }

    fn schema() -> TableSchema {
        let mut pk = column("id", ColumnKind::Integer, false);
        pk.is_primary = true;
        let mut email = column("email", ColumnKind::Text, false);
        email.max_length = Some(190);
        email.meta = ColumnMeta::parse(r#"{"type": "email"}"#);
        let mut body = column("body", ColumnKind::Text, true);
        body.max_length = None;
        TableSchema {
            table: "posts".into(),
            primary_key: "id".into(),
            columns: vec![
                pk,
                email,
                column("published", ColumnKind::Boolean, false),
                column(
                    "state",
                    ColumnKind::Enum(vec!["draft".into(), "live".into()]),
                    false,
                ),
                column("posted_at", ColumnKind::DateTime, true),
                body,
            ],
        }
    }

    #[test]
    fn test_generated_controls_match_kinds() {
        let schema = schema();
        let html = FormGenerator::new(&schema).csrf_token("tok").render();

        assert!(html.contains("<input type=\"email\" id=\"email\" name=\"email\""));
        assert!(html.contains("type=\"checkbox\" id=\"published\""));
        assert!(html.contains("<select id=\"state\" name=\"state\""));
        assert!(html.contains("<option value=\"draft\">draft</option>"));
        assert!(html.contains("type=\"datetime-local\""));
        assert!(html.contains("<textarea id=\"body\""));
        // Create mode: no hidden primary key field.
        assert!(!html.contains("name=\"id\""));
    }

    #[test]
    fn test_edit_mode_renders_hidden_pk_and_values() {
        let schema = schema();
        let mut record = Record::new();
        record.insert("id".into(), Some("7".into()));
        record.insert("email".into(), Some("a@example.com".into()));
        record.insert("posted_at".into(), Some("2024-03-01 09:30:00".into()));

        let html = FormGenerator::new(&schema).values(&record).render();
        assert!(html.contains("<input type=\"hidden\" name=\"id\" value=\"7\">"));
        assert!(html.contains("value=\"a@example.com\""));
        assert!(html.contains("value=\"2024-03-01T09:30:00\""));
        assert!(html.contains(">Update</button>"));
    }

    #[test]
    fn test_required_follows_nullability() {
        let schema = schema();
        let html = FormGenerator::new(&schema).render();
        assert!(html.contains("name=\"email\" required") || html.contains("name=\"email\" maxlength=\"190\" required"));
        // Nullable column is not required.
        assert!(!html.contains("id=\"posted_at\" name=\"posted_at\" required"));
    }

    #[test]
    fn test_virtual_fields_rendered_after_columns() {
        let schema = schema();
        let virtuals = [VirtualField::checkbox("terms_accepted").label("Accept terms").required()];
        let html = FormGenerator::new(&schema).virtual_fields(&virtuals).render();
        let terms_pos = html.find("terms_accepted").unwrap();
        let body_pos = html.find("id=\"body\"").unwrap();
        assert!(terms_pos > body_pos);
    }

    #[test]
    fn test_bounded_text_is_input_unbounded_is_textarea() {
        let mut short = column("code", ColumnKind::Text, true);
        short.max_length = Some(16);
        assert!(matches!(control_for(&short), Control::Input(InputType::Text)));
        let long = column("notes", ColumnKind::Text, true);
        assert!(matches!(control_for(&long), Control::Textarea));
    }
}
