//! Form builder API with fluent interface

use super::field::{FieldKind, FormField, InputType, SelectOption};
use super::render::FormRenderer;
use crate::validate::ValidationErrors;

/// Builder for constructing HTML forms
///
/// # Examples
///
/// ```rust
/// use dyncrud::forms::{FormBuilder, InputType};
///
/// let html = FormBuilder::new("/contacts", "POST")
///     .id("contact-form")
///     .csrf_token("abc123")
///     .field("email", InputType::Email)
///         .label("Email Address")
///         .required()
///         .done()
///     .submit("Save")
///     .build();
/// assert!(html.contains("type=\"email\""));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormBuilder<'a> {
    /// Form action URL
    pub(crate) action: String,
    /// HTTP method
    pub(crate) method: String,
    /// Form id
    pub(crate) id: Option<String>,
    /// CSS class
    pub(crate) class: Option<String>,
    /// CSRF token rendered as a hidden `_csrf_token` field
    pub(crate) csrf_token: Option<String>,
    /// Enctype; file fields force `multipart/form-data`
    pub(crate) enctype: Option<String>,
    /// Fields in render order
    pub(crate) fields: Vec<FormField>,
    /// Submit button text
    pub(crate) submit_text: Option<String>,
    /// Submit button CSS class
    pub(crate) submit_class: Option<String>,
    /// Validation errors rendered inline
    pub(crate) errors: Option<&'a ValidationErrors>,
    /// Disable browser validation
    pub(crate) novalidate: bool,
}

impl<'a> FormBuilder<'a> {
    /// Create a builder with action and method
    #[must_use]
    pub fn new(action: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            method: method.into(),
            ..Self::default()
        }
    }

    /// Set the form id
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the form CSS class
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Set the CSRF token
    #[must_use]
    pub fn csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Enable multipart encoding (set automatically by file fields)
    #[must_use]
    pub fn multipart(mut self) -> Self {
        self.enctype = Some("multipart/form-data".into());
        self
    }

    /// Attach validation errors for inline rendering
    #[must_use]
    pub const fn errors(mut self, errors: &'a ValidationErrors) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Set the submit button text
    #[must_use]
    pub fn submit(mut self, text: impl Into<String>) -> Self {
        self.submit_text = Some(text.into());
        self
    }

    /// Set the submit button CSS class
    #[must_use]
    pub fn submit_class(mut self, class: impl Into<String>) -> Self {
        self.submit_class = Some(class.into());
        self
    }

    /// Disable browser validation
    #[must_use]
    pub const fn novalidate(mut self) -> Self {
        self.novalidate = true;
        self
    }

    /// Add an input field, returning a field builder
    #[must_use]
    pub fn field(self, name: impl Into<String>, input_type: InputType) -> FieldBuilder<'a> {
        let field = FormField::input(name, input_type);
        FieldBuilder { form: self, field }
    }

    /// Add a textarea field, returning a field builder
    #[must_use]
    pub fn textarea(self, name: impl Into<String>) -> FieldBuilder<'a> {
        FieldBuilder {
            form: self,
            field: FormField::textarea(name),
        }
    }

    /// Add a select field, returning a field builder
    #[must_use]
    pub fn select(self, name: impl Into<String>, options: Vec<SelectOption>) -> FieldBuilder<'a> {
        FieldBuilder {
            form: self,
            field: FormField::select(name, options),
        }
    }

    /// Add a checkbox field, returning a field builder
    #[must_use]
    pub fn checkbox(self, name: impl Into<String>) -> FieldBuilder<'a> {
        FieldBuilder {
            form: self,
            field: FormField::checkbox(name),
        }
    }

    /// Add a hidden field
    #[must_use]
    pub fn hidden(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField::hidden(name, value));
        self
    }

    /// Add a pre-built field
    #[must_use]
    pub fn add_field(mut self, field: FormField) -> Self {
        if field.is_file() && self.enctype.is_none() {
            self.enctype = Some("multipart/form-data".into());
        }
        self.fields.push(field);
        self
    }

    /// Render the form to HTML
    #[must_use]
    pub fn build(self) -> String {
        FormRenderer::render(&self)
    }
}

/// Builder for a single field, returned by [`FormBuilder`] field methods
#[derive(Debug)]
pub struct FieldBuilder<'a> {
    form: FormBuilder<'a>,
    field: FormField,
}

impl<'a> FieldBuilder<'a> {
    /// Set the label
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.field.label = Some(label.into());
        self
    }

    /// Set placeholder text
    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.field.placeholder = Some(placeholder.into());
        self
    }

    /// Set the current value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.field.value = Some(value.into());
        self
    }

    /// Mark the field required
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.field.required = true;
        self
    }

    /// Mark the field disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.field.disabled = true;
        self
    }

    /// Mark the field read-only
    #[must_use]
    pub const fn readonly(mut self) -> Self {
        self.field.readonly = true;
        self
    }

    /// Set minimum length
    #[must_use]
    pub const fn min_length(mut self, len: u32) -> Self {
        self.field.min_length = Some(len);
        self
    }

    /// Set maximum length
    #[must_use]
    pub const fn max_length(mut self, len: u32) -> Self {
        self.field.max_length = Some(len);
        self
    }

    /// Set minimum value for number inputs
    #[must_use]
    pub fn min(mut self, value: impl Into<String>) -> Self {
        self.field.min = Some(value.into());
        self
    }

    /// Set maximum value for number inputs
    #[must_use]
    pub fn max(mut self, value: impl Into<String>) -> Self {
        self.field.max = Some(value.into());
        self
    }

    /// Set step for number inputs
    #[must_use]
    pub fn step(mut self, value: impl Into<String>) -> Self {
        self.field.step = Some(value.into());
        self
    }

    /// Set the validation pattern
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.field.pattern = Some(pattern.into());
        self
    }

    /// Set the CSS class
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.field.class = Some(class.into());
        self
    }

    /// Set the element id
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.field.id = Some(id.into());
        self
    }

    /// Set help text
    #[must_use]
    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.field.help_text = Some(text.into());
        self
    }

    /// Set the accept attribute (file inputs)
    #[must_use]
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.field.accept = Some(accept.into());
        self
    }

    /// Set number of rows (textarea)
    #[must_use]
    pub fn rows(mut self, rows: u32) -> Self {
        if let FieldKind::Textarea { rows: r } = &mut self.field.kind {
            *r = rows;
        }
        self
    }

    /// Add an arbitrary attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field.attrs.push((name.into(), value.into()));
        self
    }

    /// Finish the field and return to the form builder
    #[must_use]
    pub fn done(self) -> FormBuilder<'a> {
        self.form.add_field(self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_fields_in_order() {
        let form = FormBuilder::new("/x", "POST")
            .field("a", InputType::Text)
            .done()
            .field("b", InputType::Email)
            .done();
        let names: Vec<_> = form.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_file_field_forces_multipart() {
        let form = FormBuilder::new("/x", "POST")
            .field("avatar", InputType::File)
            .done();
        assert_eq!(form.enctype.as_deref(), Some("multipart/form-data"));
    }

    #[test]
    fn test_rows_only_applies_to_textarea() {
        let form = FormBuilder::new("/x", "POST").textarea("bio").rows(10).done();
        assert!(matches!(form.fields[0].kind, FieldKind::Textarea { rows: 10 }));
    }
}
