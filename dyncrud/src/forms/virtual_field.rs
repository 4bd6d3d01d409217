//! Virtual fields: form fields with no backing column
//!
//! Rendered and validated like any other field, but stripped from the
//! submission before it is persisted. Typical uses are password
//! confirmations, terms-of-service checkboxes and captcha answers.

use std::sync::Arc;

use super::field::{FieldKind, FormField, InputType};
use crate::crud::FormData;
use crate::schema::humanize;

type Validator = Arc<dyn Fn(&str, &FormData) -> bool + Send + Sync>;

/// A form field that is never persisted
#[derive(Clone)]
pub struct VirtualField {
    /// Field name, used as the submission key
    pub name: String,
    /// Control kind
    pub kind: FieldKind,
    /// Label text
    pub label: Option<String>,
    /// Whether a value must be submitted
    pub required: bool,
    /// Placeholder text
    pub placeholder: Option<String>,
    /// Help text
    pub help: Option<String>,
    /// Message reported when the validator rejects the value
    pub error_message: Option<String>,
    /// Extra HTML attributes
    pub attrs: Vec<(String, String)>,
    validator: Option<Validator>,
}

impl std::fmt::Debug for VirtualField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualField")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

impl VirtualField {
    /// Create a virtual input field
    #[must_use]
    pub fn new(name: impl Into<String>, input_type: InputType) -> Self {
        Self::with_kind(name, FieldKind::Input(input_type))
    }

    /// Create a virtual checkbox
    #[must_use]
    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Checkbox)
    }

    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
            required: false,
            placeholder: None,
            help: None,
            error_message: None,
            attrs: Vec::new(),
            validator: None,
        }
    }

    /// Set the label
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Mark the field required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set placeholder text
    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Set help text
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Set the message used when the validator rejects the value
    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Add an arbitrary HTML attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Set the validation callback
    ///
    /// The callback receives this field's raw value and the whole submission,
    /// so cross-field checks (password confirmation) are possible.
    #[must_use]
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str, &FormData) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Effective display label
    #[must_use]
    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| humanize(&self.name))
    }

    /// Validate this field against a submission
    ///
    /// Returns the failure message, or `None` when the field passes.
    #[must_use]
    pub fn validate(&self, data: &FormData) -> Option<String> {
        let value = data.get(&self.name).map(|v| v.trim()).unwrap_or_default();

        if value.is_empty() {
            if self.required {
                return Some(
                    self.error_message
                        .clone()
                        .unwrap_or_else(|| format!("{} is required", self.display_label())),
                );
            }
            return None;
        }

        if let Some(validator) = &self.validator {
            if !validator(value, data) {
                return Some(
                    self.error_message
                        .clone()
                        .unwrap_or_else(|| format!("{} is invalid", self.display_label())),
                );
            }
        }
        None
    }

    /// Materialize as a renderable [`FormField`]
    #[must_use]
    pub fn to_field(&self, value: Option<&str>) -> FormField {
        FormField {
            name: self.name.clone(),
            kind: self.kind.clone(),
            label: Some(self.display_label()),
            placeholder: self.placeholder.clone(),
            value: value.map(ToString::to_string),
            required: self.required && !matches!(self.kind, FieldKind::Checkbox),
            help_text: self.help.clone(),
            attrs: self.attrs.clone(),
            ..FormField::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        pairs.iter().map(|(k, v)| ((*k).into(), (*v).into())).collect()
    }

    #[test]
    fn test_required_virtual_field() {
        let field = VirtualField::checkbox("terms_accepted")
            .label("I accept the terms")
            .required();
        assert_eq!(
            field.validate(&data(&[])),
            Some("I accept the terms is required".into())
        );
        assert_eq!(field.validate(&data(&[("terms_accepted", "1")])), None);
    }

    #[test]
    fn test_cross_field_validator() {
        let field = VirtualField::new("password_confirmation", InputType::Password)
            .required()
            .error_message("Passwords do not match")
            .validator(|value, all| all.get("password").map(String::as_str) == Some(value));

        let ok = data(&[("password", "s3cret"), ("password_confirmation", "s3cret")]);
        assert_eq!(field.validate(&ok), None);

        let bad = data(&[("password", "s3cret"), ("password_confirmation", "typo")]);
        assert_eq!(field.validate(&bad), Some("Passwords do not match".into()));
    }

    #[test]
    fn test_optional_field_skips_validator_when_empty() {
        let field = VirtualField::new("nickname", InputType::Text).validator(|_, _| false);
        assert_eq!(field.validate(&data(&[])), None);
    }

    #[test]
    fn test_to_field_carries_attributes() {
        let field = VirtualField::new("code", InputType::Text)
            .placeholder("ABC-123")
            .attr("autocomplete", "off")
            .to_field(Some("xyz"));
        assert_eq!(field.placeholder.as_deref(), Some("ABC-123"));
        assert_eq!(field.value.as_deref(), Some("xyz"));
        assert_eq!(field.attrs, vec![("autocomplete".to_string(), "off".to_string())]);
    }
}
