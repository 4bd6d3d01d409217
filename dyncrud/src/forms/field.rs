//! Form field types and input configuration

/// HTML input types emitted by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    /// Text input (default)
    #[default]
    Text,
    /// Email input
    Email,
    /// Password input (never pre-filled)
    Password,
    /// Number input
    Number,
    /// Telephone input
    Tel,
    /// URL input
    Url,
    /// Search input
    Search,
    /// Date input
    Date,
    /// Time input
    Time,
    /// Date and time input
    DateTimeLocal,
    /// Color picker
    Color,
    /// Hidden input
    Hidden,
    /// File upload
    File,
}

impl InputType {
    /// HTML `type` attribute value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Password => "password",
            Self::Number => "number",
            Self::Tel => "tel",
            Self::Url => "url",
            Self::Search => "search",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTimeLocal => "datetime-local",
            Self::Color => "color",
            Self::Hidden => "hidden",
            Self::File => "file",
        }
    }

    /// Parse a metadata field-type override
    #[must_use]
    pub fn from_meta(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "email" => Some(Self::Email),
            "password" => Some(Self::Password),
            "number" => Some(Self::Number),
            "tel" => Some(Self::Tel),
            "url" => Some(Self::Url),
            "search" => Some(Self::Search),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "datetime" | "datetime-local" => Some(Self::DateTimeLocal),
            "color" => Some(Self::Color),
            "hidden" => Some(Self::Hidden),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Option for select dropdowns and radio groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    /// Value attribute
    pub value: String,
    /// Display text
    pub label: String,
}

impl SelectOption {
    /// Option whose label equals its value
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }

    /// Option with distinct value and label
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Kind of form control
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Standard input element
    Input(InputType),
    /// Multi-line textarea
    Textarea {
        /// Visible rows
        rows: u32,
    },
    /// Select dropdown
    Select {
        /// Available options
        options: Vec<SelectOption>,
    },
    /// Single checkbox submitting `1` when checked
    Checkbox,
    /// Radio button group
    Radio {
        /// Available options
        options: Vec<SelectOption>,
    },
}

impl Default for FieldKind {
    fn default() -> Self {
        Self::Input(InputType::default())
    }
}

/// A form field with its attributes
#[derive(Debug, Clone, Default)]
pub struct FormField {
    /// Field name, used as the submission key
    pub name: String,
    /// Control kind
    pub kind: FieldKind,
    /// Label text; hidden inputs render no label
    pub label: Option<String>,
    /// Placeholder text
    pub placeholder: Option<String>,
    /// Current value; pre-checks checkboxes and pre-selects options
    pub value: Option<String>,
    /// Required flag
    pub required: bool,
    /// Disabled flag
    pub disabled: bool,
    /// Read-only flag
    pub readonly: bool,
    /// Minimum length attribute
    pub min_length: Option<u32>,
    /// Maximum length attribute
    pub max_length: Option<u32>,
    /// Minimum value attribute for number inputs
    pub min: Option<String>,
    /// Maximum value attribute for number inputs
    pub max: Option<String>,
    /// Step attribute for number inputs
    pub step: Option<String>,
    /// Pattern attribute
    pub pattern: Option<String>,
    /// CSS class
    pub class: Option<String>,
    /// Element id; defaults to the field name
    pub id: Option<String>,
    /// Help text rendered with the field
    pub help_text: Option<String>,
    /// Accept attribute for file inputs
    pub accept: Option<String>,
    /// Allow multiple files on file inputs
    pub multiple: bool,
    /// Additional attributes rendered verbatim (escaped)
    pub attrs: Vec<(String, String)>,
}

impl FormField {
    /// Create an input field
    #[must_use]
    pub fn input(name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Input(input_type),
            ..Self::default()
        }
    }

    /// Create a textarea field
    #[must_use]
    pub fn textarea(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Textarea { rows: 4 },
            ..Self::default()
        }
    }

    /// Create a select field
    #[must_use]
    pub fn select(name: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Select { options },
            ..Self::default()
        }
    }

    /// Create a checkbox field
    #[must_use]
    pub fn checkbox(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Checkbox,
            ..Self::default()
        }
    }

    /// Create a radio group
    #[must_use]
    pub fn radio(name: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Radio { options },
            ..Self::default()
        }
    }

    /// Create a hidden field with a value
    #[must_use]
    pub fn hidden(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Input(InputType::Hidden),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Effective element id (explicit id or field name)
    #[must_use]
    pub fn effective_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    /// Whether this is a file input
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.kind, FieldKind::Input(InputType::File))
    }

    /// Whether this is a hidden input
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        matches!(self.kind, FieldKind::Input(InputType::Hidden))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_as_str() {
        assert_eq!(InputType::Email.as_str(), "email");
        assert_eq!(InputType::DateTimeLocal.as_str(), "datetime-local");
    }

    #[test]
    fn test_input_type_from_meta() {
        assert_eq!(InputType::from_meta("email"), Some(InputType::Email));
        assert_eq!(InputType::from_meta("datetime"), Some(InputType::DateTimeLocal));
        assert_eq!(InputType::from_meta("bogus"), None);
    }

    #[test]
    fn test_effective_id() {
        let mut field = FormField::input("email", InputType::Email);
        assert_eq!(field.effective_id(), "email");
        field.id = Some("signup-email".into());
        assert_eq!(field.effective_id(), "signup-email");
    }

    #[test]
    fn test_hidden_constructor() {
        let field = FormField::hidden("id", "7");
        assert!(field.is_hidden());
        assert_eq!(field.value.as_deref(), Some("7"));
    }
}
