//! HTML rendering for forms
//!
//! Emits plain, classable markup: each field sits in a `div.form-field`
//! wrapper with its label, control, optional help text and inline error.
//! All user- and database-supplied text is escaped.

use super::builder::FormBuilder;
use super::field::{FieldKind, FormField, InputType, SelectOption};
use crate::db::parse_bool;

/// CSRF token field name expected by the submission handler
pub const CSRF_FIELD: &str = "_csrf_token";

/// Escape text for HTML element and attribute contexts
#[must_use]
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders a [`FormBuilder`] to an HTML string
pub struct FormRenderer;

impl FormRenderer {
    /// Render the complete form
    #[must_use]
    pub fn render(form: &FormBuilder<'_>) -> String {
        let mut html = String::new();

        html.push_str(&format!(
            "<form method=\"{}\" action=\"{}\"",
            escape(&form.method),
            escape(&form.action)
        ));
        push_opt_attr(&mut html, "id", form.id.as_deref());
        push_opt_attr(&mut html, "class", form.class.as_deref());
        push_opt_attr(&mut html, "enctype", form.enctype.as_deref());
        if form.novalidate {
            html.push_str(" novalidate");
        }
        html.push_str(">\n");

        if let Some(token) = &form.csrf_token {
            html.push_str(&format!(
                "<input type=\"hidden\" name=\"{CSRF_FIELD}\" value=\"{}\">\n",
                escape(token)
            ));
        }

        for field in &form.fields {
            if field.is_hidden() {
                html.push_str(&render_hidden(field));
            } else {
                let error = form.errors.and_then(|e| e.first(&field.name));
                html.push_str(&render_field(field, error));
            }
        }

        let submit_text = form.submit_text.as_deref().unwrap_or("Save");
        let submit_class = form.submit_class.as_deref().unwrap_or("form-submit");
        html.push_str(&format!(
            "<button type=\"submit\" class=\"{}\">{}</button>\n",
            escape(submit_class),
            escape(submit_text)
        ));

        html.push_str("</form>\n");
        html
    }
}

fn render_hidden(field: &FormField) -> String {
    format!(
        "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
        escape(&field.name),
        escape(field.value.as_deref().unwrap_or_default())
    )
}

fn render_field(field: &FormField, error: Option<&str>) -> String {
    let mut html = String::from("<div class=\"form-field\">\n");

    if let Some(label) = &field.label {
        html.push_str(&format!(
            "<label for=\"{}\">{}</label>\n",
            escape(field.effective_id()),
            escape(label)
        ));
    }

    match &field.kind {
        FieldKind::Input(input_type) => html.push_str(&render_input(field, *input_type)),
        FieldKind::Textarea { rows } => html.push_str(&render_textarea(field, *rows)),
        FieldKind::Select { options } => html.push_str(&render_select(field, options)),
        FieldKind::Checkbox => html.push_str(&render_checkbox(field)),
        FieldKind::Radio { options } => html.push_str(&render_radio(field, options)),
    }

    if let Some(help) = &field.help_text {
        html.push_str(&format!("<p class=\"field-help\">{}</p>\n", escape(help)));
    }
    if let Some(error) = error {
        html.push_str(&format!("<p class=\"field-error\">{}</p>\n", escape(error)));
    }

    html.push_str("</div>\n");
    html
}

fn render_input(field: &FormField, input_type: InputType) -> String {
    let mut html = format!(
        "<input type=\"{}\" id=\"{}\" name=\"{}\"",
        input_type.as_str(),
        escape(field.effective_id()),
        escape(&field.name)
    );

    // Passwords and file inputs never echo a value back.
    if !matches!(input_type, InputType::Password | InputType::File) {
        push_opt_attr(&mut html, "value", field.value.as_deref());
    }

    push_opt_attr(&mut html, "placeholder", field.placeholder.as_deref());
    push_opt_attr(&mut html, "class", field.class.as_deref());
    push_opt_attr(&mut html, "min", field.min.as_deref());
    push_opt_attr(&mut html, "max", field.max.as_deref());
    push_opt_attr(&mut html, "step", field.step.as_deref());
    push_opt_attr(&mut html, "pattern", field.pattern.as_deref());
    if let Some(len) = field.min_length {
        html.push_str(&format!(" minlength=\"{len}\""));
    }
    if let Some(len) = field.max_length {
        html.push_str(&format!(" maxlength=\"{len}\""));
    }
    if input_type == InputType::File {
        push_opt_attr(&mut html, "accept", field.accept.as_deref());
        if field.multiple {
            html.push_str(" multiple");
        }
    }
    push_flags(&mut html, field);
    push_extra_attrs(&mut html, field);
    html.push_str(">\n");
    html
}

fn render_textarea(field: &FormField, rows: u32) -> String {
    let mut html = format!(
        "<textarea id=\"{}\" name=\"{}\" rows=\"{rows}\"",
        escape(field.effective_id()),
        escape(&field.name)
    );
    push_opt_attr(&mut html, "placeholder", field.placeholder.as_deref());
    push_opt_attr(&mut html, "class", field.class.as_deref());
    if let Some(len) = field.max_length {
        html.push_str(&format!(" maxlength=\"{len}\""));
    }
    push_flags(&mut html, field);
    push_extra_attrs(&mut html, field);
    html.push_str(&format!(
        ">{}</textarea>\n",
        escape(field.value.as_deref().unwrap_or_default())
    ));
    html
}

fn render_select(field: &FormField, options: &[SelectOption]) -> String {
    let mut html = format!(
        "<select id=\"{}\" name=\"{}\"",
        escape(field.effective_id()),
        escape(&field.name)
    );
    push_opt_attr(&mut html, "class", field.class.as_deref());
    push_flags(&mut html, field);
    push_extra_attrs(&mut html, field);
    html.push_str(">\n");

    if !field.required {
        html.push_str("<option value=\"\"></option>\n");
    }
    for option in options {
        let selected = if field.value.as_deref() == Some(option.value.as_str()) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            "<option value=\"{}\"{selected}>{}</option>\n",
            escape(&option.value),
            escape(&option.label)
        ));
    }
    html.push_str("</select>\n");
    html
}

fn render_checkbox(field: &FormField) -> String {
    let checked = field
        .value
        .as_deref()
        .and_then(parse_bool)
        .unwrap_or(false);
    let mut html = format!(
        "<input type=\"checkbox\" id=\"{}\" name=\"{}\" value=\"1\"",
        escape(field.effective_id()),
        escape(&field.name)
    );
    push_opt_attr(&mut html, "class", field.class.as_deref());
    if checked {
        html.push_str(" checked");
    }
    if field.disabled {
        html.push_str(" disabled");
    }
    push_extra_attrs(&mut html, field);
    html.push_str(">\n");
    html
}

fn render_radio(field: &FormField, options: &[SelectOption]) -> String {
    let mut html = String::new();
    for (i, option) in options.iter().enumerate() {
        let id = format!("{}-{i}", field.effective_id());
        let checked = if field.value.as_deref() == Some(option.value.as_str()) {
            " checked"
        } else {
            ""
        };
        html.push_str(&format!(
            "<label for=\"{id}\"><input type=\"radio\" id=\"{id}\" name=\"{}\" value=\"{}\"{checked}> {}</label>\n",
            escape(&field.name),
            escape(&option.value),
            escape(&option.label)
        ));
    }
    html
}

fn push_opt_attr(html: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        html.push_str(&format!(" {name}=\"{}\"", escape(value)));
    }
}

fn push_flags(html: &mut String, field: &FormField) {
    if field.required {
        html.push_str(" required");
    }
    if field.disabled {
        html.push_str(" disabled");
    }
    if field.readonly {
        html.push_str(" readonly");
    }
}

fn push_extra_attrs(html: &mut String, field: &FormField) {
    for (name, value) in &field.attrs {
        html.push_str(&format!(" {}=\"{}\"", escape(name), escape(value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormBuilder;
    use crate::validate::ValidationErrors;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_render_basic_form() {
        let html = FormBuilder::new("/contacts", "POST")
            .csrf_token("tok")
            .field("email", InputType::Email)
            .label("Email")
            .required()
            .done()
            .submit("Create")
            .build();

        assert!(html.contains("<form method=\"POST\" action=\"/contacts\">"));
        assert!(html.contains(&format!("name=\"{CSRF_FIELD}\" value=\"tok\"")));
        assert!(html.contains("<input type=\"email\" id=\"email\" name=\"email\" required>"));
        assert!(html.contains("<label for=\"email\">Email</label>"));
        assert!(html.contains(">Create</button>"));
    }

    #[test]
    fn test_render_inline_error() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Email is required");
        let html = FormBuilder::new("/x", "POST")
            .errors(&errors)
            .field("email", InputType::Email)
            .done()
            .build();
        assert!(html.contains("<p class=\"field-error\">Email is required</p>"));
    }

    #[test]
    fn test_render_select_preselects_value() {
        let options = vec![SelectOption::plain("draft"), SelectOption::plain("live")];
        let html = FormBuilder::new("/x", "POST")
            .select("state", options)
            .value("live")
            .required()
            .done()
            .build();
        assert!(html.contains("<option value=\"live\" selected>live</option>"));
        // Required selects get no blank placeholder option.
        assert!(!html.contains("<option value=\"\">"));
    }

    #[test]
    fn test_render_checkbox_checked_from_truthy_value() {
        let html = FormBuilder::new("/x", "POST")
            .checkbox("active")
            .value("1")
            .done()
            .build();
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains(" checked"));
    }

    #[test]
    fn test_password_value_never_rendered() {
        let html = FormBuilder::new("/x", "POST")
            .field("secret", InputType::Password)
            .value("hunter2")
            .done()
            .build();
        assert!(!html.contains("hunter2"));
    }

    #[test]
    fn test_values_are_escaped() {
        let html = FormBuilder::new("/x", "POST")
            .field("name", InputType::Text)
            .value("\"><script>alert(1)</script>")
            .done()
            .build();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
    }
}
