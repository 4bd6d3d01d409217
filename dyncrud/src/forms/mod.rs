//! Form model, builder and HTML generation
//!
//! [`FormField`] and [`FormBuilder`] are the hand-assembly API;
//! [`FormGenerator`] assembles a builder automatically from a
//! [`TableSchema`](crate::schema::TableSchema). Rendering goes through
//! [`render::FormRenderer`] in both cases, so generated and hand-built forms
//! share one HTML shape.

pub mod builder;
pub mod field;
pub mod generate;
pub mod render;
pub mod virtual_field;

pub use builder::{FieldBuilder, FormBuilder};
pub use field::{FieldKind, FormField, InputType, SelectOption};
pub use generate::FormGenerator;
pub use render::{escape, FormRenderer};
pub use virtual_field::VirtualField;
