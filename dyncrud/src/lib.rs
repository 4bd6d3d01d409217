//! dyncrud: schema-driven CRUD scaffolding for SQL databases
//!
//! Point it at a table and it introspects the schema, generates the HTML
//! form, validates and persists submissions, and renders simple list and
//! detail views. Column comments carry optional JSON metadata (field types,
//! validation overrides, upload constraints); schemas are cached with a TTL;
//! every save and delete runs a hook chain inside a single transaction.
//!
//! # Design Principles
//!
//! 1. **The database is the source of truth**: forms and validation derive
//!    from the catalog, not from hand-written model definitions
//! 2. **Strings at the edges, types at the writes**: submissions and reads
//!    are text, bound parameters are typed per column
//! 3. **One transaction per submission**: hooks run inside it and any error
//!    rolls everything back
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dyncrud::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     dyncrud::observability::init()?;
//!
//!     let config = CrudConfig::load()?;
//!     let pool = config.connect().await?;
//!
//!     let mut contacts = CrudHandler::builder(pool, "contacts")
//!         .csrf(config.csrf())
//!         .build()
//!         .await?;
//!
//!     contacts.before_save(|ctx| {
//!         if let Some(email) = ctx.data.get_mut("email") {
//!             *email = email.to_ascii_lowercase();
//!         }
//!         Ok(())
//!     });
//!
//!     // Render the create form, or mount dyncrud::web::router for the
//!     // full form-POST / redirect-after-POST flow.
//!     let html = contacts.render_form(None).await?;
//!     println!("{html}");
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `postgres`, `mysql`, `sqlite` - database dialects (all on by default)
//! - `redis` - Redis-backed schema cache

pub mod config;
pub mod crud;
pub mod db;
pub mod error;
pub mod forms;
pub mod hooks;
pub mod observability;
pub mod schema;
pub mod security;
pub mod uploads;
pub mod validate;
pub mod web;

#[cfg(feature = "sqlite")]
pub mod testing;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! ```rust
    //! use dyncrud::prelude::*;
    //! ```

    pub use crate::config::CrudConfig;
    pub use crate::crud::{CrudHandler, FormData, Submission, SubmissionOutcome};
    pub use crate::db::{CrudPool, ListPage, ListQuery, Record, SortDirection};
    pub use crate::error::{DynCrudError, Result};
    pub use crate::forms::{FormBuilder, FormGenerator, InputType, VirtualField};
    pub use crate::hooks::{HookContext, HookEvent};
    pub use crate::schema::{Column, ColumnKind, SchemaAnalyzer, TableSchema};
    pub use crate::security::CsrfProtect;
    pub use crate::uploads::{LocalFileStorage, UploadedFile};
    pub use crate::validate::{ValidationEngine, ValidationErrors};

    // Re-export key dependencies
    pub use axum;
    pub use serde_json::json;
    pub use sqlx;
}
