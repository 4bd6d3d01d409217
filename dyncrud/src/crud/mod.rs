//! CRUD orchestration: sanitize → validate → hooks → transactional write
//!
//! [`CrudHandler`] ties the pipeline together for one table: the analyzer
//! supplies the schema, the validation engine and form generator derive from
//! it, hooks wrap every write, and each submission or delete runs inside a
//! single transaction that rolls back on any error or veto.

pub mod list;

pub use list::{render_detail, render_table};

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::db::{to_bound, BoundValue, CrudPool, ListPage, ListQuery, Record};
use crate::error::{DynCrudError, Result};
use crate::forms::render::CSRF_FIELD;
use crate::forms::{FormGenerator, VirtualField};
use crate::hooks::{HookContext, HookEvent, HookRegistry, HookResult};
use crate::schema::analyzer::DEFAULT_CACHE_TTL;
use crate::schema::{ColumnKind, SchemaAnalyzer, SchemaCache, TableSchema};
use crate::security::{sanitize_input, CsrfProtect};
use crate::uploads::{FileStorage, LocalFileStorage, UploadPolicy, UploadedFile};
use crate::validate::{ValidationEngine, ValidationErrors};

/// A form submission: string fields keyed by name
pub type FormData = BTreeMap<String, String>;

/// A parsed form submission: fields plus any uploaded files
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Form fields
    pub fields: FormData,
    /// Uploaded files, in multipart order
    pub files: Vec<UploadedFile>,
}

impl Submission {
    /// Submission with fields only
    #[must_use]
    pub fn from_fields(fields: FormData) -> Self {
        Self {
            fields,
            files: Vec::new(),
        }
    }

    /// Attach an uploaded file
    #[must_use]
    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }
}

/// Result of handling a submission
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// A new row was inserted
    Created {
        /// Generated primary key
        id: i64,
    },
    /// An existing row was updated
    Updated {
        /// Primary key of the updated row
        id: i64,
    },
    /// Validation failed; nothing was written
    Rejected(ValidationErrors),
}

impl SubmissionOutcome {
    /// Whether a row was written
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::Updated { .. })
    }

    /// Primary key of the written row, if any
    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        match self {
            Self::Created { id } | Self::Updated { id } => Some(*id),
            Self::Rejected(_) => None,
        }
    }
}

/// Builder for [`CrudHandler`]
pub struct CrudHandlerBuilder {
    pool: CrudPool,
    table: String,
    cache: Option<Arc<dyn SchemaCache>>,
    cache_ttl: Duration,
    csrf: Option<CsrfProtect>,
    storage: Option<Arc<dyn FileStorage>>,
}

impl CrudHandlerBuilder {
    /// Use a schema cache backend
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn SchemaCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Override the schema cache TTL
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Use a specific CSRF protector (e.g. with a shared secret)
    #[must_use]
    pub fn csrf(mut self, csrf: CsrfProtect) -> Self {
        self.csrf = Some(csrf);
        self
    }

    /// Store uploads under a local directory
    #[must_use]
    pub fn upload_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.storage = Some(Arc::new(LocalFileStorage::new(dir)));
        self
    }

    /// Use a custom upload storage backend
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn FileStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Introspect the table and build the handler
    pub async fn build(self) -> Result<CrudHandler> {
        let analyzer = match self.cache {
            Some(cache) => SchemaAnalyzer::with_cache(self.pool, cache, self.cache_ttl),
            None => SchemaAnalyzer::new(self.pool),
        };
        let schema = analyzer.table_schema(&self.table).await?;
        let engine = ValidationEngine::from_schema(&schema);

        Ok(CrudHandler {
            table: self.table,
            analyzer,
            schema,
            engine,
            hooks: HookRegistry::new(),
            virtual_fields: Vec::new(),
            csrf: self.csrf.unwrap_or_else(CsrfProtect::random),
            storage: self.storage,
        })
    }
}

/// Schema-driven CRUD for a single table
///
/// # Examples
///
/// ```rust,no_run
/// use dyncrud::crud::CrudHandler;
/// use dyncrud::db::CrudPool;
///
/// # async fn demo() -> dyncrud::error::Result<()> {
/// let pool = CrudPool::connect("postgres://localhost/app").await?;
/// let mut users = CrudHandler::new(pool, "users").await?;
/// users.before_save(|ctx| {
///     ctx.data.entry("slug".into()).or_insert_with(|| "untitled".into());
///     Ok(())
/// });
/// let html = users.render_form(None).await?;
/// # Ok(())
/// # }
/// ```
pub struct CrudHandler {
    table: String,
    analyzer: SchemaAnalyzer,
    schema: TableSchema,
    engine: ValidationEngine,
    hooks: HookRegistry,
    virtual_fields: Vec<VirtualField>,
    csrf: CsrfProtect,
    storage: Option<Arc<dyn FileStorage>>,
}

impl std::fmt::Debug for CrudHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudHandler")
            .field("table", &self.table)
            .field("virtual_fields", &self.virtual_fields.len())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl CrudHandler {
    /// Handler with defaults: no cache, random CSRF secret, no upload storage
    pub async fn new(pool: CrudPool, table: impl Into<String>) -> Result<Self> {
        Self::builder(pool, table).build().await
    }

    /// Start building a handler
    #[must_use]
    pub fn builder(pool: CrudPool, table: impl Into<String>) -> CrudHandlerBuilder {
        CrudHandlerBuilder {
            pool,
            table: table.into(),
            cache: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            csrf: None,
            storage: None,
        }
    }

    /// Introspected schema for this table
    #[must_use]
    pub const fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Table name
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// CSRF protector (to embed tokens in hand-built forms)
    #[must_use]
    pub const fn csrf(&self) -> &CsrfProtect {
        &self.csrf
    }

    /// Add a virtual field
    pub fn add_virtual_field(&mut self, field: VirtualField) -> &mut Self {
        self.virtual_fields.push(field);
        self
    }

    /// Drop the cached schema and re-introspect the table
    pub async fn refresh_schema(&mut self) -> Result<()> {
        self.analyzer.invalidate(&self.table).await?;
        self.schema = self.analyzer.table_schema(&self.table).await?;
        self.engine = ValidationEngine::from_schema(&self.schema);
        Ok(())
    }

    // =========================================================================
    // Hook registration
    // =========================================================================

    /// Register a callback for an arbitrary event
    pub fn on<F>(&mut self, event: HookEvent, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.on(event, callback);
        self
    }

    /// Register a `beforeValidate` callback
    pub fn before_validate<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::BeforeValidate, callback)
    }

    /// Register an `afterValidate` callback
    pub fn after_validate<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::AfterValidate, callback)
    }

    /// Register a `beforeSave` callback (runs for creates and updates)
    pub fn before_save<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::BeforeSave, callback)
    }

    /// Register an `afterSave` callback (runs for creates and updates)
    pub fn after_save<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::AfterSave, callback)
    }

    /// Register a `beforeCreate` callback
    pub fn before_create<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::BeforeCreate, callback)
    }

    /// Register an `afterCreate` callback
    pub fn after_create<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::AfterCreate, callback)
    }

    /// Register a `beforeUpdate` callback
    pub fn before_update<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::BeforeUpdate, callback)
    }

    /// Register an `afterUpdate` callback
    pub fn after_update<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::AfterUpdate, callback)
    }

    /// Register a `beforeDelete` callback
    pub fn before_delete<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::BeforeDelete, callback)
    }

    /// Register an `afterDelete` callback
    pub fn after_delete<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.on(HookEvent::AfterDelete, callback)
    }

    // =========================================================================
    // Reads and rendering
    // =========================================================================

    /// Fetch a row by primary key
    pub async fn find(&self, id: i64) -> Result<Option<Record>> {
        self.analyzer.pool().find_by_id(&self.schema, id).await
    }

    /// Fetch one page of rows
    pub async fn list(&self, query: &ListQuery) -> Result<ListPage> {
        self.analyzer.pool().list(&self.schema, query).await
    }

    /// Render the create (`id: None`) or edit form
    pub async fn render_form(&self, id: Option<i64>) -> Result<String> {
        self.render_form_at("", id, None).await
    }

    /// Render the form with an explicit action URL and optional errors
    ///
    /// Re-rendering with the errors from a rejected submission shows them
    /// inline next to their fields.
    pub async fn render_form_at(
        &self,
        action: &str,
        id: Option<i64>,
        errors: Option<&ValidationErrors>,
    ) -> Result<String> {
        let record = match id {
            Some(id) => {
                let record = self.find(id).await?;
                if record.is_none() {
                    tracing::warn!(table = %self.table, id, "edit form requested for missing row");
                }
                record
            }
            None => None,
        };

        let token = self.csrf.generate();
        let mut generator = FormGenerator::new(&self.schema)
            .csrf_token(token)
            .action(action)
            .virtual_fields(&self.virtual_fields);
        if let Some(record) = &record {
            generator = generator.values(record);
        }
        if let Some(errors) = errors {
            generator = generator.errors(errors);
        }
        Ok(generator.render())
    }

    /// Render a page of rows as an HTML table
    #[must_use]
    pub fn render_list(&self, page: &ListPage) -> String {
        render_table(&self.schema, page)
    }

    /// Render a single row as an HTML definition list
    #[must_use]
    pub fn render_detail(&self, record: &Record) -> String {
        render_detail(&self.schema, record)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Handle a form submission: create or update depending on the primary
    /// key field
    ///
    /// Validation failures come back as [`SubmissionOutcome::Rejected`];
    /// everything else that goes wrong is an error and leaves the database
    /// untouched.
    pub async fn handle_submission(&self, submission: Submission) -> Result<SubmissionOutcome> {
        let token = submission.fields.get(CSRF_FIELD).map(String::as_str);
        if !token.is_some_and(|t| self.csrf.verify(t)) {
            return Err(DynCrudError::CsrfMismatch);
        }

        // Update when the form carried a usable primary key value.
        let id: Option<i64> = submission
            .fields
            .get(&self.schema.primary_key)
            .and_then(|v| v.trim().parse().ok());

        let allowed: HashSet<&str> = self
            .schema
            .input_columns()
            .map(|c| c.name.as_str())
            .chain(self.virtual_fields.iter().map(|f| f.name.as_str()))
            .collect();
        let mut data = sanitize_input(&submission.fields, &allowed);

        // Unchecked checkboxes are absent from the submission; make them an
        // explicit false so booleans behave like form controls, not like
        // omitted columns.
        for column in self.schema.input_columns() {
            if column.kind == ColumnKind::Boolean {
                data.entry(column.name.clone()).or_insert_with(|| "0".into());
            }
        }

        self.hooks.run(HookEvent::BeforeValidate, id, &mut data)?;

        self.apply_uploads(&submission, id, &mut data).await?;

        let mut errors = match self.engine.validate(&data) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        for vfield in &self.virtual_fields {
            if let Some(message) = vfield.validate(&data) {
                errors.add(vfield.name.clone(), message);
            }
        }
        if !errors.is_empty() {
            return Ok(SubmissionOutcome::Rejected(errors));
        }

        self.hooks.run(HookEvent::AfterValidate, id, &mut data)?;
        self.hooks.run(HookEvent::BeforeSave, id, &mut data)?;

        match id {
            Some(id) => {
                self.hooks.run(HookEvent::BeforeUpdate, Some(id), &mut data)?;
                let values = self.persist_values(&data)?;
                let mut tx = self.analyzer.pool().begin().await?;
                tx.update(&self.schema, id, &values).await?;
                self.hooks.run(HookEvent::AfterUpdate, Some(id), &mut data)?;
                self.hooks.run(HookEvent::AfterSave, Some(id), &mut data)?;
                tx.commit().await?;
                tracing::info!(table = %self.table, id, "row updated");
                Ok(SubmissionOutcome::Updated { id })
            }
            None => {
                self.hooks.run(HookEvent::BeforeCreate, None, &mut data)?;
                let values = self.persist_values(&data)?;
                let mut tx = self.analyzer.pool().begin().await?;
                let id = tx.insert(&self.schema, &values).await?;
                self.hooks.run(HookEvent::AfterCreate, Some(id), &mut data)?;
                self.hooks.run(HookEvent::AfterSave, Some(id), &mut data)?;
                tx.commit().await?;
                tracing::info!(table = %self.table, id, "row created");
                Ok(SubmissionOutcome::Created { id })
            }
        }
    }

    /// Delete a row; `true` if it existed
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut data = FormData::new();
        let mut tx = self.analyzer.pool().begin().await?;
        self.hooks.run(HookEvent::BeforeDelete, Some(id), &mut data)?;
        let deleted = tx.delete(&self.schema, id).await?;
        self.hooks.run(HookEvent::AfterDelete, Some(id), &mut data)?;
        tx.commit().await?;
        tracing::info!(table = %self.table, id, deleted, "row deleted");
        Ok(deleted)
    }

    /// Store uploads for file columns and splice their paths into the data
    async fn apply_uploads(
        &self,
        submission: &Submission,
        id: Option<i64>,
        data: &mut FormData,
    ) -> Result<()> {
        let file_columns: Vec<_> = self.schema.input_columns().filter(|c| c.is_file()).collect();
        if file_columns.is_empty() {
            return Ok(());
        }

        // On update, a file column without a fresh upload keeps its stored
        // value; fetch it once so required-file validation sees it.
        let existing = match id {
            Some(id) => self.find(id).await?,
            None => None,
        };

        for column in file_columns {
            let policy = UploadPolicy::from_meta(column.meta.as_ref());
            let uploads: Vec<&UploadedFile> = submission
                .files
                .iter()
                .filter(|f| f.field_name == column.name && !f.data.is_empty())
                .collect();
            policy.check_count(uploads.len()).map_err(DynCrudError::Upload)?;

            match uploads.first() {
                Some(file) => {
                    policy.check(file).map_err(DynCrudError::Upload)?;
                    let storage = self.storage.as_ref().ok_or_else(|| {
                        DynCrudError::Config(format!(
                            "column `{}` accepts uploads but no storage is configured",
                            column.name
                        ))
                    })?;
                    let stored = storage.store(file).await.map_err(DynCrudError::Upload)?;
                    data.insert(column.name.clone(), stored.public_path);
                }
                None => {
                    // The text value of a file input is meaningless; either
                    // keep the stored value or leave the column untouched.
                    data.remove(&column.name);
                    if let Some(current) = existing
                        .as_ref()
                        .and_then(|r| r.get(&column.name).cloned().flatten())
                    {
                        data.insert(column.name.clone(), current);
                    }
                }
            }
        }
        Ok(())
    }

    /// Coerce validated submission data into bound column values
    fn persist_values(&self, data: &FormData) -> Result<Vec<BoundValue>> {
        let mut values = Vec::new();
        for column in self.schema.input_columns() {
            if let Some(raw) = data.get(&column.name) {
                if let Some(bound) = to_bound(column, raw)? {
                    values.push(bound);
                }
            }
        }
        if values.is_empty() {
            return Err(DynCrudError::EmptySubmission);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_helpers() {
        assert!(SubmissionOutcome::Created { id: 1 }.is_success());
        assert_eq!(SubmissionOutcome::Updated { id: 9 }.id(), Some(9));
        let rejected = SubmissionOutcome::Rejected(ValidationErrors::new());
        assert!(!rejected.is_success());
        assert_eq!(rejected.id(), None);
    }

    #[test]
    fn test_submission_builder() {
        let mut fields = FormData::new();
        fields.insert("name".into(), "Ada".into());
        let submission = Submission::from_fields(fields).with_file(UploadedFile {
            field_name: "avatar".into(),
            filename: "a.png".into(),
            content_type: None,
            data: bytes::Bytes::from_static(b"x"),
        });
        assert_eq!(submission.files.len(), 1);
        assert_eq!(submission.fields["name"], "Ada");
    }
}
