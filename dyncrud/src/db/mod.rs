//! Database access: dialect detection, pools, transactions, dynamic SQL
//!
//! All dialect polymorphism lives here. [`CrudPool`] wraps the per-dialect
//! sqlx pool and dispatches catalog introspection and reads;
//! [`CrudTransaction`] wraps a sqlx transaction and dispatches writes, so a
//! whole submission commits or rolls back as one unit. Reads cast every
//! selected column to text; writes bind typed [`value::SqlValue`]s.

#[cfg(feature = "mysql")]
pub(crate) mod mysql;
#[cfg(feature = "postgres")]
pub(crate) mod postgres;
#[cfg(feature = "sqlite")]
pub(crate) mod sqlite;
pub mod value;

pub use value::{parse_bool, to_bound, BoundValue, SqlValue};

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DynCrudError, Result};
use crate::schema::{Column, ColumnKind, TableSchema};

#[cfg(not(any(feature = "postgres", feature = "mysql", feature = "sqlite")))]
compile_error!("at least one of the `postgres`, `mysql` or `sqlite` features must be enabled");

/// A row fetched for display: column name to text value
///
/// Every column is cast to text in SQL, so values arrive as strings in the
/// dialect's canonical rendering (matching what a form round-trips).
pub type Record = BTreeMap<String, Option<String>>;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL
    #[cfg(feature = "postgres")]
    Postgres,
    /// MySQL / MariaDB
    #[cfg(feature = "mysql")]
    MySql,
    /// SQLite
    #[cfg(feature = "sqlite")]
    Sqlite,
}

impl Dialect {
    /// Quote an identifier for this dialect
    ///
    /// Callers must have validated the identifier with [`ensure_ident`].
    #[must_use]
    pub fn quote(self, ident: &str) -> String {
        match self {
            #[cfg(feature = "mysql")]
            Self::MySql => format!("`{ident}`"),
            #[cfg(any(feature = "postgres", feature = "sqlite"))]
            _ => format!("\"{ident}\""),
        }
    }

    /// Parameter placeholder for position `n` (1-based)
    #[must_use]
    pub fn placeholder(self, n: usize) -> String {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres => format!("${n}"),
            #[cfg(any(feature = "mysql", feature = "sqlite"))]
            _ => {
                let _ = n;
                "?".to_string()
            }
        }
    }
}

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// Reject table/column names that cannot be safely spliced into SQL
pub fn ensure_ident(name: &str) -> Result<()> {
    if IDENT_RE.is_match(name) {
        Ok(())
    } else {
        Err(DynCrudError::InvalidIdentifier(name.to_string()))
    }
}

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending (default)
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// SQL keyword for this direction
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Options for a paginated list query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub per_page: u32,
    /// Column to order by; defaults to the primary key
    pub order_by: Option<String>,
    /// Sort direction
    pub direction: SortDirection,
    /// Substring matched against text columns
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 25,
            order_by: None,
            direction: SortDirection::Asc,
            search: None,
        }
    }
}

impl ListQuery {
    /// OFFSET implied by page and page size
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.per_page as u64
    }
}

/// One page of list results
#[derive(Debug, Clone)]
pub struct ListPage {
    /// Rows on this page
    pub rows: Vec<Record>,
    /// Total rows matching the query (all pages)
    pub total: u64,
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub per_page: u32,
}

impl ListPage {
    /// Number of pages implied by total and page size
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        u32::try_from(self.total.div_ceil(u64::from(self.per_page))).unwrap_or(u32::MAX)
    }
}

/// Connection pool wrapper dispatching over dialects
#[derive(Clone)]
pub enum CrudPool {
    /// PostgreSQL pool
    #[cfg(feature = "postgres")]
    Postgres(sqlx::PgPool),
    /// MySQL pool
    #[cfg(feature = "mysql")]
    MySql(sqlx::MySqlPool),
    /// SQLite pool
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::SqlitePool),
}

impl std::fmt::Debug for CrudPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "CrudPool::Postgres",
            #[cfg(feature = "mysql")]
            Self::MySql(_) => "CrudPool::MySql",
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => "CrudPool::Sqlite",
        })
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::PgPool> for CrudPool {
    fn from(pool: sqlx::PgPool) -> Self {
        Self::Postgres(pool)
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::MySqlPool> for CrudPool {
    fn from(pool: sqlx::MySqlPool) -> Self {
        Self::MySql(pool)
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::SqlitePool> for CrudPool {
    fn from(pool: sqlx::SqlitePool) -> Self {
        Self::Sqlite(pool)
    }
}

impl CrudPool {
    /// Connect to a database, detecting the dialect from the URL scheme
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(url, 10).await
    }

    /// Connect with an explicit pool size
    pub async fn connect_with(url: &str, max_connections: u32) -> Result<Self> {
        let scheme = url.split("://").next().unwrap_or("").to_ascii_lowercase();
        // `sqlite::memory:` and friends have no `://` separator.
        let scheme = scheme.split(':').next().unwrap_or("").to_string();
        match scheme.as_str() {
            #[cfg(feature = "postgres")]
            "postgres" | "postgresql" => Ok(Self::Postgres(
                sqlx::postgres::PgPoolOptions::new()
                    .max_connections(max_connections)
                    .connect(url)
                    .await?,
            )),
            #[cfg(feature = "mysql")]
            "mysql" | "mariadb" => Ok(Self::MySql(
                sqlx::mysql::MySqlPoolOptions::new()
                    .max_connections(max_connections)
                    .connect(url)
                    .await?,
            )),
            #[cfg(feature = "sqlite")]
            "sqlite" => Ok(Self::Sqlite(
                sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect(url)
                    .await?,
            )),
            other => Err(DynCrudError::UnsupportedDialect(other.to_string())),
        }
    }

    /// Dialect served by this pool
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => Dialect::Postgres,
            #[cfg(feature = "mysql")]
            Self::MySql(_) => Dialect::MySql,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Read a table's schema from the catalog
    pub async fn table_schema(&self, table: &str) -> Result<TableSchema> {
        ensure_ident(table)?;
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => postgres::table_schema(pool, table).await,
            #[cfg(feature = "mysql")]
            Self::MySql(pool) => mysql::table_schema(pool, table).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => sqlite::table_schema(pool, table).await,
        }
    }

    /// Fetch a single row by primary key
    pub async fn find_by_id(&self, schema: &TableSchema, id: i64) -> Result<Option<Record>> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => postgres::find_by_id(pool, schema, id).await,
            #[cfg(feature = "mysql")]
            Self::MySql(pool) => mysql::find_by_id(pool, schema, id).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => sqlite::find_by_id(pool, schema, id).await,
        }
    }

    /// Fetch one page of rows plus the total count
    pub async fn list(&self, schema: &TableSchema, query: &ListQuery) -> Result<ListPage> {
        // Whitelist the order column against the schema before it reaches SQL.
        let order_col = query.order_by.as_deref().unwrap_or(&schema.primary_key);
        if schema.column(order_col).is_none() {
            return Err(DynCrudError::UnknownColumn(order_col.to_string()));
        }

        let (rows, total) = match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => postgres::list(pool, schema, query, order_col).await?,
            #[cfg(feature = "mysql")]
            Self::MySql(pool) => mysql::list(pool, schema, query, order_col).await?,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => sqlite::list(pool, schema, query, order_col).await?,
        };

        Ok(ListPage {
            rows,
            total,
            page: query.page,
            per_page: query.per_page,
        })
    }

    /// Execute a raw statement (DDL, fixtures, migrations)
    pub async fn execute_raw(&self, sql: &str) -> Result<()> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            #[cfg(feature = "mysql")]
            Self::MySql(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Begin a transaction
    pub async fn begin(&self) -> Result<CrudTransaction> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => Ok(CrudTransaction::Postgres(pool.begin().await?)),
            #[cfg(feature = "mysql")]
            Self::MySql(pool) => Ok(CrudTransaction::MySql(pool.begin().await?)),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => Ok(CrudTransaction::Sqlite(pool.begin().await?)),
        }
    }
}

/// In-flight transaction wrapper
///
/// Dropping without [`commit`](Self::commit) rolls back.
pub enum CrudTransaction {
    /// PostgreSQL transaction
    #[cfg(feature = "postgres")]
    Postgres(sqlx::Transaction<'static, sqlx::Postgres>),
    /// MySQL transaction
    #[cfg(feature = "mysql")]
    MySql(sqlx::Transaction<'static, sqlx::MySql>),
    /// SQLite transaction
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::Transaction<'static, sqlx::Sqlite>),
}

impl CrudTransaction {
    /// Insert a row, returning the new primary key value
    pub async fn insert(&mut self, schema: &TableSchema, values: &[BoundValue]) -> Result<i64> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(tx) => postgres::insert(tx, schema, values).await,
            #[cfg(feature = "mysql")]
            Self::MySql(tx) => mysql::insert(tx, schema, values).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(tx) => sqlite::insert(tx, schema, values).await,
        }
    }

    /// Update the row with the given primary key
    pub async fn update(
        &mut self,
        schema: &TableSchema,
        id: i64,
        values: &[BoundValue],
    ) -> Result<()> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(tx) => postgres::update(tx, schema, id, values).await,
            #[cfg(feature = "mysql")]
            Self::MySql(tx) => mysql::update(tx, schema, id, values).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(tx) => sqlite::update(tx, schema, id, values).await,
        }
    }

    /// Delete the row with the given primary key; `true` if a row was removed
    pub async fn delete(&mut self, schema: &TableSchema, id: i64) -> Result<bool> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(tx) => postgres::delete(tx, schema, id).await,
            #[cfg(feature = "mysql")]
            Self::MySql(tx) => mysql::delete(tx, schema, id).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(tx) => sqlite::delete(tx, schema, id).await,
        }
    }

    /// Commit the transaction
    pub async fn commit(self) -> Result<()> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(tx) => tx.commit().await?,
            #[cfg(feature = "mysql")]
            Self::MySql(tx) => tx.commit().await?,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(tx) => tx.commit().await?,
        }
        Ok(())
    }

    /// Roll back explicitly (dropping has the same effect)
    pub async fn rollback(self) -> Result<()> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(tx) => tx.rollback().await?,
            #[cfg(feature = "mysql")]
            Self::MySql(tx) => tx.rollback().await?,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(tx) => tx.rollback().await?,
        }
        Ok(())
    }
}

// =============================================================================
// Shared SQL building
// =============================================================================

/// Columns included in reads: everything except raw binary
pub(crate) fn selected_columns(schema: &TableSchema) -> Vec<&Column> {
    schema
        .columns
        .iter()
        .filter(|c| c.kind != ColumnKind::Binary || c.is_file())
        .collect()
}

/// Build the SELECT list with per-dialect text casts
pub(crate) fn select_list(schema: &TableSchema, dialect: Dialect) -> String {
    selected_columns(schema)
        .iter()
        .map(|c| {
            let q = dialect.quote(&c.name);
            match dialect {
                #[cfg(feature = "postgres")]
                Dialect::Postgres => format!("{q}::text AS {q}"),
                #[cfg(feature = "mysql")]
                Dialect::MySql => format!("CAST({q} AS CHAR) AS {q}"),
                #[cfg(feature = "sqlite")]
                Dialect::Sqlite => format!("CAST({q} AS TEXT) AS {q}"),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT ... FROM t WHERE pk = <ph> LIMIT 1`
pub(crate) fn build_select_by_id(schema: &TableSchema, dialect: Dialect) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = {} LIMIT 1",
        select_list(schema, dialect),
        dialect.quote(&schema.table),
        dialect.quote(&schema.primary_key),
        dialect.placeholder(1),
    )
}

/// `INSERT INTO t (...) VALUES (...)` without any RETURNING clause
pub(crate) fn build_insert(schema: &TableSchema, values: &[BoundValue], dialect: Dialect) -> String {
    let cols = values
        .iter()
        .map(|v| dialect.quote(&v.column))
        .collect::<Vec<_>>()
        .join(", ");
    let params = values
        .iter()
        .enumerate()
        .map(|(i, v)| write_placeholder(dialect, i + 1, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({cols}) VALUES ({params})",
        dialect.quote(&schema.table)
    )
}

/// `UPDATE t SET ... WHERE pk = <ph>`
pub(crate) fn build_update(schema: &TableSchema, values: &[BoundValue], dialect: Dialect) -> String {
    let sets = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            format!(
                "{} = {}",
                dialect.quote(&v.column),
                write_placeholder(dialect, i + 1, v)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {sets} WHERE {} = {}",
        dialect.quote(&schema.table),
        dialect.quote(&schema.primary_key),
        dialect.placeholder(values.len() + 1),
    )
}

/// `DELETE FROM t WHERE pk = <ph>`
pub(crate) fn build_delete(schema: &TableSchema, dialect: Dialect) -> String {
    format!(
        "DELETE FROM {} WHERE {} = {}",
        dialect.quote(&schema.table),
        dialect.quote(&schema.primary_key),
        dialect.placeholder(1),
    )
}

/// List and count statements plus the number of search bindings
///
/// The order column must already be whitelisted against the schema.
pub(crate) fn build_list(
    schema: &TableSchema,
    query: &ListQuery,
    order_col: &str,
    dialect: Dialect,
) -> (String, String, usize) {
    let table = dialect.quote(&schema.table);
    let mut search_binds = 0;
    let mut where_clause = String::new();

    if query.search.is_some() {
        let like = match dialect {
            #[cfg(feature = "postgres")]
            Dialect::Postgres => "ILIKE",
            #[cfg(any(feature = "mysql", feature = "sqlite"))]
            _ => "LIKE",
        };
        let terms: Vec<String> = schema
            .searchable_columns()
            .enumerate()
            .map(|(i, c)| format!("{} {like} {}", dialect.quote(&c.name), dialect.placeholder(i + 1)))
            .collect();
        search_binds = terms.len();
        if !terms.is_empty() {
            where_clause = format!(" WHERE ({})", terms.join(" OR "));
        }
    }

    let order = format!(
        " ORDER BY {} {}",
        dialect.quote(order_col),
        query.direction.as_sql()
    );
    let limit = format!(
        " LIMIT {} OFFSET {}",
        dialect.placeholder(search_binds + 1),
        dialect.placeholder(search_binds + 2),
    );

    let select = format!(
        "SELECT {} FROM {table}{where_clause}{order}{limit}",
        select_list(schema, dialect)
    );
    let count = format!("SELECT COUNT(*) FROM {table}{where_clause}");
    (select, count, search_binds)
}

/// Placeholder for one bound value, adding server-side casts on PostgreSQL
///
/// Text-bound decimal/temporal/json/uuid/enum parameters need an explicit
/// cast because PostgreSQL type-checks bound parameters; the cast target is
/// the catalog-reported type name (the udt name for enums).
fn write_placeholder(dialect: Dialect, n: usize, value: &BoundValue) -> String {
    match dialect {
        #[cfg(feature = "postgres")]
        Dialect::Postgres => {
            let base = format!("${n}");
            let needs_cast = matches!(
                value.kind,
                ColumnKind::Date
                    | ColumnKind::Time
                    | ColumnKind::DateTime
                    | ColumnKind::Json
                    | ColumnKind::Uuid
                    | ColumnKind::Decimal
                    | ColumnKind::Enum(_)
            );
            if needs_cast {
                if matches!(value.kind, ColumnKind::Enum(_)) {
                    format!("{base}::{}", dialect.quote(&value.sql_type))
                } else {
                    format!("{base}::{}", value.sql_type)
                }
            } else {
                base
            }
        }
        #[cfg(any(feature = "mysql", feature = "sqlite"))]
        _ => {
            let _ = value;
            dialect.placeholder(n)
        }
    }
}
