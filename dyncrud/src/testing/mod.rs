//! Test utilities (SQLite-backed)
//!
//! In-memory SQLite gives the fast path for exercising the whole pipeline
//! without a server; these helpers are available to integration tests and to
//! applications that want the same convenience.

use crate::db::CrudPool;
use crate::error::Result;

/// Connect an in-memory SQLite pool
///
/// Each call returns an isolated database.
pub async fn sqlite_pool() -> Result<CrudPool> {
    // A single connection keeps every query on the same in-memory database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    Ok(CrudPool::from(pool))
}

/// Connect an in-memory SQLite pool and apply schema DDL
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> dyncrud::error::Result<()> {
/// let pool = dyncrud::testing::sqlite_pool_with_schema(
///     "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL)",
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn sqlite_pool_with_schema(ddl: &str) -> Result<CrudPool> {
    let pool = sqlite_pool().await?;
    for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        pool.execute_raw(statement).await?;
    }
    Ok(pool)
}
