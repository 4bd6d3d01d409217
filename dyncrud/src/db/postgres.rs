//! PostgreSQL catalog queries and statement execution
//!
//! Schema comes from `information_schema.columns` joined against the system
//! catalogs for what the information schema does not expose: column comments
//! (`col_description`), primary key membership (`pg_index`) and enum labels
//! (`pg_enum`).

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::db::{
    build_delete, build_insert, build_list, build_select_by_id, build_update, selected_columns,
    BoundValue, Dialect, ListQuery, Record, SqlValue,
};
use crate::error::{DynCrudError, Result};
use crate::schema::{Column, ColumnKind, ColumnMeta, TableSchema};

const SCHEMA_SQL: &str = "\
SELECT c.column_name,
       c.data_type,
       c.udt_name,
       c.is_nullable,
       c.column_default,
       c.character_maximum_length,
       col_description(a.attrelid, a.attnum) AS column_comment,
       COALESCE(i.indisprimary, FALSE) AS is_primary
FROM information_schema.columns c
JOIN pg_class t ON t.relname = c.table_name AND t.relkind IN ('r', 'p')
JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
LEFT JOIN pg_index i
       ON i.indrelid = t.oid AND a.attnum = ANY(i.indkey) AND i.indisprimary
WHERE c.table_name = $1 AND c.table_schema = current_schema()
ORDER BY c.ordinal_position";

const ENUM_SQL: &str = "\
SELECT e.enumlabel
FROM pg_type ty
JOIN pg_enum e ON e.enumtypid = ty.oid
WHERE ty.typname = $1
ORDER BY e.enumsortorder";

pub(crate) async fn table_schema(pool: &PgPool, table: &str) -> Result<TableSchema> {
    let rows = sqlx::query(SCHEMA_SQL).bind(table).fetch_all(pool).await?;

    if rows.is_empty() {
        return Err(sqlx::Error::RowNotFound.into());
    }

    let mut columns = Vec::with_capacity(rows.len());
    let mut primary_key: Option<String> = None;

    for row in &rows {
        let name: String = row.try_get("column_name")?;
        let data_type: String = row.try_get("data_type")?;
        let udt_name: String = row.try_get("udt_name")?;
        let is_nullable: String = row.try_get("is_nullable")?;
        let default: Option<String> = row.try_get("column_default")?;
        let max_length: Option<i32> = row.try_get("character_maximum_length")?;
        let comment: Option<String> = row.try_get("column_comment")?;
        let is_primary: bool = row.try_get("is_primary")?;

        let (kind, sql_type) = parse_kind(pool, &data_type, &udt_name).await?;
        if is_primary && primary_key.is_none() {
            primary_key = Some(name.clone());
        }

        columns.push(Column {
            name,
            sql_type,
            kind,
            nullable: is_nullable.eq_ignore_ascii_case("YES"),
            default,
            is_primary,
            max_length: max_length.and_then(|l| u32::try_from(l).ok()),
            meta: comment.as_deref().and_then(ColumnMeta::parse),
        });
    }

    let primary_key = primary_key.ok_or_else(|| DynCrudError::NoPrimaryKey(table.to_string()))?;

    Ok(TableSchema {
        table: table.to_string(),
        primary_key,
        columns,
    })
}

/// Map `data_type`/`udt_name` to a kind plus the cast target type name
///
/// `USER-DEFINED` columns require a catalog round trip to fetch enum labels;
/// user-defined types without labels degrade to text.
async fn parse_kind(
    pool: &PgPool,
    data_type: &str,
    udt_name: &str,
) -> Result<(ColumnKind, String)> {
    let kind = match data_type.to_ascii_lowercase().as_str() {
        "smallint" | "integer" | "bigint" => ColumnKind::Integer,
        "numeric" | "decimal" => ColumnKind::Decimal,
        "real" | "double precision" => ColumnKind::Float,
        "boolean" => ColumnKind::Boolean,
        "date" => ColumnKind::Date,
        "json" | "jsonb" => ColumnKind::Json,
        "bytea" => ColumnKind::Binary,
        "uuid" => ColumnKind::Uuid,
        "user-defined" => {
            let labels: Vec<String> = sqlx::query_scalar(ENUM_SQL)
                .bind(udt_name)
                .fetch_all(pool)
                .await?;
            if labels.is_empty() {
                ColumnKind::Text
            } else {
                return Ok((ColumnKind::Enum(labels), udt_name.to_string()));
            }
        }
        other if other.starts_with("timestamp") => ColumnKind::DateTime,
        other if other.starts_with("time") => ColumnKind::Time,
        _ => ColumnKind::Text,
    };
    Ok((kind, data_type.to_string()))
}

fn record_from_row(row: &PgRow, schema: &TableSchema) -> Result<Record> {
    let mut record = Record::new();
    for column in selected_columns(schema) {
        record.insert(
            column.name.clone(),
            row.try_get::<Option<String>, _>(column.name.as_str())?,
        );
    }
    Ok(record)
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    value: &BoundValue,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    match &value.value {
        // Typed NULLs: the parameter type must satisfy the column even when
        // the value is absent.
        SqlValue::Null => match value.kind {
            ColumnKind::Integer => query.bind(None::<i64>),
            ColumnKind::Float => query.bind(None::<f64>),
            ColumnKind::Boolean => query.bind(None::<bool>),
            _ => query.bind(None::<String>),
        },
        SqlValue::Int(n) => query.bind(*n),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Text(s) => query.bind(s.clone()),
    }
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    schema: &TableSchema,
    id: i64,
) -> Result<Option<Record>> {
    let sql = build_select_by_id(schema, Dialect::Postgres);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.map(|r| record_from_row(&r, schema)).transpose()
}

pub(crate) async fn list(
    pool: &PgPool,
    schema: &TableSchema,
    query: &ListQuery,
    order_col: &str,
) -> Result<(Vec<Record>, u64)> {
    let (sql, count_sql, search_binds) = build_list(schema, query, order_col, Dialect::Postgres);
    let pattern = query.search.as_deref().map(|s| format!("%{s}%"));

    let mut select = sqlx::query(&sql);
    for _ in 0..search_binds {
        select = select.bind(pattern.clone());
    }
    select = select
        .bind(i64::from(query.per_page))
        .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
    let rows = select.fetch_all(pool).await?;

    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    for _ in 0..search_binds {
        count = count.bind(pattern.clone());
    }
    let total = count.fetch_one(pool).await?;

    let records = rows
        .iter()
        .map(|r| record_from_row(r, schema))
        .collect::<Result<Vec<_>>>()?;
    Ok((records, u64::try_from(total).unwrap_or(0)))
}

pub(crate) async fn insert(
    tx: &mut Transaction<'static, Postgres>,
    schema: &TableSchema,
    values: &[BoundValue],
) -> Result<i64> {
    let sql = format!(
        "{} RETURNING {}::bigint",
        build_insert(schema, values, Dialect::Postgres),
        Dialect::Postgres.quote(&schema.primary_key),
    );
    let mut query = sqlx::query(&sql);
    for value in values {
        query = bind_value(query, value);
    }
    let row = query.fetch_one(&mut **tx).await?;
    Ok(row.try_get::<i64, _>(0)?)
}

pub(crate) async fn update(
    tx: &mut Transaction<'static, Postgres>,
    schema: &TableSchema,
    id: i64,
    values: &[BoundValue],
) -> Result<()> {
    let sql = build_update(schema, values, Dialect::Postgres);
    let mut query = sqlx::query(&sql);
    for value in values {
        query = bind_value(query, value);
    }
    query.bind(id).execute(&mut **tx).await?;
    Ok(())
}

pub(crate) async fn delete(
    tx: &mut Transaction<'static, Postgres>,
    schema: &TableSchema,
    id: i64,
) -> Result<bool> {
    let sql = build_delete(schema, Dialect::Postgres);
    let result = sqlx::query(&sql).bind(id).execute(&mut **tx).await?;
    Ok(result.rows_affected() > 0)
}
