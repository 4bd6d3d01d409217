//! SQLite catalog queries and statement execution
//!
//! SQLite has no comment channel, so columns never carry UI metadata here.
//! Type parsing follows SQLite's affinity rules over the declared type name.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::db::{
    build_delete, build_insert, build_list, build_select_by_id, build_update, selected_columns,
    BoundValue, Dialect, ListQuery, Record, SqlValue,
};
use crate::error::Result;
use crate::schema::{Column, ColumnKind, TableSchema};

pub(crate) async fn table_schema(pool: &SqlitePool, table: &str) -> Result<TableSchema> {
    let rows = sqlx::query(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Err(sqlx::Error::RowNotFound.into());
    }

    let mut columns = Vec::with_capacity(rows.len());
    let mut primary_key: Option<String> = None;

    for row in &rows {
        let name: String = row.try_get("name")?;
        let declared: String = row.try_get("type")?;
        let not_null: i64 = row.try_get("notnull")?;
        let default: Option<String> = row.try_get("dflt_value")?;
        let pk_position: i64 = row.try_get("pk")?;

        let (kind, max_length) = parse_kind(&declared);
        let is_primary = pk_position > 0;
        if pk_position == 1 {
            primary_key = Some(name.clone());
        }

        columns.push(Column {
            name,
            sql_type: declared,
            kind,
            nullable: not_null == 0,
            default,
            is_primary,
            max_length,
            meta: None,
        });
    }

    let primary_key =
        primary_key.ok_or_else(|| crate::error::DynCrudError::NoPrimaryKey(table.to_string()))?;

    Ok(TableSchema {
        table: table.to_string(),
        primary_key,
        columns,
    })
}

/// Map a declared SQLite type to a kind, SQLite-affinity style
fn parse_kind(declared: &str) -> (ColumnKind, Option<u32>) {
    let upper = declared.to_ascii_uppercase();
    let max_length = upper
        .split_once('(')
        .and_then(|(_, rest)| rest.trim_end_matches(')').split(',').next())
        .and_then(|n| n.trim().parse().ok());

    let kind = if upper.contains("DATETIME") || upper.contains("TIMESTAMP") {
        ColumnKind::DateTime
    } else if upper.contains("DATE") {
        ColumnKind::Date
    } else if upper.contains("TIME") {
        ColumnKind::Time
    } else if upper.contains("BOOL") {
        ColumnKind::Boolean
    } else if upper.contains("INT") {
        ColumnKind::Integer
    } else if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
        ColumnKind::Decimal
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        ColumnKind::Float
    } else if upper.contains("JSON") {
        ColumnKind::Json
    } else if upper.contains("BLOB") || upper.is_empty() {
        ColumnKind::Binary
    } else {
        ColumnKind::Text
    };
    (kind, max_length)
}

fn record_from_row(row: &SqliteRow, schema: &TableSchema) -> Result<Record> {
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
    query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    value: &BoundValue,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match &value.value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Int(n) => query.bind(*n),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Text(s) => query.bind(s.clone()),
    }
}

pub(crate) async fn find_by_id(
    pool: &SqlitePool,
    schema: &TableSchema,
    id: i64,
) -> Result<Option<Record>> {
    let sql = build_select_by_id(schema, Dialect::Sqlite);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.map(|r| record_from_row(&r, schema)).transpose()
}

pub(crate) async fn list(
    pool: &SqlitePool,
    schema: &TableSchema,
    query: &ListQuery,
    order_col: &str,
) -> Result<(Vec<Record>, u64)> {
    let (sql, count_sql, search_binds) = build_list(schema, query, order_col, Dialect::Sqlite);
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
    tx: &mut Transaction<'static, Sqlite>,
    schema: &TableSchema,
    values: &[BoundValue],
) -> Result<i64> {
    let sql = build_insert(schema, values, Dialect::Sqlite);
    let mut query = sqlx::query(&sql);
    for value in values {
        query = bind_value(query, value);
    }
    let result = query.execute(&mut **tx).await?;
    Ok(result.last_insert_rowid())
}

pub(crate) async fn update(
    tx: &mut Transaction<'static, Sqlite>,
    schema: &TableSchema,
    id: i64,
    values: &[BoundValue],
) -> Result<()> {
    let sql = build_update(schema, values, Dialect::Sqlite);
    let mut query = sqlx::query(&sql);
    for value in values {
        query = bind_value(query, value);
    }
    query.bind(id).execute(&mut **tx).await?;
    Ok(())
}

pub(crate) async fn delete(
    tx: &mut Transaction<'static, Sqlite>,
    schema: &TableSchema,
    id: i64,
) -> Result<bool> {
    let sql = build_delete(schema, Dialect::Sqlite);
    let result = sqlx::query(&sql).bind(id).execute(&mut **tx).await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_affinities() {
        assert_eq!(parse_kind("INTEGER").0, ColumnKind::Integer);
        assert_eq!(parse_kind("VARCHAR(120)"), (ColumnKind::Text, Some(120)));
        assert_eq!(parse_kind("BOOLEAN").0, ColumnKind::Boolean);
        assert_eq!(parse_kind("DATETIME").0, ColumnKind::DateTime);
        assert_eq!(parse_kind("DATE").0, ColumnKind::Date);
        assert_eq!(parse_kind("DECIMAL(10,2)"), (ColumnKind::Decimal, Some(10)));
        assert_eq!(parse_kind("BLOB").0, ColumnKind::Binary);
        assert_eq!(parse_kind("").0, ColumnKind::Binary);
        assert_eq!(parse_kind("TEXT").0, ColumnKind::Text);
    }
}
