//! MySQL catalog queries and statement execution
//!
//! Schema comes from `information_schema.COLUMNS` for the current database.
//! Everything is selected as CHAR so decoding does not depend on the server's
//! `information_schema` column types, which changed between 5.7 and 8.0.

use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, Row, Transaction};

use crate::db::{
    build_delete, build_insert, build_list, build_select_by_id, build_update, selected_columns,
    BoundValue, Dialect, ListQuery, Record, SqlValue,
};
use crate::error::{DynCrudError, Result};
use crate::schema::{Column, ColumnKind, ColumnMeta, TableSchema};

const SCHEMA_SQL: &str = "\
SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
       CAST(DATA_TYPE AS CHAR) AS data_type,
       CAST(COLUMN_TYPE AS CHAR) AS column_type,
       CAST(IS_NULLABLE AS CHAR) AS is_nullable,
       CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
       CAST(COLUMN_KEY AS CHAR) AS column_key,
       CAST(COLUMN_COMMENT AS CHAR) AS column_comment,
       CAST(CHARACTER_MAXIMUM_LENGTH AS CHAR) AS character_maximum_length
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
ORDER BY ORDINAL_POSITION";

pub(crate) async fn table_schema(pool: &MySqlPool, table: &str) -> Result<TableSchema> {
    let rows = sqlx::query(SCHEMA_SQL).bind(table).fetch_all(pool).await?;

    if rows.is_empty() {
        return Err(sqlx::Error::RowNotFound.into());
    }

    let mut columns = Vec::with_capacity(rows.len());
    let mut primary_key: Option<String> = None;

    for row in &rows {
        let name: String = row.try_get("column_name")?;
        let data_type: String = row.try_get("data_type")?;
        let column_type: String = row.try_get("column_type")?;
        let is_nullable: String = row.try_get("is_nullable")?;
        let default: Option<String> = row.try_get("column_default")?;
        let column_key: Option<String> = row.try_get("column_key")?;
        let comment: Option<String> = row.try_get("column_comment")?;
        let max_length: Option<String> = row.try_get("character_maximum_length")?;

        let kind = parse_kind(&data_type, &column_type);
        let is_primary = column_key.as_deref() == Some("PRI");
        if is_primary && primary_key.is_none() {
            primary_key = Some(name.clone());
        }

        columns.push(Column {
            name,
            sql_type: data_type,
            kind,
            nullable: is_nullable.eq_ignore_ascii_case("YES"),
            default,
            is_primary,
            max_length: max_length.and_then(|l| l.parse().ok()),
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

/// Map `DATA_TYPE`/`COLUMN_TYPE` to a kind
///
/// `COLUMN_TYPE` disambiguates `tinyint(1)` (boolean by MySQL convention)
/// and carries the value list for `enum`/`set` columns.
fn parse_kind(data_type: &str, column_type: &str) -> ColumnKind {
    match data_type.to_ascii_lowercase().as_str() {
        "tinyint" => {
            if column_type.to_ascii_lowercase().starts_with("tinyint(1)") {
                ColumnKind::Boolean
            } else {
                ColumnKind::Integer
            }
        }
        "int" | "integer" | "smallint" | "mediumint" | "bigint" | "year" => ColumnKind::Integer,
        "decimal" | "numeric" => ColumnKind::Decimal,
        "float" | "double" => ColumnKind::Float,
        "date" => ColumnKind::Date,
        "time" => ColumnKind::Time,
        "datetime" | "timestamp" => ColumnKind::DateTime,
        "json" => ColumnKind::Json,
        "enum" | "set" => ColumnKind::Enum(parse_enum_values(column_type)),
        "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" | "bit" => {
            ColumnKind::Binary
        }
        _ => ColumnKind::Text,
    }
}

/// Extract the quoted values from `enum('a','b',...)` / `set(...)`
///
/// MySQL doubles embedded quotes in `COLUMN_TYPE` and may backslash-escape
/// them depending on `sql_mode`; both forms are handled.
pub(crate) fn parse_enum_values(column_type: &str) -> Vec<String> {
    let Some(open) = column_type.find('(') else {
        return Vec::new();
    };
    let body = &column_type[open + 1..column_type.rfind(')').unwrap_or(column_type.len())];

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '\'' => {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        current.push('\'');
                    } else {
                        in_quotes = false;
                        values.push(std::mem::take(&mut current));
                    }
                }
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                _ => current.push(c),
            }
        } else if c == '\'' {
            in_quotes = true;
        }
    }
    values
}

fn record_from_row(row: &MySqlRow, schema: &TableSchema) -> Result<Record> {
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
    query: sqlx::query::Query<'q, MySql, sqlx::mysql::MySqlArguments>,
    value: &BoundValue,
) -> sqlx::query::Query<'q, MySql, sqlx::mysql::MySqlArguments> {
    match &value.value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Int(n) => query.bind(*n),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Text(s) => query.bind(s.clone()),
    }
}

pub(crate) async fn find_by_id(
    pool: &MySqlPool,
    schema: &TableSchema,
    id: i64,
) -> Result<Option<Record>> {
    let sql = build_select_by_id(schema, Dialect::MySql);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.map(|r| record_from_row(&r, schema)).transpose()
}

pub(crate) async fn list(
    pool: &MySqlPool,
    schema: &TableSchema,
    query: &ListQuery,
    order_col: &str,
) -> Result<(Vec<Record>, u64)> {
    let (sql, count_sql, search_binds) = build_list(schema, query, order_col, Dialect::MySql);
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
    tx: &mut Transaction<'static, MySql>,
    schema: &TableSchema,
    values: &[BoundValue],
) -> Result<i64> {
    let sql = build_insert(schema, values, Dialect::MySql);
    let mut query = sqlx::query(&sql);
    for value in values {
        query = bind_value(query, value);
    }
    let result = query.execute(&mut **tx).await?;
    i64::try_from(result.last_insert_id()).map_err(|_| DynCrudError::Coerce {
        column: schema.primary_key.clone(),
        message: "generated key exceeds i64".into(),
    })
}

pub(crate) async fn update(
    tx: &mut Transaction<'static, MySql>,
    schema: &TableSchema,
    id: i64,
    values: &[BoundValue],
) -> Result<()> {
    let sql = build_update(schema, values, Dialect::MySql);
    let mut query = sqlx::query(&sql);
    for value in values {
        query = bind_value(query, value);
    }
    query.bind(id).execute(&mut **tx).await?;
    Ok(())
}

pub(crate) async fn delete(
    tx: &mut Transaction<'static, MySql>,
    schema: &TableSchema,
    id: i64,
) -> Result<bool> {
    let sql = build_delete(schema, Dialect::MySql);
    let result = sqlx::query(&sql).bind(id).execute(&mut **tx).await?;
    Ok(result.rows_affected() > 0)
}
