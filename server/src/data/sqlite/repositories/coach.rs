//! Coach record repository for SQLite operations
//!
//! Master and history records share one code path; the record kind picks
//! the table, the column list and the key column. Writes take a connection
//! so callers can group them with an audit insert in one transaction.

use std::cmp::Ordering;

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Connection, Row, Sqlite, SqliteConnection, SqlitePool};

use crate::core::constants::SQLITE_MAX_BIND_PARAMS;
use crate::data::filters::{Predicate, SqlParams};
use crate::data::sql::{SqlDialect, SqliteDialect};
use crate::data::sqlite::SqliteError;
use crate::data::types::{
    DATE_FORMAT, FieldKind, FieldValue, IDENTITY_FIELD, Record, RecordError, RecordKind,
    check_value, parse_date,
};
use crate::utils::sql::in_placeholders;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind a typed value; integral numbers bind as integers, dates as ISO text
fn bind_value<'q>(query: SqliteQuery<'q>, value: &FieldValue) -> SqliteQuery<'q> {
    match value {
        FieldValue::Null => query.bind(None::<String>),
        FieldValue::Text(s) => query.bind(s.clone()),
        FieldValue::Number(n) => match value.as_integer() {
            Some(i) => query.bind(i),
            None => query.bind(*n),
        },
        FieldValue::Date(d) => query.bind(d.format(DATE_FORMAT).to_string()),
        FieldValue::Boolean(b) => query.bind(*b),
    }
}

/// Decode a row selected with the kind's full column list
fn decode_row(kind: RecordKind, row: &SqliteRow) -> Result<Record, SqliteError> {
    let mut record = Record::new(kind);
    for spec in kind.fields() {
        // Unchecked: NUMERIC columns hold INTEGER or REAL storage classes
        let value = match spec.kind {
            FieldKind::Text => row
                .try_get_unchecked::<Option<String>, _>(spec.name)?
                .map(FieldValue::Text),
            FieldKind::Number => row
                .try_get_unchecked::<Option<f64>, _>(spec.name)?
                .map(FieldValue::Number),
            FieldKind::Boolean => row
                .try_get_unchecked::<Option<bool>, _>(spec.name)?
                .map(FieldValue::Boolean),
            FieldKind::Date => row
                .try_get_unchecked::<Option<String>, _>(spec.name)?
                .and_then(|s| parse_date(&s))
                .map(FieldValue::Date),
        };
        if let Some(value) = value {
            record.set(spec.name, value)?;
        }
    }
    Ok(record)
}

fn select_columns(kind: RecordKind) -> String {
    kind.filterable_columns().join(", ")
}

fn ensure_columns(kind: RecordKind, predicate: &Predicate) -> Result<(), SqliteError> {
    match predicate.columns().into_iter().find(|c| kind.field(c).is_none()) {
        Some(column) => Err(SqliteError::UnknownColumn {
            kind,
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

fn by_key(kind: RecordKind) -> impl Fn(&Record, &Record) -> Ordering {
    let key = kind.order_column();
    move |a, b| a.get(key).compare(b.get(key)).unwrap_or(Ordering::Equal)
}

/// Insert records, updating the columns they set when the key already exists
///
/// Master rows are keyed by coach number; history rows by `id`, so a history
/// record without an id is always appended. Returns affected row count.
pub async fn upsert_records(
    conn: &mut SqliteConnection,
    records: &[Record],
) -> Result<u64, SqliteError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = conn.begin().await?;
    let mut affected = 0;

    for record in records {
        let kind = record.kind();
        if record.identity().is_none() {
            return Err(RecordError::MissingIdentity(kind).into());
        }

        let key = kind.order_column();
        let columns: Vec<&str> = record.fields_set().map(|(name, _)| name).collect();
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| **c != key)
            .map(|c| format!("{} = excluded.{}", c, c))
            .collect();
        let on_conflict = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
            kind.table(),
            columns.join(", "),
            in_placeholders(columns.len()),
            key,
            on_conflict
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in record.fields_set() {
            query = bind_value(query, value);
        }
        affected += query.execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;

    tracing::debug!(records = records.len(), affected, "Upserted coach records");
    Ok(affected)
}

/// Search records matching a compiled predicate, ordered by key
pub async fn search_records(
    pool: &SqlitePool,
    kind: RecordKind,
    predicate: &Predicate,
    limit: u32,
    offset: u32,
) -> Result<Vec<Record>, SqliteError> {
    ensure_columns(kind, predicate)?;

    let dialect = SqliteDialect;
    let mut params = SqlParams::default();
    let where_sql = predicate.to_sql(&dialect, &mut params);
    let sql = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {} {}",
        select_columns(kind),
        kind.table(),
        where_sql,
        kind.order_column(),
        dialect.limit_offset(limit, offset)
    );

    let mut query = sqlx::query(&sql);
    for value in &params.values {
        query = bind_value(query, value);
    }
    let rows = query.fetch_all(pool).await?;

    tracing::debug!(
        %kind,
        predicate = %predicate,
        rows = rows.len(),
        "Searched coach records"
    );
    rows.iter().map(|row| decode_row(kind, row)).collect()
}

/// Count records matching a compiled predicate
pub async fn count_records(
    pool: &SqlitePool,
    kind: RecordKind,
    predicate: &Predicate,
) -> Result<i64, SqliteError> {
    ensure_columns(kind, predicate)?;

    let mut params = SqlParams::default();
    let where_sql = predicate.to_sql(&SqliteDialect, &mut params);
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", kind.table(), where_sql);

    let mut query = sqlx::query(&sql);
    for value in &params.values {
        query = bind_value(query, value);
    }
    let row = query.fetch_one(pool).await?;
    Ok(row.try_get::<i64, _>(0)?)
}

/// Fetch records for the given coach numbers, ordered by key
///
/// Unknown coach numbers are skipped; compare identities to find them.
pub async fn get_records(
    conn: &mut SqliteConnection,
    kind: RecordKind,
    coachnos: &[String],
) -> Result<Vec<Record>, SqliteError> {
    let mut records = Vec::with_capacity(coachnos.len());

    for chunk in coachnos.chunks(SQLITE_MAX_BIND_PARAMS) {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} IN ({})",
            select_columns(kind),
            kind.table(),
            IDENTITY_FIELD,
            in_placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for coachno in chunk {
            query = query.bind(coachno.clone());
        }
        for row in query.fetch_all(&mut *conn).await? {
            records.push(decode_row(kind, &row)?);
        }
    }

    records.sort_by(by_key(kind));
    Ok(records)
}

/// Set one field on every record of the given coaches
///
/// Returns the number of rows changed.
pub async fn update_field(
    conn: &mut SqliteConnection,
    kind: RecordKind,
    coachnos: &[String],
    field: &str,
    value: &FieldValue,
) -> Result<u64, SqliteError> {
    check_value(kind, field, value)?;
    if field == IDENTITY_FIELD || field == kind.order_column() {
        return Err(SqliteError::ReadOnlyColumn {
            kind,
            column: field.to_string(),
        });
    }
    if coachnos.is_empty() {
        return Ok(0);
    }

    let mut tx = conn.begin().await?;
    let mut affected = 0;

    for chunk in coachnos.chunks(SQLITE_MAX_BIND_PARAMS - 1) {
        let sql = format!(
            "UPDATE {} SET {} = ? WHERE {} IN ({})",
            kind.table(),
            field,
            IDENTITY_FIELD,
            in_placeholders(chunk.len())
        );
        let mut query = bind_value(sqlx::query(&sql), value);
        for coachno in chunk {
            query = query.bind(coachno.clone());
        }
        affected += query.execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;

    tracing::debug!(
        %kind,
        field,
        coaches = coachnos.len(),
        affected,
        "Updated coach field"
    );
    Ok(affected)
}
