// =============================================================================
// Aggregate Store Loader
// =============================================================================
//
// Reads the most recent minute buckets from the producer's SQLite file. The
// store is never written, created, or migrated from here: the connection is
// opened read-only for the duration of a single query and dropped on every
// exit path.
// =============================================================================

use std::path::Path;
use std::time::{Duration, Instant};

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use thiserror::Error;
use tracing::debug;

use crate::timestamp::parse_bucket_ts;
use crate::types::{
    AggregateBatch, AggregateRow, CellValue, LoadOutcome, BUY_COLUMN, SELL_COLUMN, TS_COLUMN,
};

/// Number of most recent buckets shown per refresh.
pub const ROW_LIMIT: u32 = 30;

const LATEST_QUERY: &str = "SELECT * FROM aggregates ORDER BY ts_min DESC LIMIT ?1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open store {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("query against aggregates failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("aggregates is missing required column `{0}`")]
    MissingColumn(&'static str),
    #[error("unparseable ts_min value `{value}`")]
    Timestamp { value: String },
}

/// Load the latest [`ROW_LIMIT`] buckets, ascending by `ts_min`.
///
/// An empty table is not an error and yields [`LoadOutcome::Empty`].
pub fn load_latest(path: &Path, busy_timeout: Duration) -> Result<LoadOutcome, StoreError> {
    let start = Instant::now();

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;
    let conn = Connection::open_with_flags(path, flags).map_err(|source| StoreError::Open {
        path: path.display().to_string(),
        source,
    })?;
    conn.busy_timeout(busy_timeout)?;

    let outcome = query_latest(&conn)?;

    debug!(
        rows = outcome.row_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "aggregates loaded"
    );
    Ok(outcome)
}

fn query_latest(conn: &Connection) -> Result<LoadOutcome, StoreError> {
    let mut stmt = conn.prepare(LATEST_QUERY)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut raw_rows: Vec<Vec<CellValue>> = Vec::new();
    let mut rows = stmt.query(params![ROW_LIMIT])?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            cells.push(cell_from_ref(row.get_ref(i)?));
        }
        raw_rows.push(cells);
    }

    // An empty table is the idle state whatever its schema.
    if raw_rows.is_empty() {
        return Ok(LoadOutcome::Empty);
    }

    let ts_idx = column_index(&columns, TS_COLUMN)?;
    let buy_idx = column_index(&columns, BUY_COLUMN)?;
    let sell_idx = column_index(&columns, SELL_COLUMN)?;

    let mut parsed = Vec::with_capacity(raw_rows.len());
    for mut cells in raw_rows {
        let ts_min = parse_bucket_ts(&cells[ts_idx]).ok_or_else(|| StoreError::Timestamp {
            value: cells[ts_idx].to_string(),
        })?;
        cells[ts_idx] = CellValue::Timestamp(ts_min);
        parsed.push(AggregateRow {
            ts_min,
            buy_qty: cells[buy_idx].as_f64(),
            sell_qty: cells[sell_idx].as_f64(),
            cells,
        });
    }

    // Query order is newest first; display order is oldest first.
    parsed.sort_by_key(|r| r.ts_min);

    Ok(LoadOutcome::Rows(AggregateBatch {
        columns,
        rows: parsed,
    }))
}

fn column_index(columns: &[String], name: &'static str) -> Result<usize, StoreError> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or(StoreError::MissingColumn(name))
}

fn cell_from_ref(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(v) => CellValue::Integer(v),
        ValueRef::Real(v) => CellValue::Real(v),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
    }
}

// =============================================================================
// Tests
// =============================================================================
