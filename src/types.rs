// =============================================================================
// Shared types used across the aggregate dashboard
// =============================================================================

use chrono::NaiveDateTime;
use serde::Serialize;

/// Column holding the minute bucket key.
pub const TS_COLUMN: &str = "ts_min";
/// Column holding buy-side volume.
pub const BUY_COLUMN: &str = "buy_qty";
/// Column holding sell-side volume.
pub const SELL_COLUMN: &str = "sell_qty";

/// A single cell as read from the store.
///
/// Mirrors the SQLite storage classes, plus `Timestamp` for the normalised
/// `ts_min` column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl CellValue {
    /// Numeric view of the cell. Text is parsed if it looks like a number;
    /// everything else yields NaN.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(v) => *v as f64,
            Self::Real(v) => *v,
            Self::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
            Self::Null | Self::Blob(_) | Self::Timestamp(_) => f64::NAN,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(v) => write!(f, "{v}"),
            // Debug keeps the decimal part: REAL 10.0 shows as "10.0".
            Self::Real(v) => write!(f, "{v:?}"),
            Self::Text(s) => f.write_str(s),
            Self::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
            Self::Timestamp(ts) => write!(f, "{ts}"),
        }
    }
}

/// One minute-resolution bucket of buy/sell volume.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub ts_min: NaiveDateTime,
    pub buy_qty: f64,
    pub sell_qty: f64,
    /// Every column of the row in result-column order. The `ts_min` cell
    /// holds the parsed timestamp.
    pub cells: Vec<CellValue>,
}

impl AggregateRow {
    /// Zero-safe buy pressure: `buy / (sell + 1)`.
    pub fn ratio(&self) -> f64 {
        self.buy_qty / (self.sell_qty + 1.0)
    }
}

/// Rows from one load, ascending by `ts_min`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateBatch {
    pub columns: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

/// Result of a successful load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The store is reachable but holds no buckets yet.
    Empty,
    Rows(AggregateBatch),
}

impl LoadOutcome {
    pub fn row_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Rows(batch) => batch.rows.len(),
        }
    }
}

/// Where the refresh driver currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverPhase {
    IdleWaiting,
    Refreshing,
}

impl Default for DriverPhase {
    fn default() -> Self {
        Self::IdleWaiting
    }
}

impl std::fmt::Display for DriverPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdleWaiting => write!(f, "IdleWaiting"),
            Self::Refreshing => write!(f, "Refreshing"),
        }
    }
}
