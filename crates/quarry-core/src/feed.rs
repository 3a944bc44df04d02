//! Positioned result feeds.
//!
//! A feed is the driver-side row source a scrollable cursor wraps: it can
//! occupy any absolute row position and hand back the raw row there.
//! Scrollable feeds know their extent; drivers that stream forward-only
//! results buffer them before exposing a feed.
//!
//! # Example
//!
//! ```
//! use quarry_core::feed::{BufferedFeed, ResultFeed};
//! use quarry_core::Value;
//!
//! let mut feed = BufferedFeed::new(vec!["id".to_string()]);
//! feed.push_row(vec![Value::BigInt(1)]);
//! feed.push_row(vec![Value::BigInt(2)]);
//!
//! assert_eq!(feed.row_count(), 2);
//! assert!(feed.occupy(2).unwrap());
//! assert_eq!(feed.current().unwrap().get(0), Some(&Value::BigInt(2)));
//! ```

use crate::error::{AccessError, AccessErrorKind, Error};
use crate::row::{ColumnInfo, Row};
use crate::value::Value;
use crate::Result;
use std::sync::Arc;

/// A positioned source of raw rows.
///
/// Positions are 1-based; `occupy` reports whether a row exists at the
/// requested position. Implementations release underlying resources in
/// `release` and refuse further positioning afterwards.
pub trait ResultFeed {
    /// Total number of rows in this feed.
    fn row_count(&self) -> usize;

    /// Move the feed to an absolute 1-based position.
    ///
    /// Returns `Ok(true)` when a row exists there. Positions outside
    /// `1..=row_count()` return `Ok(false)` and leave no row occupied.
    fn occupy(&mut self, position: usize) -> Result<bool>;

    /// The raw row at the occupied position, if one is occupied.
    fn current(&self) -> Option<&Row>;

    /// Release the underlying statement/result resources.
    fn release(&mut self) -> Result<()>;
}

/// In-memory feed over pre-fetched rows.
///
/// Backs tests and any driver that buffers scrollable results client-side.
#[derive(Debug)]
pub struct BufferedFeed {
    columns: Arc<ColumnInfo>,
    rows: Vec<Row>,
    occupied: Option<usize>,
    released: bool,
}

impl BufferedFeed {
    /// Create an empty feed with the given column names.
    pub fn new(column_names: Vec<String>) -> Self {
        Self {
            columns: Arc::new(ColumnInfo::new(column_names)),
            rows: Vec::new(),
            occupied: None,
            released: false,
        }
    }

    /// Append one row of values in column order.
    pub fn push_row(&mut self, values: Vec<Value>) {
        self.rows
            .push(Row::with_columns(Arc::clone(&self.columns), values));
    }

    /// Build a feed from column names and row values in one call.
    #[must_use]
    pub fn with_rows(column_names: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut feed = Self::new(column_names);
        for values in rows {
            feed.push_row(values);
        }
        feed
    }

    /// Shared column metadata for this feed.
    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    /// Has `release` been called?
    pub const fn is_released(&self) -> bool {
        self.released
    }
}

impl ResultFeed for BufferedFeed {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn occupy(&mut self, position: usize) -> Result<bool> {
        if self.released {
            return Err(Error::Access(AccessError {
                kind: AccessErrorKind::Statement,
                message: "result feed already released".to_string(),
                source: None,
            }));
        }
        if position >= 1 && position <= self.rows.len() {
            self.occupied = Some(position);
            Ok(true)
        } else {
            self.occupied = None;
            Ok(false)
        }
    }

    fn current(&self) -> Option<&Row> {
        self.occupied.and_then(|p| self.rows.get(p - 1))
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        self.occupied = None;
        Ok(())
    }
}
