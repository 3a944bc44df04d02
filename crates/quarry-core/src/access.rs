//! Connection access abstraction.
//!
//! Drivers implement [`ConnectionAccess`] outside this workspace; sessions
//! own one behind a box and never see connection details. All calls are
//! synchronous and blocking: one session, one caller, one connection at a
//! time. Cancellation and timeouts belong to the driver.

use crate::feed::ResultFeed;
use crate::value::Value;
use crate::Result;

/// Synchronous access to one database connection.
///
/// `run_query` receives fully expanded SQL (placeholders already rendered
/// for the target dialect) and the flat bind values in placeholder order.
pub trait ConnectionAccess {
    /// Execute a query, returning a positioned feed over its results.
    fn run_query(&mut self, sql: &str, params: &[Value]) -> Result<Box<dyn ResultFeed>>;

    /// Execute a statement, returning the affected row count.
    fn run_update(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Begin a transaction.
    fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Release retained statement resources.
    ///
    /// Called by the session when an execution cycle ends under the
    /// after-statement release mode; drivers that hold nothing between
    /// statements may make this a no-op.
    fn release(&mut self) -> Result<()>;
}
