//! Core types and traits for Quarry.
//!
//! This crate provides the foundational abstractions the session and query
//! layers build on:
//!
//! - `Value` dynamic SQL values and `Row`/`ColumnInfo` result rows
//! - `EntityRecord`/`EntityKey` identity-map payloads
//! - `ConnectionAccess` and `ResultFeed` connectivity seams
//! - `CacheMode`, `LockOptions`, `ReleaseMode` load-time knobs
//! - `RuntimeSettings` factory configuration
//! - the workspace `Error`/`Result` types

pub mod access;
pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod feed;
pub mod lock;
pub mod row;
pub mod value;

pub use access::ConnectionAccess;
pub use cache::CacheMode;
pub use config::{ReleaseMode, RuntimeSettings};
pub use entity::{Attachment, EntityKey, EntityRecord, EntityStatus};
pub use error::{Error, Result};
pub use feed::{BufferedFeed, ResultFeed};
pub use lock::{LockMode, LockOptions, LockWait};
pub use row::{ColumnInfo, FromRow, FromValue, Row};
pub use value::Value;
