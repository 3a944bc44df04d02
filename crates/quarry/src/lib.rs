//! Quarry - session, cursor, and batch-load runtime for SQL object mapping.
//!
//! Quarry is the runtime support layer an object-relational mapper sits on:
//!
//! - Scrollable result cursors with per-position row materialization
//! - Multi-identifier and natural-id batch loads with guaranteed
//!   restoration of the ambient session state they override
//! - Factory-registered filters rendered against per-query table aliases
//! - Query specs with named parameters, dialect-aware expansion, and
//!   empty-list short-circuiting
//!
//! # Quick Start
//!
//! ```ignore
//! use quarry::prelude::*;
//!
//! let factory = Arc::new(
//!     SessionFactory::builder()
//!         .settings(RuntimeSettings::new().batch_size(32))
//!         .register_profile(FetchProfile::new("order-with-lines"))
//!         .register_filter("tenant", "{alias}.tenant_id = :tenant", false)?
//!         .build(),
//! );
//!
//! let mut session = factory.open_session(Box::new(driver_access));
//!
//! let spec = QuerySpec::new("SELECT id, total FROM orders WHERE region = :region")
//!     .bind("region", "emea")?;
//! let mut cursor = session.scroll(&spec, ResultRowReader::new())?;
//! while cursor.next()? {
//!     let row = cursor.get()?;
//!     // ...
//! }
//! cursor.close();
//!
//! let found = session
//!     .multi_load("Order")
//!     .with_cache_mode(CacheMode::Ignore)
//!     .enable_fetch_profile("order-with-lines")
//!     .load(&mut loader, &ids)?;
//! ```

// Re-export the public surface of the sub-crates
pub use quarry_core::{
    Attachment, BufferedFeed, CacheMode, ColumnInfo, ConnectionAccess, EntityKey, EntityRecord,
    EntityStatus, Error, FromRow, FromValue, LockMode, LockOptions, LockWait, ReleaseMode, Result,
    ResultFeed, Row, RuntimeSettings, Value,
};
pub use quarry_query::{
    scan_parameters, AliasResolver, CompiledCondition, ConditionInterner, Dialect, ExpandedQuery,
    FilterDefinition, FilterInstance, GroupAliasResolver, IndexedAliasResolver, ParamValue,
    QueryOptions, QuerySpec, StaticAliasResolver, TableGroup,
};
pub use quarry_session::{
    AppliedGraph, BatchFetchOptions, BatchLoader, CursorState, EmptyCursor, EntityReader,
    FetchGraph, FetchOverride, FetchProfile, FetchStrategy, GraphSemantic, HolderReader,
    LoadInfluencers, MultiLoadAccess, NaturalIdBatchLoader, NaturalIdMultiLoadAccess,
    PersistenceContext, ResultRowReader, RowReader, RowValue, ScrollCursor, ScrollableCursor,
    Session, SessionCursor, SessionFactory, SessionFactoryBuilder,
};

/// Everything most callers need, in one import.
pub mod prelude {
    pub use quarry_core::{
        CacheMode, ConnectionAccess, EntityRecord, Error, LockMode, LockOptions, ReleaseMode,
        Result, Row, RuntimeSettings, Value,
    };
    pub use quarry_query::{
        AliasResolver, Dialect, QueryOptions, QuerySpec, StaticAliasResolver,
    };
    pub use quarry_session::{
        BatchLoader, FetchGraph, FetchProfile, GraphSemantic, ResultRowReader, RowReader,
        RowValue, ScrollableCursor, Session, SessionFactory,
    };
    pub use std::sync::Arc;
}
