//! Sessions, scrollable cursors, and batch-load orchestration for Quarry.
//!
//! `quarry-session` is the unit-of-work layer. It coordinates entity
//! identity, ambient load configuration, and statement lifecycle around a
//! connection-access handle.
//!
//! # Role In The Architecture
//!
//! - **Session factory**: immutable registries (fetch profiles, filter
//!   definitions, settings) and the session entry point.
//! - **Session**: ambient load influencers (cache mode, profiles, graph,
//!   filters), statement-cycle accounting, transaction glue, and the
//!   `scroll`/`list`/multi-load operations.
//! - **Persistence context**: per-session identity map with load-scope
//!   bookkeeping for eager attachments.
//! - **Cursors and readers**: scrollable positioning over a result feed
//!   with per-position row materialization.
//! - **Multi-load access**: builder-style batch loads with guaranteed
//!   restoration of the ambient state they override.
//!
//! # Design Philosophy
//!
//! - **Single caller**: a session (and any cursor it hands out) is used by
//!   one caller at a time; the cursor's mutable session borrow enforces
//!   this statically.
//! - **Restore on every exit path**: ambient overrides and cursor resources
//!   release through `Drop`, not through success-path code.
//! - **Validate before mutate**: unknown profile and filter names fail
//!   before any session state changes.

pub mod context;
pub mod cursor;
pub mod graph;
pub mod multi_load;
pub mod profile;
pub mod reader;

pub use context::PersistenceContext;
pub use cursor::{CursorState, EmptyCursor, ScrollCursor, ScrollableCursor, SessionCursor};
pub use graph::{AppliedGraph, FetchGraph, GraphSemantic};
pub use multi_load::{
    BatchFetchOptions, BatchLoader, MultiLoadAccess, NaturalIdBatchLoader, NaturalIdMultiLoadAccess,
};
pub use profile::{FetchOverride, FetchProfile, FetchStrategy};
pub use reader::{EntityReader, HolderReader, ResultRowReader, RowReader, RowValue};

use quarry_core::{CacheMode, ConnectionAccess, Error, ReleaseMode, Result, RuntimeSettings};
use quarry_query::{
    expand, ConditionInterner, Dialect, FilterDefinition, FilterInstance, QuerySpec,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

// ============================================================================
// Session Factory
// ============================================================================

/// Builds an immutable [`SessionFactory`].
///
/// Registration is consuming-builder style; filter templates compile at
/// registration, so malformed ones fail here rather than at query time.
#[derive(Debug)]
pub struct SessionFactoryBuilder {
    settings: RuntimeSettings,
    dialect: Dialect,
    profiles: HashMap<String, FetchProfile>,
    filters: HashMap<String, Arc<FilterDefinition>>,
    interner: ConditionInterner,
}

impl Default for SessionFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFactoryBuilder {
    /// Start from default settings and the default dialect.
    pub fn new() -> Self {
        Self {
            settings: RuntimeSettings::default(),
            dialect: Dialect::default(),
            profiles: HashMap::new(),
            filters: HashMap::new(),
            interner: ConditionInterner::new(),
        }
    }

    /// Use these runtime settings.
    #[must_use]
    pub fn settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Target this SQL dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Register a fetch profile under its name.
    #[must_use]
    pub fn register_profile(mut self, profile: FetchProfile) -> Self {
        self.profiles.insert(profile.name().to_string(), profile);
        self
    }

    /// Register a filter definition, compiling its condition template.
    pub fn register_filter(
        mut self,
        name: impl Into<String>,
        template: &str,
        auto_enabled: bool,
    ) -> Result<Self> {
        let definition =
            FilterDefinition::build(name, template, auto_enabled, &mut self.interner)?;
        self.filters
            .insert(definition.name().to_string(), Arc::new(definition));
        Ok(self)
    }

    /// Finish the factory.
    pub fn build(self) -> SessionFactory {
        tracing::debug!(
            profiles = self.profiles.len(),
            filters = self.filters.len(),
            "session factory built"
        );
        SessionFactory {
            settings: self.settings,
            dialect: self.dialect,
            profiles: self.profiles,
            filters: self.filters,
            interner: self.interner,
        }
    }
}

/// Immutable per-application registries and settings; opens sessions.
pub struct SessionFactory {
    settings: RuntimeSettings,
    dialect: Dialect,
    profiles: HashMap<String, FetchProfile>,
    filters: HashMap<String, Arc<FilterDefinition>>,
    interner: ConditionInterner,
}

impl SessionFactory {
    /// Start building a factory.
    pub fn builder() -> SessionFactoryBuilder {
        SessionFactoryBuilder::new()
    }

    /// Runtime settings fixed at build time.
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// The SQL dialect sessions render statements for.
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// A registered fetch profile, if any.
    pub fn fetch_profile(&self, name: &str) -> Option<&FetchProfile> {
        self.profiles.get(name)
    }

    /// Is a fetch profile registered under this name?
    pub fn has_fetch_profile(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// A registered filter definition, if any.
    pub fn filter_definition(&self, name: &str) -> Option<&Arc<FilterDefinition>> {
        self.filters.get(name)
    }

    /// The condition interner the filter registry compiled through.
    pub fn condition_interner(&self) -> &ConditionInterner {
        &self.interner
    }

    /// Open a session over a connection-access handle.
    ///
    /// Auto-enabled filters are switched on before the session is handed
    /// out. Callers keeping the factory around clone the `Arc` first.
    pub fn open_session(self: Arc<Self>, access: Box<dyn ConnectionAccess>) -> Session {
        let mut filters = HashMap::new();
        for definition in self.filters.values() {
            if definition.is_auto_enabled() {
                tracing::debug!(filter = definition.name(), "auto-enabling filter at session open");
                filters.insert(
                    definition.name().to_string(),
                    FilterInstance::new(Arc::clone(definition)),
                );
            }
        }
        let influencers = LoadInfluencers::new(self.settings.default_cache_mode());
        Session {
            factory: self,
            access,
            context: PersistenceContext::new(),
            influencers,
            filters,
            open_statements: 0,
            in_transaction: false,
        }
    }
}

// ============================================================================
// Load Influencers
// ============================================================================

/// The session's ambient load state: cache mode, enabled fetch profiles,
/// and the effective entity graph.
///
/// Consulted implicitly by load operations; batch loads override parts of
/// it for one call under a guaranteed-restore guard.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadInfluencers {
    cache_mode: CacheMode,
    profiles: BTreeSet<String>,
    graph: Option<AppliedGraph>,
}

impl LoadInfluencers {
    /// Start with a cache mode, no profiles, no graph.
    pub fn new(cache_mode: CacheMode) -> Self {
        Self {
            cache_mode,
            profiles: BTreeSet::new(),
            graph: None,
        }
    }

    /// The ambient cache mode.
    pub const fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    /// Set the ambient cache mode.
    pub fn set_cache_mode(&mut self, mode: CacheMode) {
        self.cache_mode = mode;
    }

    /// The enabled fetch-profile names.
    pub fn enabled_profiles(&self) -> &BTreeSet<String> {
        &self.profiles
    }

    /// Is a fetch profile enabled?
    pub fn is_profile_enabled(&self, name: &str) -> bool {
        self.profiles.contains(name)
    }

    /// Enable a profile name. Validation is the caller's concern.
    pub fn enable_profile(&mut self, name: &str) {
        self.profiles.insert(name.to_string());
    }

    /// Disable a profile name.
    pub fn disable_profile(&mut self, name: &str) {
        self.profiles.remove(name);
    }

    /// Replace the whole profile set.
    pub fn set_profiles(&mut self, profiles: BTreeSet<String>) {
        self.profiles = profiles;
    }

    /// The effective entity graph, if one is applied.
    pub fn graph(&self) -> Option<&AppliedGraph> {
        self.graph.as_ref()
    }

    /// Replace the effective entity graph, returning the previous one.
    pub fn set_graph(&mut self, graph: Option<AppliedGraph>) -> Option<AppliedGraph> {
        std::mem::replace(&mut self.graph, graph)
    }
}

// ============================================================================
// Session
// ============================================================================

/// One unit of work over one connection.
///
/// Not for concurrent use: one caller drives the session sequentially, and
/// an open [`ScrollCursor`] borrows the session mutably for its whole life.
pub struct Session {
    factory: Arc<SessionFactory>,
    access: Box<dyn ConnectionAccess>,
    context: PersistenceContext,
    influencers: LoadInfluencers,
    filters: HashMap<String, FilterInstance>,
    open_statements: usize,
    in_transaction: bool,
}

impl Session {
    /// The owning factory.
    pub fn factory(&self) -> &Arc<SessionFactory> {
        &self.factory
    }

    /// The persistence context.
    pub fn context(&self) -> &PersistenceContext {
        &self.context
    }

    /// Mutable access to the persistence context.
    pub fn context_mut(&mut self) -> &mut PersistenceContext {
        &mut self.context
    }

    /// The ambient load influencers.
    pub fn influencers(&self) -> &LoadInfluencers {
        &self.influencers
    }

    /// Split borrow for the multi-load orchestrator: ambient state for the
    /// restore guard, context for execution.
    pub(crate) fn ambient_parts(&mut self) -> (&mut LoadInfluencers, &mut PersistenceContext) {
        (&mut self.influencers, &mut self.context)
    }

    // ------------------------------------------------------------------
    // Ambient state
    // ------------------------------------------------------------------

    /// The ambient cache mode.
    pub fn cache_mode(&self) -> CacheMode {
        self.influencers.cache_mode()
    }

    /// Set the ambient cache mode.
    pub fn set_cache_mode(&mut self, mode: CacheMode) {
        if mode != self.influencers.cache_mode() {
            tracing::debug!(mode = mode.as_name(), "session cache mode changed");
        }
        self.influencers.set_cache_mode(mode);
    }

    /// Enable a fetch profile, validating it against the factory registry.
    pub fn enable_fetch_profile(&mut self, name: &str) -> Result<()> {
        if !self.factory.has_fetch_profile(name) {
            return Err(Error::unknown_profile(name));
        }
        tracing::debug!(profile = name, "fetch profile enabled");
        self.influencers.enable_profile(name);
        Ok(())
    }

    /// Disable a fetch profile, validating it against the factory registry.
    pub fn disable_fetch_profile(&mut self, name: &str) -> Result<()> {
        if !self.factory.has_fetch_profile(name) {
            return Err(Error::unknown_profile(name));
        }
        tracing::debug!(profile = name, "fetch profile disabled");
        self.influencers.disable_profile(name);
        Ok(())
    }

    /// Is a fetch profile currently enabled?
    pub fn is_fetch_profile_enabled(&self, name: &str) -> bool {
        self.influencers.is_profile_enabled(name)
    }

    /// Enable a filter, validating it against the factory registry.
    ///
    /// Returns the instance so parameter values can be set. Enabling an
    /// already-enabled filter returns the existing instance.
    pub fn enable_filter(&mut self, name: &str) -> Result<&mut FilterInstance> {
        let definition = self
            .factory
            .filter_definition(name)
            .ok_or_else(|| Error::unknown_filter(name))?;
        let instance = FilterInstance::new(Arc::clone(definition));
        tracing::debug!(filter = name, "filter enabled");
        Ok(self.filters.entry(name.to_string()).or_insert(instance))
    }

    /// Disable a filter, returning its instance if it was enabled.
    pub fn disable_filter(&mut self, name: &str) -> Option<FilterInstance> {
        let removed = self.filters.remove(name);
        if removed.is_some() {
            tracing::debug!(filter = name, "filter disabled");
        }
        removed
    }

    /// The enabled filter instance under this name, if any.
    pub fn enabled_filter(&self, name: &str) -> Option<&FilterInstance> {
        self.filters.get(name)
    }

    /// Names of the currently enabled filters.
    pub fn enabled_filters(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Apply an entity graph as the effective graph, returning the previous
    /// one.
    pub fn apply_graph(
        &mut self,
        graph: FetchGraph,
        semantic: GraphSemantic,
    ) -> Option<AppliedGraph> {
        tracing::debug!(graph = graph.name(), "effective entity graph applied");
        self.influencers.set_graph(Some(AppliedGraph::new(graph, semantic)))
    }

    /// Clear the effective entity graph, returning it.
    pub fn clear_graph(&mut self) -> Option<AppliedGraph> {
        self.influencers.set_graph(None)
    }

    /// The effective entity graph, if one is applied.
    pub fn effective_graph(&self) -> Option<&AppliedGraph> {
        self.influencers.graph()
    }

    // ------------------------------------------------------------------
    // Statement lifecycle
    // ------------------------------------------------------------------

    /// Note that a statement execution cycle began.
    pub fn statement_started(&mut self) {
        self.open_statements += 1;
        tracing::debug!(open = self.open_statements, "statement cycle started");
    }

    /// Note that a statement execution cycle ended.
    ///
    /// Under the after-statement release mode, the last cycle ending
    /// outside a transaction releases the connection-access resources.
    pub fn statement_finished(&mut self) {
        self.open_statements = self.open_statements.saturating_sub(1);
        tracing::debug!(open = self.open_statements, "statement cycle finished");
        if self.open_statements == 0
            && !self.in_transaction
            && self.factory.settings().connection_release_mode() == ReleaseMode::AfterStatement
        {
            if let Err(err) = self.access.release() {
                tracing::warn!(error = %err, "connection release failed after statement");
            }
        }
    }

    /// Number of statement cycles currently open.
    pub const fn open_statement_count(&self) -> usize {
        self.open_statements
    }

    /// Begin a transaction.
    pub fn begin(&mut self) -> Result<()> {
        self.access.begin()?;
        self.in_transaction = true;
        tracing::debug!("transaction begun");
        Ok(())
    }

    /// Commit the open transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.access.commit()?;
        self.in_transaction = false;
        tracing::debug!("transaction committed");
        self.release_after_transaction();
        Ok(())
    }

    /// Roll back the open transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.access.rollback()?;
        self.in_transaction = false;
        tracing::debug!("transaction rolled back");
        self.release_after_transaction();
        Ok(())
    }

    /// Is a transaction open?
    pub const fn is_in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn release_after_transaction(&mut self) {
        let mode = self.factory.settings().connection_release_mode();
        if self.open_statements == 0 && mode != ReleaseMode::OnClose {
            if let Err(err) = self.access.release() {
                tracing::warn!(error = %err, "connection release failed after transaction");
            }
        }
    }

    /// Close the session, releasing connection resources.
    pub fn close(mut self) {
        self.context.clear();
        if let Err(err) = self.access.release() {
            tracing::warn!(error = %err, "connection release failed during session close");
        }
        tracing::debug!("session closed");
    }

    // ------------------------------------------------------------------
    // Query execution
    // ------------------------------------------------------------------

    /// Execute a query and return a scrollable cursor over its results.
    ///
    /// Collection-filter queries refuse scrolling; a query with an empty
    /// list parameter short-circuits to the empty cursor without touching
    /// the connectivity layer.
    pub fn scroll<R: RowReader>(
        &mut self,
        spec: &QuerySpec,
        reader: R,
    ) -> Result<SessionCursor<'_, R>> {
        if spec.is_collection_filter() {
            return Err(Error::unsupported(
                "collection-filter queries do not support scrolling",
            ));
        }
        if spec.has_empty_list_param() {
            tracing::debug!("empty list parameter, returning empty cursor");
            return Ok(SessionCursor::Empty(EmptyCursor::new()));
        }

        let expanded = expand::expand(spec, self.factory.dialect())?;
        self.statement_started();
        let feed = match self.access.run_query(&expanded.sql, &expanded.binds) {
            Ok(feed) => feed,
            Err(err) => {
                self.statement_finished();
                return Err(err);
            }
        };
        Ok(SessionCursor::Live(ScrollCursor::new(self, feed, reader)))
    }

    /// Execute a query and materialize every row through the reader.
    ///
    /// An empty list parameter short-circuits to an empty vector.
    pub fn list<R: RowReader>(&mut self, spec: &QuerySpec, reader: &R) -> Result<Vec<R::Output>> {
        if spec.has_empty_list_param() {
            tracing::debug!("empty list parameter, returning empty result");
            return Ok(Vec::new());
        }

        let expanded = expand::expand(spec, self.factory.dialect())?;
        self.statement_started();
        let mut feed = match self.access.run_query(&expanded.sql, &expanded.binds) {
            Ok(feed) => feed,
            Err(err) => {
                self.statement_finished();
                return Err(err);
            }
        };

        let mut out = Vec::with_capacity(feed.row_count());
        let mut failure = None;
        for position in 1..=feed.row_count() {
            match feed.occupy(position) {
                Ok(true) => {
                    let Some(row) = feed.current().cloned() else {
                        break;
                    };
                    match reader.read(&row, &mut self.context) {
                        Ok(value) => out.push(value),
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }
                Ok(false) => break,
                Err(err) => {
                    failure = Some(Error::data("could not position result feed", err));
                    break;
                }
            }
        }
        if let Err(err) = feed.release() {
            tracing::warn!(error = %err, "result feed release failed after list");
        }
        self.statement_finished();
        match failure {
            Some(err) => Err(err),
            None => Ok(out),
        }
    }

    /// Start a multi-identifier batch load for one entity.
    pub fn multi_load(&mut self, entity: impl Into<String>) -> MultiLoadAccess<'_> {
        MultiLoadAccess::new(self, entity)
    }

    /// Start a natural-id batch load for one entity.
    pub fn multi_load_natural_id(
        &mut self,
        entity: impl Into<String>,
    ) -> NaturalIdMultiLoadAccess<'_> {
        NaturalIdMultiLoadAccess::new(self, entity)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("managed_entities", &self.context.len())
            .field("influencers", &self.influencers)
            .field("enabled_filters", &self.filters.len())
            .field("open_statements", &self.open_statements)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}
