//! Batch / multi-identifier load orchestration.
//!
//! [`MultiLoadAccess`] and [`NaturalIdMultiLoadAccess`] are builder-style
//! access objects: they collect lock options, a cache-mode override, an
//! entity graph, fetch-profile adjustments, and the batching flags, then
//! drive the load against the owning session. The ambient session state
//! they touch (cache mode, profile set, effective graph) is applied through
//! an RAII guard whose `Drop` restores the prior values, so early returns,
//! error propagation, and panics all restore.

use crate::context::PersistenceContext;
use crate::graph::{AppliedGraph, FetchGraph, GraphSemantic};
use crate::{LoadInfluencers, Session};
use quarry_core::{
    CacheMode, EntityKey, EntityRecord, EntityStatus, Error, LockOptions, Result, Value,
};
use std::collections::{BTreeSet, HashMap};

/// Per-chunk options handed to the delegate loader.
#[derive(Debug, Clone)]
pub struct BatchFetchOptions {
    /// Row locks to request for the loaded rows.
    pub lock: LockOptions,
    /// May the loader consult the second-level cache?
    pub cache_check: bool,
}

/// Executes one chunk of an identifier batch.
///
/// Implemented by the entity metadata layer outside this workspace; returns
/// the records found, in any order. Missing identifiers are simply absent.
pub trait BatchLoader {
    fn load_batch(&mut self, ids: &[Value], options: &BatchFetchOptions) -> Result<Vec<EntityRecord>>;
}

/// Executes one chunk of a natural-id batch.
///
/// Each found record is paired with the natural-id value it answers, since
/// the record's identifier is not the lookup key here.
pub trait NaturalIdBatchLoader {
    fn load_batch(
        &mut self,
        natural_ids: &[Value],
        options: &BatchFetchOptions,
    ) -> Result<Vec<(Value, EntityRecord)>>;
}

/// Saved-snapshot / apply / guaranteed-restore over the session's ambient
/// load state. Restoration runs in `Drop`, unconditionally.
struct AmbientGuard<'a> {
    influencers: &'a mut LoadInfluencers,
    saved_cache_mode: Option<CacheMode>,
    saved_profiles: Option<BTreeSet<String>>,
    saved_graph: Option<Option<AppliedGraph>>,
}

impl<'a> AmbientGuard<'a> {
    fn apply(
        influencers: &'a mut LoadInfluencers,
        cache_mode: Option<CacheMode>,
        enable_profiles: &[String],
        disable_profiles: &[String],
        graph: Option<AppliedGraph>,
    ) -> Self {
        let mut guard = Self {
            influencers,
            saved_cache_mode: None,
            saved_profiles: None,
            saved_graph: None,
        };
        if let Some(mode) = cache_mode {
            // exact value equality decides; equal modes never swap
            if mode != guard.influencers.cache_mode() {
                guard.saved_cache_mode = Some(guard.influencers.cache_mode());
                guard.influencers.set_cache_mode(mode);
                tracing::debug!(mode = mode.as_name(), "cache mode swapped for batch load");
            }
        }
        if !enable_profiles.is_empty() || !disable_profiles.is_empty() {
            guard.saved_profiles = Some(guard.influencers.enabled_profiles().clone());
            for name in enable_profiles {
                guard.influencers.enable_profile(name);
            }
            for name in disable_profiles {
                guard.influencers.disable_profile(name);
            }
            tracing::debug!(
                enabled = enable_profiles.len(),
                disabled = disable_profiles.len(),
                "fetch profiles adjusted for batch load"
            );
        }
        if let Some(applied) = graph {
            let previous = guard.influencers.set_graph(Some(applied));
            guard.saved_graph = Some(previous);
            tracing::debug!("entity graph applied for batch load");
        }
        guard
    }
}

impl Drop for AmbientGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.saved_graph.take() {
            self.influencers.set_graph(previous);
        }
        if let Some(previous) = self.saved_profiles.take() {
            self.influencers.set_profiles(previous);
        }
        if let Some(previous) = self.saved_cache_mode.take() {
            self.influencers.set_cache_mode(previous);
        }
        tracing::debug!("ambient load state restored after batch load");
    }
}

/// Fail before any state mutation when a requested profile is unknown.
fn check_profiles(session: &Session, enabled: &[String], disabled: &[String]) -> Result<()> {
    for name in enabled.iter().chain(disabled.iter()) {
        if !session.factory().has_fetch_profile(name) {
            return Err(Error::unknown_profile(name.clone()));
        }
    }
    Ok(())
}

fn effective_chunk_size(requested: Option<usize>, default: usize, total: usize) -> usize {
    let size = requested.unwrap_or(default);
    if size == 0 {
        total.max(1)
    } else {
        size
    }
}

/// Builder for loading multiple entities by identifier in one batch.
///
/// Obtained from [`Session::multi_load`]; consumed by [`load`](Self::load).
pub struct MultiLoadAccess<'s> {
    session: &'s mut Session,
    entity: String,
    lock: LockOptions,
    cache_mode: Option<CacheMode>,
    graph: Option<AppliedGraph>,
    batch_size: Option<usize>,
    enabled_profiles: Vec<String>,
    disabled_profiles: Vec<String>,
    session_check: bool,
    cache_check: bool,
    return_deleted: bool,
    ordered: bool,
}

impl<'s> MultiLoadAccess<'s> {
    pub(crate) fn new(session: &'s mut Session, entity: impl Into<String>) -> Self {
        Self {
            session,
            entity: entity.into(),
            lock: LockOptions::none(),
            cache_mode: None,
            graph: None,
            batch_size: None,
            enabled_profiles: Vec::new(),
            disabled_profiles: Vec::new(),
            session_check: true,
            cache_check: true,
            return_deleted: false,
            ordered: true,
        }
    }

    /// Request row locks for the loaded rows.
    #[must_use]
    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = lock;
        self
    }

    /// Override the cache mode for the duration of this load.
    #[must_use]
    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = Some(mode);
        self
    }

    /// Apply an entity graph for the duration of this load.
    #[must_use]
    pub fn with_graph(mut self, graph: FetchGraph, semantic: GraphSemantic) -> Self {
        self.graph = Some(AppliedGraph::new(graph, semantic));
        self
    }

    /// Chunk the identifiers into batches of this size (0 = one chunk).
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Enable a fetch profile for the duration of this load.
    #[must_use]
    pub fn enable_fetch_profile(mut self, name: impl Into<String>) -> Self {
        self.enabled_profiles.push(name.into());
        self
    }

    /// Disable a fetch profile for the duration of this load.
    #[must_use]
    pub fn disable_fetch_profile(mut self, name: impl Into<String>) -> Self {
        self.disabled_profiles.push(name.into());
        self
    }

    /// Resolve identifiers already managed by the session without loading.
    #[must_use]
    pub fn check_session(mut self, enabled: bool) -> Self {
        self.session_check = enabled;
        self
    }

    /// Allow the loader to consult the second-level cache.
    #[must_use]
    pub fn check_cache(mut self, enabled: bool) -> Self {
        self.cache_check = enabled;
        self
    }

    /// Return records the session has marked deleted instead of absent.
    #[must_use]
    pub fn return_deleted(mut self, enabled: bool) -> Self {
        self.return_deleted = enabled;
        self
    }

    /// Align the output positionally with the input identifiers.
    ///
    /// When disabled, the output carries only found records in load order.
    #[must_use]
    pub fn ordered(mut self, enabled: bool) -> Self {
        self.ordered = enabled;
        self
    }

    /// Execute the batch load through the delegate loader.
    ///
    /// Ordered output aligns with `ids` (`None` = missing or excluded);
    /// unordered output holds only found records.
    #[tracing::instrument(skip_all, fields(entity = %self.entity, ids = ids.len()))]
    pub fn load(
        self,
        loader: &mut dyn BatchLoader,
        ids: &[Value],
    ) -> Result<Vec<Option<EntityRecord>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        check_profiles(self.session, &self.enabled_profiles, &self.disabled_profiles)?;

        let chunk_size = effective_chunk_size(
            self.batch_size,
            self.session.factory().settings().default_batch_size(),
            ids.len(),
        );
        let options = BatchFetchOptions {
            lock: self.lock,
            cache_check: self.cache_check,
        };

        let (influencers, context) = self.session.ambient_parts();
        let _guard = AmbientGuard::apply(
            influencers,
            self.cache_mode,
            &self.enabled_profiles,
            &self.disabled_profiles,
            self.graph,
        );
        run_id_load(
            context,
            loader,
            &self.entity,
            ids,
            &options,
            chunk_size,
            self.session_check,
            self.return_deleted,
            self.ordered,
        )
    }
}

enum Slot {
    Resolved(Option<EntityRecord>),
    Pending,
}

#[allow(clippy::too_many_arguments)]
fn run_id_load(
    context: &mut PersistenceContext,
    loader: &mut dyn BatchLoader,
    entity: &str,
    ids: &[Value],
    options: &BatchFetchOptions,
    chunk_size: usize,
    session_check: bool,
    return_deleted: bool,
    ordered: bool,
) -> Result<Vec<Option<EntityRecord>>> {
    let mut slots = Vec::with_capacity(ids.len());
    let mut pending = Vec::new();

    for id in ids {
        if session_check {
            let key = EntityKey::new(entity, id);
            if let Some((record, status)) = context.lookup(&key) {
                let resolved = match status {
                    EntityStatus::Managed => Some(record.clone()),
                    EntityStatus::Deleted if return_deleted => Some(record.clone()),
                    EntityStatus::Deleted => None,
                };
                tracing::trace!(entity, "multi-load identifier resolved from session");
                slots.push(Slot::Resolved(resolved));
                continue;
            }
        }
        pending.push(id.clone());
        slots.push(Slot::Pending);
    }

    let mut loaded: HashMap<u64, EntityRecord> = HashMap::new();
    let mut load_order: Vec<u64> = Vec::new();
    for batch in pending.chunks(chunk_size.max(1)) {
        let records = loader.load_batch(batch, options)?;
        tracing::debug!(
            entity,
            requested = batch.len(),
            found = records.len(),
            "multi-load chunk executed"
        );
        for record in records {
            let id_hash = record.id().content_hash();
            let key = context.register(record);
            // the identity map may hold an older instance; hand that one back
            if let Some(managed) = context.get(&key) {
                if !loaded.contains_key(&id_hash) {
                    load_order.push(id_hash);
                }
                loaded.insert(id_hash, managed.clone());
            }
        }
    }

    if ordered {
        Ok(ids
            .iter()
            .zip(slots)
            .map(|(id, slot)| match slot {
                Slot::Resolved(resolved) => resolved,
                Slot::Pending => loaded.get(&id.content_hash()).cloned(),
            })
            .collect())
    } else {
        let mut out = Vec::new();
        for slot in slots {
            if let Slot::Resolved(Some(record)) = slot {
                out.push(Some(record));
            }
        }
        for hash in load_order {
            out.push(loaded.get(&hash).cloned());
        }
        Ok(out)
    }
}

/// Builder for loading multiple entities by natural-id values in one batch.
///
/// Obtained from [`Session::multi_load_natural_id`]. Natural ids do not key
/// the identity map, so there is no session-check phase; the deleted filter
/// applies after the loaded records register.
pub struct NaturalIdMultiLoadAccess<'s> {
    session: &'s mut Session,
    entity: String,
    lock: LockOptions,
    cache_mode: Option<CacheMode>,
    graph: Option<AppliedGraph>,
    batch_size: Option<usize>,
    enabled_profiles: Vec<String>,
    disabled_profiles: Vec<String>,
    cache_check: bool,
    return_deleted: bool,
    ordered: bool,
}

impl<'s> NaturalIdMultiLoadAccess<'s> {
    pub(crate) fn new(session: &'s mut Session, entity: impl Into<String>) -> Self {
        Self {
            session,
            entity: entity.into(),
            lock: LockOptions::none(),
            cache_mode: None,
            graph: None,
            batch_size: None,
            enabled_profiles: Vec::new(),
            disabled_profiles: Vec::new(),
            cache_check: true,
            return_deleted: false,
            ordered: true,
        }
    }

    /// Request row locks for the loaded rows.
    #[must_use]
    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = lock;
        self
    }

    /// Override the cache mode for the duration of this load.
    #[must_use]
    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = Some(mode);
        self
    }

    /// Apply an entity graph for the duration of this load.
    #[must_use]
    pub fn with_graph(mut self, graph: FetchGraph, semantic: GraphSemantic) -> Self {
        self.graph = Some(AppliedGraph::new(graph, semantic));
        self
    }

    /// Chunk the natural ids into batches of this size (0 = one chunk).
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Enable a fetch profile for the duration of this load.
    #[must_use]
    pub fn enable_fetch_profile(mut self, name: impl Into<String>) -> Self {
        self.enabled_profiles.push(name.into());
        self
    }

    /// Disable a fetch profile for the duration of this load.
    #[must_use]
    pub fn disable_fetch_profile(mut self, name: impl Into<String>) -> Self {
        self.disabled_profiles.push(name.into());
        self
    }

    /// Allow the loader to consult the second-level cache.
    #[must_use]
    pub fn check_cache(mut self, enabled: bool) -> Self {
        self.cache_check = enabled;
        self
    }

    /// Return records the session has marked deleted instead of absent.
    #[must_use]
    pub fn return_deleted(mut self, enabled: bool) -> Self {
        self.return_deleted = enabled;
        self
    }

    /// Align the output positionally with the input natural ids.
    #[must_use]
    pub fn ordered(mut self, enabled: bool) -> Self {
        self.ordered = enabled;
        self
    }

    /// Execute the batch load through the delegate loader.
    #[tracing::instrument(skip_all, fields(entity = %self.entity, ids = natural_ids.len()))]
    pub fn load(
        self,
        loader: &mut dyn NaturalIdBatchLoader,
        natural_ids: &[Value],
    ) -> Result<Vec<Option<EntityRecord>>> {
        if natural_ids.is_empty() {
            return Ok(Vec::new());
        }
        check_profiles(self.session, &self.enabled_profiles, &self.disabled_profiles)?;

        let chunk_size = effective_chunk_size(
            self.batch_size,
            self.session.factory().settings().default_batch_size(),
            natural_ids.len(),
        );
        let options = BatchFetchOptions {
            lock: self.lock,
            cache_check: self.cache_check,
        };

        let (influencers, context) = self.session.ambient_parts();
        let _guard = AmbientGuard::apply(
            influencers,
            self.cache_mode,
            &self.enabled_profiles,
            &self.disabled_profiles,
            self.graph,
        );
        run_natural_id_load(
            context,
            loader,
            &self.entity,
            natural_ids,
            &options,
            chunk_size,
            self.return_deleted,
            self.ordered,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn run_natural_id_load(
    context: &mut PersistenceContext,
    loader: &mut dyn NaturalIdBatchLoader,
    entity: &str,
    natural_ids: &[Value],
    options: &BatchFetchOptions,
    chunk_size: usize,
    return_deleted: bool,
    ordered: bool,
) -> Result<Vec<Option<EntityRecord>>> {
    let mut found: HashMap<u64, EntityRecord> = HashMap::new();
    let mut load_order: Vec<u64> = Vec::new();

    for batch in natural_ids.chunks(chunk_size.max(1)) {
        let pairs = loader.load_batch(batch, options)?;
        tracing::debug!(
            entity,
            requested = batch.len(),
            found = pairs.len(),
            "natural-id multi-load chunk executed"
        );
        for (natural_id, record) in pairs {
            let key = context.register(record);
            let status = context.status(&key).unwrap_or(EntityStatus::Managed);
            if status == EntityStatus::Deleted && !return_deleted {
                continue;
            }
            if let Some(managed) = context.get(&key) {
                let hash = natural_id.content_hash();
                if !found.contains_key(&hash) {
                    load_order.push(hash);
                }
                found.insert(hash, managed.clone());
            }
        }
    }

    if ordered {
        Ok(natural_ids
            .iter()
            .map(|nid| found.get(&nid.content_hash()).cloned())
            .collect())
    } else {
        Ok(load_order
            .into_iter()
            .map(|hash| found.get(&hash).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_defaults_and_overrides() {
        assert_eq!(effective_chunk_size(None, 0, 10), 10);
        assert_eq!(effective_chunk_size(None, 4, 10), 4);
        assert_eq!(effective_chunk_size(Some(3), 4, 10), 3);
        assert_eq!(effective_chunk_size(Some(0), 4, 10), 10);
        assert_eq!(effective_chunk_size(None, 0, 0), 1);
    }

    #[test]
    fn ambient_guard_restores_on_drop() {
        let mut influencers = LoadInfluencers::new(CacheMode::Normal);
        influencers.enable_profile("base");

        {
            let guard = AmbientGuard::apply(
                &mut influencers,
                Some(CacheMode::Ignore),
                &["extra".to_string()],
                &["base".to_string()],
                Some(AppliedGraph::new(FetchGraph::new("g"), GraphSemantic::Fetch)),
            );
            assert_eq!(guard.influencers.cache_mode(), CacheMode::Ignore);
            assert!(guard.influencers.enabled_profiles().contains("extra"));
            assert!(!guard.influencers.enabled_profiles().contains("base"));
            assert!(guard.influencers.graph().is_some());
        }

        assert_eq!(influencers.cache_mode(), CacheMode::Normal);
        assert!(influencers.enabled_profiles().contains("base"));
        assert!(!influencers.enabled_profiles().contains("extra"));
        assert!(influencers.graph().is_none());
    }

    #[test]
    fn ambient_guard_skips_equal_cache_mode() {
        let mut influencers = LoadInfluencers::new(CacheMode::Get);
        {
            let guard = AmbientGuard::apply(&mut influencers, Some(CacheMode::Get), &[], &[], None);
            assert!(guard.saved_cache_mode.is_none());
        }
        assert_eq!(influencers.cache_mode(), CacheMode::Get);
    }
}
