//! Batch multi-load orchestration: ambient-state restore guarantees.

use quarry::prelude::*;
use quarry::{
    BatchFetchOptions, EntityStatus, NaturalIdBatchLoader, ResultFeed,
};
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc as StdArc, Mutex};

/// Access fake for sessions whose loads never touch the connectivity layer.
struct NullAccess;

impl ConnectionAccess for NullAccess {
    fn run_query(&mut self, _sql: &str, _params: &[Value]) -> Result<Box<dyn ResultFeed>> {
        panic!("multi-load tests must not execute queries through the session");
    }

    fn run_update(&mut self, _sql: &str, _params: &[Value]) -> Result<u64> {
        Ok(0)
    }

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Records every chunk it receives and serves records for the ids it knows.
struct RecordingLoader {
    known: Vec<i64>,
    chunks: StdArc<Mutex<Vec<Vec<Value>>>>,
    seen_options: StdArc<Mutex<Vec<BatchFetchOptions>>>,
}

impl RecordingLoader {
    fn new(known: Vec<i64>) -> Self {
        Self {
            known,
            chunks: StdArc::new(Mutex::new(Vec::new())),
            seen_options: StdArc::new(Mutex::new(Vec::new())),
        }
    }

    fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.lock().unwrap().iter().map(Vec::len).collect()
    }
}

impl BatchLoader for RecordingLoader {
    fn load_batch(
        &mut self,
        ids: &[Value],
        options: &BatchFetchOptions,
    ) -> Result<Vec<EntityRecord>> {
        self.chunks.lock().unwrap().push(ids.to_vec());
        self.seen_options.lock().unwrap().push(options.clone());
        Ok(ids
            .iter()
            .filter_map(|id| {
                let n = id.as_i64()?;
                self.known.contains(&n).then(|| {
                    EntityRecord::new("Order", id.clone())
                        .with_state(vec![Value::Text(format!("order-{n}"))])
                })
            })
            .collect())
    }
}

struct FailingLoader;

impl BatchLoader for FailingLoader {
    fn load_batch(&mut self, _ids: &[Value], _options: &BatchFetchOptions) -> Result<Vec<EntityRecord>> {
        Err(Error::Custom("loader blew up".to_string()))
    }
}

struct PanickingLoader;

impl BatchLoader for PanickingLoader {
    fn load_batch(&mut self, _ids: &[Value], _options: &BatchFetchOptions) -> Result<Vec<EntityRecord>> {
        panic!("loader panicked mid-batch");
    }
}

fn open_session() -> Session {
    let factory = Arc::new(
        SessionFactory::builder()
            .settings(RuntimeSettings::new().batch_size(2))
            .register_profile(FetchProfile::new("with-lines"))
            .register_profile(FetchProfile::new("with-audit"))
            .build(),
    );
    factory.open_session(Box::new(NullAccess))
}

fn ids(values: &[i64]) -> Vec<Value> {
    values.iter().map(|n| Value::BigInt(*n)).collect()
}

fn ambient_snapshot(session: &Session) -> (CacheMode, BTreeSet<String>, bool) {
    (
        session.cache_mode(),
        session.influencers().enabled_profiles().clone(),
        session.effective_graph().is_some(),
    )
}

#[test]
fn ordered_output_aligns_with_input() {
    let mut session = open_session();
    let mut loader = RecordingLoader::new(vec![1, 3]);

    let result = session
        .multi_load("Order")
        .load(&mut loader, &ids(&[1, 2, 3]))
        .unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result[0].as_ref().unwrap().id(), &Value::BigInt(1));
    assert!(result[1].is_none()); // unknown id stays absent
    assert_eq!(result[2].as_ref().unwrap().id(), &Value::BigInt(3));
}

#[test]
fn unordered_output_carries_only_found_records() {
    let mut session = open_session();
    let mut loader = RecordingLoader::new(vec![1, 3]);

    let result = session
        .multi_load("Order")
        .ordered(false)
        .load(&mut loader, &ids(&[2, 1, 3]))
        .unwrap();

    let found: Vec<&Value> = result.iter().map(|r| r.as_ref().unwrap().id()).collect();
    assert_eq!(found, vec![&Value::BigInt(1), &Value::BigInt(3)]);
}

#[test]
fn identifiers_chunk_by_the_settings_batch_size() {
    let mut session = open_session();
    let mut loader = RecordingLoader::new(vec![1, 2, 3, 4, 5]);

    session
        .multi_load("Order")
        .load(&mut loader, &ids(&[1, 2, 3, 4, 5]))
        .unwrap();

    // factory default batch size is 2
    assert_eq!(loader.chunk_sizes(), vec![2, 2, 1]);
}

#[test]
fn explicit_batch_size_overrides_the_default() {
    let mut session = open_session();
    let mut loader = RecordingLoader::new(vec![1, 2, 3, 4, 5]);

    session
        .multi_load("Order")
        .with_batch_size(0)
        .load(&mut loader, &ids(&[1, 2, 3, 4, 5]))
        .unwrap();

    assert_eq!(loader.chunk_sizes(), vec![5]);
}

#[test]
fn empty_identifier_list_short_circuits() {
    let mut session = open_session();
    session.set_cache_mode(CacheMode::Get);
    session.enable_fetch_profile("with-lines").unwrap();
    let before = ambient_snapshot(&session);

    let mut loader = RecordingLoader::new(vec![]);
    let result = session
        .multi_load("Order")
        .with_cache_mode(CacheMode::Ignore)
        .enable_fetch_profile("with-audit")
        .load(&mut loader, &[])
        .unwrap();

    assert!(result.is_empty());
    assert!(loader.chunk_sizes().is_empty());
    assert_eq!(ambient_snapshot(&session), before);
}

#[test]
fn ambient_state_restores_after_a_successful_load() {
    let mut session = open_session();
    session.enable_fetch_profile("with-lines").unwrap();
    let before = ambient_snapshot(&session);

    let mut loader = RecordingLoader::new(vec![1]);
    session
        .multi_load("Order")
        .with_cache_mode(CacheMode::Ignore)
        .enable_fetch_profile("with-audit")
        .disable_fetch_profile("with-lines")
        .with_graph(
            FetchGraph::new("order-summary").with_path("lines"),
            GraphSemantic::Fetch,
        )
        .load(&mut loader, &ids(&[1]))
        .unwrap();

    assert_eq!(ambient_snapshot(&session), before);
    assert!(session.effective_graph().is_none());
}

#[test]
fn ambient_state_restores_when_the_loader_fails() {
    let mut session = open_session();
    session.set_cache_mode(CacheMode::Put);
    session.enable_fetch_profile("with-lines").unwrap();
    let before = ambient_snapshot(&session);

    let err = session
        .multi_load("Order")
        .with_cache_mode(CacheMode::Ignore)
        .enable_fetch_profile("with-audit")
        .with_graph(FetchGraph::new("g"), GraphSemantic::Load)
        .load(&mut FailingLoader, &ids(&[1, 2]))
        .unwrap_err();

    assert!(err.to_string().contains("loader blew up"));
    assert_eq!(ambient_snapshot(&session), before);
}

#[test]
fn ambient_state_restores_when_the_loader_panics() {
    let mut session = open_session();
    session.enable_fetch_profile("with-lines").unwrap();
    let before = ambient_snapshot(&session);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        session
            .multi_load("Order")
            .with_cache_mode(CacheMode::Ignore)
            .enable_fetch_profile("with-audit")
            .load(&mut PanickingLoader, &ids(&[1]))
    }));

    assert!(outcome.is_err());
    assert_eq!(ambient_snapshot(&session), before);
}

#[test]
fn unknown_fetch_profile_fails_before_any_mutation() {
    let mut session = open_session();
    let before = ambient_snapshot(&session);

    let mut loader = RecordingLoader::new(vec![1]);
    let err = session
        .multi_load("Order")
        .enable_fetch_profile("no-such-profile")
        .load(&mut loader, &ids(&[1]))
        .unwrap_err();

    assert!(err.is_unknown_profile());
    assert!(loader.chunk_sizes().is_empty());
    assert_eq!(ambient_snapshot(&session), before);

    // the disable set is validated too
    let err = session
        .multi_load("Order")
        .disable_fetch_profile("also-missing")
        .load(&mut loader, &ids(&[1]))
        .unwrap_err();
    assert!(err.is_unknown_profile());
}

#[test]
fn session_check_resolves_managed_and_deleted_records() {
    let mut session = open_session();
    let managed = EntityRecord::new("Order", Value::BigInt(1));
    let doomed = EntityRecord::new("Order", Value::BigInt(2));
    session.context_mut().register(managed);
    let doomed_key = session.context_mut().register(doomed);
    session.context_mut().mark_deleted(&doomed_key);
    assert_eq!(
        session.context().status(&doomed_key),
        Some(EntityStatus::Deleted)
    );

    // loader only knows id 3; ids 1 and 2 resolve from the session
    let mut loader = RecordingLoader::new(vec![3]);
    let result = session
        .multi_load("Order")
        .load(&mut loader, &ids(&[1, 2, 3]))
        .unwrap();

    assert!(result[0].is_some());
    assert!(result[1].is_none()); // deleted, excluded by default
    assert!(result[2].is_some());
    assert_eq!(loader.chunk_sizes(), vec![1]);

    // with return_deleted the deleted record comes back
    let mut loader = RecordingLoader::new(vec![]);
    let result = session
        .multi_load("Order")
        .return_deleted(true)
        .load(&mut loader, &ids(&[2]))
        .unwrap();
    assert_eq!(result[0].as_ref().unwrap().id(), &Value::BigInt(2));
    assert!(loader.chunk_sizes().is_empty());
}

#[test]
fn disabling_session_check_always_delegates() {
    let mut session = open_session();
    session
        .context_mut()
        .register(EntityRecord::new("Order", Value::BigInt(1)));

    let mut loader = RecordingLoader::new(vec![1]);
    let result = session
        .multi_load("Order")
        .check_session(false)
        .load(&mut loader, &ids(&[1]))
        .unwrap();

    assert_eq!(loader.chunk_sizes(), vec![1]);
    assert!(result[0].is_some());
}

#[test]
fn cache_check_flag_reaches_the_loader() {
    let mut session = open_session();
    let mut loader = RecordingLoader::new(vec![1]);
    session
        .multi_load("Order")
        .check_cache(false)
        .load(&mut loader, &ids(&[1]))
        .unwrap();
    let options = loader.seen_options.lock().unwrap();
    assert!(!options[0].cache_check);
}

/// Natural-id loader pairing each found record with its natural-id value.
struct NaturalIdLoader {
    known: Vec<(&'static str, i64)>,
}

impl NaturalIdBatchLoader for NaturalIdLoader {
    fn load_batch(
        &mut self,
        natural_ids: &[Value],
        _options: &BatchFetchOptions,
    ) -> Result<Vec<(Value, EntityRecord)>> {
        Ok(natural_ids
            .iter()
            .filter_map(|nid| {
                let name = nid.as_str()?;
                self.known.iter().find(|(n, _)| *n == name).map(|(_, id)| {
                    (
                        nid.clone(),
                        EntityRecord::new("Order", Value::BigInt(*id)),
                    )
                })
            })
            .collect())
    }
}

#[test]
fn natural_id_load_aligns_with_input_values() {
    let mut session = open_session();
    let mut loader = NaturalIdLoader {
        known: vec![("ord-a", 1), ("ord-c", 3)],
    };

    let natural_ids = vec![
        Value::Text("ord-a".to_string()),
        Value::Text("ord-b".to_string()),
        Value::Text("ord-c".to_string()),
    ];
    let result = session
        .multi_load_natural_id("Order")
        .load(&mut loader, &natural_ids)
        .unwrap();

    assert_eq!(result[0].as_ref().unwrap().id(), &Value::BigInt(1));
    assert!(result[1].is_none());
    assert_eq!(result[2].as_ref().unwrap().id(), &Value::BigInt(3));

    // loaded records registered with the persistence context
    assert_eq!(session.context().len(), 2);
}

#[test]
fn natural_id_load_restores_ambient_state() {
    let mut session = open_session();
    let before = ambient_snapshot(&session);

    let mut loader = NaturalIdLoader { known: vec![] };
    session
        .multi_load_natural_id("Order")
        .with_cache_mode(CacheMode::Refresh)
        .enable_fetch_profile("with-lines")
        .load(&mut loader, &[Value::Text("ord-x".to_string())])
        .unwrap();

    assert_eq!(ambient_snapshot(&session), before);
}
