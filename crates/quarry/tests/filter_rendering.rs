//! Filter registration, enabling, and alias rendering.

use quarry::prelude::*;
use quarry::{
    GroupAliasResolver, IndexedAliasResolver, ResultFeed, TableGroup,
};

struct NullAccess;

impl ConnectionAccess for NullAccess {
    fn run_query(&mut self, _sql: &str, _params: &[Value]) -> Result<Box<dyn ResultFeed>> {
        panic!("filter tests must not execute queries");
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

fn factory() -> Arc<SessionFactory> {
    Arc::new(
        SessionFactory::builder()
            .register_filter("tenant", "{alias}.tenant_id = :tenant", false)
            .unwrap()
            .register_filter("region-match", "{orders}.region = {customers}.region", false)
            .unwrap()
            .register_filter("live", "deleted_at IS NULL", true)
            .unwrap()
            // same template as "live": shares the interned compiled form
            .register_filter("not-archived", "deleted_at IS NULL", false)
            .unwrap()
            .build(),
    )
}

#[test]
fn malformed_template_fails_at_registration() {
    let err = SessionFactory::builder()
        .register_filter("broken", "{alias.x = 1", false)
        .unwrap_err();
    assert!(err.to_string().contains("broken"));
}

#[test]
fn interner_shares_compiled_conditions_across_definitions() {
    let factory = factory();
    let live = factory.filter_definition("live").unwrap();
    let not_archived = factory.filter_definition("not-archived").unwrap();
    assert!(std::sync::Arc::ptr_eq(
        live.condition(),
        not_archived.condition()
    ));
    assert_eq!(factory.condition_interner().hits(), 1);
    assert_eq!(factory.condition_interner().misses(), 3);
}

#[test]
fn auto_enabled_filters_are_on_when_a_session_opens() {
    let mut session = factory().open_session(Box::new(NullAccess));
    assert!(session.enabled_filter("live").is_some());
    assert!(session.enabled_filter("tenant").is_none());

    let dropped = session.disable_filter("live").unwrap();
    assert_eq!(dropped.name(), "live");
    assert!(session.enabled_filter("live").is_none());
}

#[test]
fn static_resolver_renders_the_same_alias_for_every_input() {
    let resolver = StaticAliasResolver::new("t0");
    assert_eq!(resolver.alias_for(None), Some("t0".to_string()));
    assert_eq!(resolver.alias_for(Some("orders")), Some("t0".to_string()));
    assert_eq!(resolver.alias_for(Some("whatever")), Some("t0".to_string()));

    let mut session = factory().open_session(Box::new(NullAccess));
    let filter = session.enable_filter("tenant").unwrap();
    assert_eq!(
        filter.render(&resolver).unwrap(),
        "t0.tenant_id = :tenant"
    );
}

#[test]
fn indexed_resolver_derives_aliases_from_table_position() {
    let resolver = IndexedAliasResolver::new(
        "ord",
        vec!["orders".to_string(), "order_details".to_string()],
    );
    let mut session = factory().open_session(Box::new(NullAccess));
    let filter = session.enable_filter("tenant").unwrap();
    // the implicit marker answers the root alias
    assert_eq!(
        filter.render(&resolver).unwrap(),
        "ord.tenant_id = :tenant"
    );
}

#[test]
fn group_resolver_renders_named_placeholders() {
    let group = TableGroup::new("orders", "o").join("customers", "c");
    let resolver = GroupAliasResolver::new(&group);

    let mut session = factory().open_session(Box::new(NullAccess));
    let filter = session.enable_filter("region-match").unwrap();
    assert_eq!(filter.render(&resolver).unwrap(), "o.region = c.region");
}

#[test]
fn unresolvable_placeholder_names_the_missing_table() {
    let group = TableGroup::new("orders", "o");
    let resolver = GroupAliasResolver::new(&group);

    let mut session = factory().open_session(Box::new(NullAccess));
    let filter = session.enable_filter("region-match").unwrap();
    let err = filter.render(&resolver).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("region-match"));
    assert!(message.contains("customers"));
}

#[test]
fn filter_parameters_validate_against_the_template() {
    let mut session = factory().open_session(Box::new(NullAccess));
    let filter = session.enable_filter("tenant").unwrap();
    assert_eq!(filter.unbound_parameters(), vec!["tenant"]);

    filter.set_parameter("tenant", 42i64).unwrap();
    assert_eq!(filter.parameter("tenant"), Some(&Value::BigInt(42)));

    let err = filter.set_parameter("region", "emea").unwrap_err();
    assert!(err.to_string().contains("tenant"));
    assert!(err.to_string().contains("region"));
}

#[test]
fn enabling_an_unregistered_filter_is_a_lookup_error() {
    let mut session = factory().open_session(Box::new(NullAccess));
    let err = session.enable_filter("no-such-filter").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Filter error in 'no-such-filter': no filter named 'no-such-filter' is registered"
    );
}
