//! SQLite store integration: persistence across reopen and decisions over SQL

use std::sync::Arc;
use tempfile::TempDir;
use warden::{
    CidrCondition, ConditionRegistry, Conditions, EngineConfig, Policy, PolicyEngine,
    PolicyStore, Request, SqliteStore, StoreConfig, Warden, WardenError,
};

fn registry() -> Arc<ConditionRegistry> {
    Arc::new(ConditionRegistry::builtin())
}

fn office_editors() -> Policy {
    Policy::allow("office-editors")
        .description("Editors inside the office network")
        .subjects(["<.+>@editors"])
        .actions(["<create|update>"])
        .resources(["articles:<[0-9]+>"])
        .conditions(Conditions::new().with("ip", CidrCondition::new("10.0.0.0/8")))
}

#[test]
fn test_policies_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("policies.db");

    {
        let store = SqliteStore::open(&db_path, registry()).unwrap();
        store.create(office_editors()).unwrap();
        store
            .create(Policy::deny("frozen").actions(["<.*>"]).resources(["articles:1"]))
            .unwrap();
        assert_eq!(store.path(), Some(db_path.as_path()));
    }

    let store = SqliteStore::open(&db_path, registry()).unwrap();
    assert_eq!(store.get("office-editors").unwrap(), office_editors());

    let ids: Vec<String> = store.list().unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["frozen", "office-editors"]);
}

#[test]
fn test_decisions_over_sqlite() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp_dir.path().join("p.db"), registry()).unwrap());
    store.create(office_editors()).unwrap();
    store
        .create(Policy::deny("frozen").actions(["<.*>"]).resources(["articles:1"]))
        .unwrap();

    let engine = PolicyEngine::with_pattern_cache(store, 64);

    let allowed = Request::new("ann@editors", "update", "articles:2").with_context("ip", "10.9.9.9");
    assert!(engine.is_allowed(&allowed).is_ok());

    let frozen = Request::new("ann@editors", "update", "articles:1").with_context("ip", "10.9.9.9");
    assert!(engine.is_allowed(&frozen).unwrap_err().is_forbidden());

    let outside = Request::new("ann@editors", "update", "articles:2").with_context("ip", "192.168.1.1");
    assert!(engine.is_allowed(&outside).unwrap_err().is_forbidden());

    let stranger = Request::new("ann", "update", "articles:2").with_context("ip", "10.9.9.9");
    assert!(engine.is_allowed(&stranger).unwrap_err().is_forbidden());
}

#[test]
fn test_crud_contract() {
    let store = SqliteStore::open_in_memory(registry()).unwrap();

    assert!(matches!(store.get("missing"), Err(WardenError::NotFound(_))));
    store.delete("missing").unwrap();

    store.create(office_editors()).unwrap();
    assert!(matches!(
        store.create(office_editors()),
        Err(WardenError::Conflict(_))
    ));

    assert!(matches!(
        store.create(Policy::allow("no-actions")),
        Err(WardenError::InvalidPolicy(_))
    ));
    assert!(matches!(
        store.create(Policy::allow("broken").actions(["<[a-z"])),
        Err(WardenError::Compile { .. })
    ));

    store.delete("office-editors").unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_engine_from_sqlite_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = EngineConfig {
        pattern_cache_capacity: 0,
        store: StoreConfig::Sqlite {
            path: temp_dir.path().join("configured.db"),
        },
    };

    let engine = PolicyEngine::from_config(&config, registry()).unwrap();
    assert!(engine.pattern_cache().is_none());

    engine
        .store()
        .create(Policy::allow("p1").subjects(["peter"]).actions(["read"]))
        .unwrap();
    assert!(engine.is_allowed(&Request::new("peter", "read", "")).is_ok());
}
