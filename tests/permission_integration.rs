//! ---
//! pulse_section: "15-testing-qa-runbook"
//! pulse_subsection: "integration-tests"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Integration and validation tests for the Pulse permission stack."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::Registry;
use pulse_common::config::AppConfig;
use pulse_security::{
    has_permission, list_with_state, resolve, AuditLog, FileOverrideStore, OverrideStore,
    Overrides, PermissionEngine, PermissionMetrics, ProfileDirectory, Role, UserProfile,
};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn end_to_end_override_administration() {
    let dir = tempdir().unwrap();
    let config: AppConfig = format!(
        "[overrides]\ndirectory = {:?}\nnamespace = \"acme\"\n\n[audit]\npath = {:?}\n",
        dir.path().join("state").display().to_string(),
        dir.path().join("state/audit.log").display().to_string(),
    )
    .parse()
    .unwrap();

    // Profiles arrive as untyped records and are parsed once at the boundary.
    let profiles = ProfileDirectory::new();
    profiles.upsert(UserProfile::from_record(
        "mgr-1",
        &json!({"role": "manager", "permissions": []}),
    ));
    profiles.upsert(UserProfile::from_record("adm-1", &json!({"role": "ADMIN"})));
    profiles.upsert(UserProfile::from_record("rep-1", &json!({"role": "intern"})));

    let registry = Arc::new(Registry::new());
    let metrics = PermissionMetrics::new(registry.clone()).unwrap();
    let store =
        FileOverrideStore::open(&config.overrides.directory, &config.overrides.namespace).unwrap();
    let engine = PermissionEngine::new(store)
        .with_audit(AuditLog::open(&config.audit.path).unwrap())
        .with_metrics(metrics.clone());

    let manager = profiles.get("mgr-1").unwrap();
    let admin = profiles.get("adm-1").unwrap();
    let rep = profiles.get("rep-1").unwrap();
    assert_eq!(rep.role, Role::PowerUser);

    engine
        .set_override("adm-1", "mgr-1", "manage_permissions", Some(true))
        .unwrap();
    engine
        .set_override("adm-1", "adm-1", "view_systems", Some(false))
        .unwrap();

    let manager_set = engine.effective_for(&manager);
    for key in ["view_dashboard", "coach_team", "manage_permissions"] {
        assert!(has_permission(&manager_set, Some(key)));
    }
    assert!(!engine.is_allowed(&admin, Some("view_systems")));
    assert!(!engine.is_allowed(&admin, Some("totally_unknown_key")));
    assert!(!engine.is_allowed(&rep, Some("manage_contests")));

    // A second process opening the same namespace sees the same overrides.
    let reopened =
        FileOverrideStore::open(&config.overrides.directory, &config.overrides.namespace).unwrap();
    assert_eq!(
        reopened.get("mgr-1"),
        Overrides::from([("manage_permissions".to_owned(), true)])
    );

    engine.reset_user("adm-1", "mgr-1").unwrap();
    assert_eq!(
        engine.effective_for(&manager),
        resolve(Role::Manager, &Overrides::new(), &[])
    );
    assert_eq!(reopened.get("adm-1").len(), 1);

    let audit = AuditLog::open(&config.audit.path).unwrap();
    assert_eq!(audit.entries().unwrap().len(), 3);
    assert!(audit.verify().unwrap());
    assert_eq!(metrics.denials(), 3);
    assert_eq!(registry.gather().len(), 4);
}

#[test]
fn listing_matches_engine_view() {
    let dir = tempdir().unwrap();
    let engine = PermissionEngine::new(FileOverrideStore::open(dir.path(), "ns").unwrap());
    let coach = UserProfile::new("coach-1", Role::Coach).with_explicit(["export_data"]);
    engine
        .set_override("adm-1", "coach-1", "coach_team", Some(false))
        .unwrap();

    let direct = list_with_state(
        coach.role,
        &engine.overrides_for(&coach.id),
        &coach.explicit_permissions,
    );
    assert_eq!(engine.permissions_with_state(&coach), direct);
    let exported = direct.iter().find(|row| row.key == "export_data").unwrap();
    assert!(exported.enabled);
    let coaching = direct.iter().find(|row| row.key == "coach_team").unwrap();
    assert!(!coaching.enabled);
}
