//! ---
//! pulse_section: "03-persistence-logging"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Durable per-user permission override storage."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
//! Overrides are stored as one document per namespace:
//!
//! ```json
//! { "<userId>": { "<permissionKey>": true, "<otherKey>": false } }
//! ```
//!
//! Reading never fails. Absent, unreadable, or corrupt content degrades to "no
//! overrides" so evaluation falls back to role defaults.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Per-user override map: permission key to forced grant (`true`) or deny (`false`).
pub type Overrides = BTreeMap<String, bool>;

/// Errors raised by override storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper for IO errors encountered while reading or writing the override document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Namespace is empty or not a single path segment.
    #[error("invalid override namespace: {0:?}")]
    InvalidNamespace(String),
}

/// Keyed persistence of override maps, one entry per user.
pub trait OverrideStore: Send + Sync {
    /// Overrides stored for the user; empty when none are stored or storage is unusable.
    fn get(&self, user_id: &str) -> Overrides;

    /// Replace the user's entire override map, reporting write failures.
    fn try_set(&self, user_id: &str, overrides: &Overrides) -> Result<(), StoreError>;

    /// Replace the user's entire override map. Write failures are logged, not returned.
    fn set(&self, user_id: &str, overrides: &Overrides) {
        if let Err(err) = self.try_set(user_id, overrides) {
            error!(user_id, error = %err, "failed to persist permission overrides");
        }
    }

    /// Drop every override for the user, restoring pure role-default behaviour.
    fn reset_user(&self, user_id: &str) {
        self.set(user_id, &Overrides::new());
    }
}

/// Keep only boolean-valued entries of a JSON object. Anything else is absent.
pub fn overrides_from_value(value: &Value) -> Overrides {
    let Some(object) = value.as_object() else {
        return Overrides::new();
    };
    object
        .iter()
        .filter_map(|(key, value)| value.as_bool().map(|granted| (key.clone(), granted)))
        .collect()
}

fn overrides_to_value(overrides: &Overrides) -> Value {
    Value::Object(
        overrides
            .iter()
            .map(|(key, granted)| (key.clone(), Value::Bool(*granted)))
            .collect(),
    )
}

/// Session-only store backed by a map in memory.
#[derive(Debug, Default)]
pub struct MemoryOverrideStore {
    entries: RwLock<HashMap<String, Overrides>>,
}

impl MemoryOverrideStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverrideStore for MemoryOverrideStore {
    fn get(&self, user_id: &str) -> Overrides {
        self.entries.read().get(user_id).cloned().unwrap_or_default()
    }

    fn try_set(&self, user_id: &str, overrides: &Overrides) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        if overrides.is_empty() {
            entries.remove(user_id);
        } else {
            entries.insert(user_id.to_owned(), overrides.clone());
        }
        Ok(())
    }
}

/// Store persisting every user's overrides in a single JSON document per namespace.
#[derive(Debug)]
pub struct FileOverrideStore {
    path: PathBuf,
    namespace: String,
    write_lock: Mutex<()>,
}

impl FileOverrideStore {
    /// Open the namespace under `directory`. The document is created on first write.
    pub fn open(directory: impl AsRef<Path>, namespace: &str) -> Result<Self, StoreError> {
        validate_namespace(namespace)?;
        let path = directory.as_ref().join(format!("{namespace}.json"));
        debug!(namespace, path = %path.display(), "opened override store");
        Ok(Self {
            path,
            namespace: namespace.to_owned(),
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Namespace the store was opened with.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read the whole document for a lookup. Any failure reads as empty.
    fn load_document(&self) -> Map<String, Value> {
        self.read_document().unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "override store unreadable; using no overrides");
            Map::new()
        })
    }

    /// Read the whole document before a write.
    ///
    /// A missing or corrupt document is empty and gets replaced, but a failed
    /// read is an error: writing over a document we could not see would drop
    /// every other user's entry.
    fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(StoreError::Io(err)),
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(_) => {
                warn!(path = %self.path.display(), "override document is not an object; using no overrides");
                Ok(Map::new())
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "override document corrupt; using no overrides");
                Ok(Map::new())
            }
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        // Each writer stages into its own file so concurrent writers never share one.
        let mut staging = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(staging.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush()?;
        }
        staging.as_file().sync_all()?;
        staging.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl OverrideStore for FileOverrideStore {
    fn get(&self, user_id: &str) -> Overrides {
        self.load_document()
            .get(user_id)
            .map(overrides_from_value)
            .unwrap_or_default()
    }

    fn try_set(&self, user_id: &str, overrides: &Overrides) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut document = self.read_document()?;
        if overrides.is_empty() {
            document.remove(user_id);
        } else {
            document.insert(user_id.to_owned(), overrides_to_value(overrides));
        }
        self.write_document(&document)?;
        debug!(user_id, entries = overrides.len(), namespace = %self.namespace, "persisted permission overrides");
        Ok(())
    }
}

fn validate_namespace(namespace: &str) -> Result<(), StoreError> {
    let valid = !namespace.is_empty()
        && namespace != "."
        && namespace != ".."
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidNamespace(namespace.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> Overrides {
        Overrides::from([
            ("manage_permissions".to_owned(), true),
            ("view_systems".to_owned(), false),
        ])
    }

    #[test]
    fn memory_store_round_trips_and_resets() {
        let store = MemoryOverrideStore::new();
        assert!(store.get("user-1").is_empty());
        store.set("user-1", &sample());
        assert_eq!(store.get("user-1"), sample());
        store.reset_user("user-1");
        assert!(store.get("user-1").is_empty());
    }

    #[test]
    fn file_store_round_trips_per_user() {
        let dir = tempdir().unwrap();
        let store = FileOverrideStore::open(dir.path(), "permission_overrides").unwrap();
        assert!(store.get("fresh-user").is_empty());

        store.set("user-1", &sample());
        store.set("user-2", &Overrides::from([("export_data".to_owned(), true)]));
        assert_eq!(store.get("user-1"), sample());

        let reopened = FileOverrideStore::open(dir.path(), "permission_overrides").unwrap();
        assert_eq!(reopened.get("user-1"), sample());
    }

    #[test]
    fn set_replaces_instead_of_merging() {
        let dir = tempdir().unwrap();
        let store = FileOverrideStore::open(dir.path(), "ns").unwrap();
        store.set("user-1", &sample());
        let replacement = Overrides::from([("export_data".to_owned(), true)]);
        store.set("user-1", &replacement);
        assert_eq!(store.get("user-1"), replacement);
    }

    #[test]
    fn reset_only_clears_one_user() {
        let dir = tempdir().unwrap();
        let store = FileOverrideStore::open(dir.path(), "ns").unwrap();
        store.set("user-1", &sample());
        store.set("user-2", &sample());
        store.reset_user("user-1");

        assert!(store.get("user-1").is_empty());
        assert_eq!(store.get("user-2"), sample());
        let document: Value = serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert!(document.get("user-1").is_none());
    }

    #[test]
    fn corrupt_document_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileOverrideStore::open(dir.path(), "ns").unwrap();
        fs::write(store.path(), b"{ not json").unwrap();
        assert!(store.get("user-1").is_empty());

        fs::write(store.path(), b"[1, 2, 3]").unwrap();
        assert!(store.get("user-1").is_empty());

        // A corrupt document is replaced on the next write.
        store.set("user-1", &sample());
        assert_eq!(store.get("user-1"), sample());
    }

    #[test]
    fn malformed_entries_are_dropped_not_coerced() {
        let dir = tempdir().unwrap();
        let store = FileOverrideStore::open(dir.path(), "ns").unwrap();
        let document = json!({
            "user-1": {
                "export_data": true,
                "view_systems": "false",
                "manage_users": 1,
                "manage_teams": null,
                "coach_team": false
            },
            "user-2": "garbage"
        });
        fs::write(store.path(), document.to_string()).unwrap();

        let overrides = store.get("user-1");
        assert_eq!(
            overrides,
            Overrides::from([
                ("coach_team".to_owned(), false),
                ("export_data".to_owned(), true),
            ])
        );
        assert!(store.get("user-2").is_empty());
    }

    #[test]
    fn write_failure_is_reported_by_try_set_only() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, b"file, not a directory").unwrap();
        let store = FileOverrideStore::open(&blocker, "ns").unwrap();

        assert!(store.try_set("user-1", &sample()).is_err());
        store.set("user-1", &sample());
        assert!(store.get("user-1").is_empty());
    }

    #[test]
    fn unreadable_document_blocks_writes_but_not_reads() {
        let dir = tempdir().unwrap();
        let store = FileOverrideStore::open(dir.path(), "ns").unwrap();
        // A directory in place of the document fails to read even for root.
        fs::create_dir(store.path()).unwrap();
        fs::write(store.path().join("keep"), b"other users").unwrap();

        assert!(store.get("user-1").is_empty());
        assert!(matches!(store.read_document(), Err(StoreError::Io(_))));
        assert!(matches!(
            store.try_set("user-1", &sample()),
            Err(StoreError::Io(_))
        ));
        assert!(store.path().join("keep").exists());
    }

    #[test]
    fn writes_leave_no_staging_files_behind() {
        let dir = tempdir().unwrap();
        let store = FileOverrideStore::open(dir.path(), "ns").unwrap();
        store.set("user-1", &sample());
        store.set("user-2", &sample());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("ns.json")]);
    }

    #[test]
    fn concurrent_writers_keep_the_document_parseable() {
        let dir = tempdir().unwrap();
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let path = dir.path().to_path_buf();
                std::thread::spawn(move || {
                    // Separate handles stand in for separate processes.
                    let store = FileOverrideStore::open(&path, "ns").unwrap();
                    for round in 0..10 {
                        let user = format!("user-{worker}-{round}");
                        store.try_set(&user, &sample()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let document: Value =
            serde_json::from_slice(&fs::read(dir.path().join("ns.json")).unwrap()).unwrap();
        assert!(document.is_object());
    }

    #[test]
    fn namespace_must_be_single_segment() {
        let dir = tempdir().unwrap();
        for bad in ["", "..", "a/b", "with space"] {
            assert!(matches!(
                FileOverrideStore::open(dir.path(), bad),
                Err(StoreError::InvalidNamespace(_))
            ));
        }
        assert!(FileOverrideStore::open(dir.path(), "pulse.permission_overrides-v1").is_ok());
    }

    #[test]
    fn overrides_from_value_ignores_non_objects() {
        assert!(overrides_from_value(&json!(null)).is_empty());
        assert!(overrides_from_value(&json!(["view_dashboard"])).is_empty());
        assert_eq!(
            overrides_from_value(&json!({"view_dashboard": false, "x": "y"})),
            Overrides::from([("view_dashboard".to_owned(), false)])
        );
    }
}
