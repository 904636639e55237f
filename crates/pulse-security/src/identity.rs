//! ---
//! pulse_section: "06-security-access-control"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "User profiles parsed from untyped records and an in-memory directory."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::rbac::{normalize_role, Role};

/// Identifier for a user account.
pub type UserId = String;

/// Typed view of a user record as far as authorization is concerned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    /// Stable identifier.
    pub id: UserId,
    /// Normalized role.
    pub role: Role,
    /// Permission keys attached directly to the user, outside the role system.
    #[serde(default)]
    pub explicit_permissions: Vec<String>,
}

impl UserProfile {
    /// Short helper for constructing a profile without explicit grants.
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            explicit_permissions: Vec::new(),
        }
    }

    /// Attach explicit permission keys.
    pub fn with_explicit<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explicit_permissions = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Parse an arbitrary profile record.
    ///
    /// `role` must be a string to be considered and is normalized; anything else
    /// yields `power_user`. `permissions` must be an array; only its string
    /// elements are kept.
    pub fn from_record(id: impl Into<UserId>, record: &Value) -> Self {
        let role = normalize_role(record.get("role").and_then(Value::as_str));
        let explicit_permissions = record
            .get("permissions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            id: id.into(),
            role,
            explicit_permissions,
        }
    }
}

/// In-memory, thread-safe directory of user profiles.
#[derive(Debug, Default, Clone)]
pub struct ProfileDirectory {
    profiles: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl ProfileDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load profiles from a JSON file shaped as `{ "<userId>": <record>, ... }`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read profiles file {}", path.display()))?;
        let document: Value = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse profiles file {}", path.display()))?;
        let records = document
            .as_object()
            .ok_or_else(|| anyhow!("profiles file {} must contain an object", path.display()))?;

        let directory = Self::new();
        for (id, record) in records {
            directory.upsert(UserProfile::from_record(id.clone(), record));
        }
        debug!(path = %path.display(), profiles = records.len(), "loaded user profiles");
        Ok(directory)
    }

    /// Create or replace a profile.
    pub fn upsert(&self, profile: UserProfile) {
        self.profiles.write().insert(profile.id.clone(), profile);
    }

    /// Retrieve a profile by id.
    pub fn get(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.read().get(user_id).cloned()
    }

    /// Remove a profile, returning whether it existed.
    pub fn remove(&self, user_id: &str) -> bool {
        self.profiles.write().remove(user_id).is_some()
    }

    /// All profiles sorted by id.
    pub fn list(&self) -> Vec<UserProfile> {
        let mut profiles: Vec<_> = self.profiles.read().values().cloned().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }
}
