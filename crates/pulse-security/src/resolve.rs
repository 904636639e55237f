//! ---
//! pulse_section: "06-security-access-control"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Effective permission resolution and gating queries."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::{self, Permission};
use crate::overrides::Overrides;
use crate::rbac::{defaults_for, Role};

/// Final set of permission keys a principal holds.
///
/// Derived on demand and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EffectivePermissions(BTreeSet<String>);

impl EffectivePermissions {
    /// Membership test for a single key.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Iterate the keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no key is held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for EffectivePermissions {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Merge role defaults, explicit grants, and overrides into one set.
///
/// Overrides are applied last: `true` adds the key and `false` removes it,
/// regardless of where it came from.
pub fn resolve(role: Role, overrides: &Overrides, explicit: &[String]) -> EffectivePermissions {
    let mut keys: BTreeSet<String> = defaults_for(role)
        .into_iter()
        .map(str::to_owned)
        .collect();
    keys.extend(explicit.iter().cloned());
    for (key, granted) in overrides {
        if *granted {
            keys.insert(key.clone());
        } else {
            keys.remove(key);
        }
    }
    EffectivePermissions(keys)
}

/// Gate check used by route guards and action controls.
///
/// A missing or empty key means no permission is required and always passes.
pub fn has_permission(effective: &EffectivePermissions, key: Option<&str>) -> bool {
    match key {
        None => true,
        Some(key) if key.is_empty() => true,
        Some(key) => effective.contains(key),
    }
}

/// One catalog row annotated with whether it is granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionState {
    /// Catalog key.
    pub key: &'static str,
    /// Human readable name.
    pub label: &'static str,
    /// Explanation of the grant.
    pub description: &'static str,
    /// Whether the key is in the effective set.
    pub enabled: bool,
}

impl PermissionState {
    fn new(permission: &Permission, enabled: bool) -> Self {
        Self {
            key: permission.key,
            label: permission.label,
            description: permission.description,
            enabled,
        }
    }
}

/// Every catalog entry, in catalog order, with its resolved state.
pub fn list_with_state(
    role: Role,
    overrides: &Overrides,
    explicit: &[String],
) -> Vec<PermissionState> {
    states_for(&resolve(role, overrides, explicit))
}

pub(crate) fn states_for(effective: &EffectivePermissions) -> Vec<PermissionState> {
    catalog::list_all()
        .iter()
        .map(|permission| PermissionState::new(permission, effective.contains(permission.key)))
        .collect()
}
