//! ---
//! pulse_section: "06-security-access-control"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Permission engine facade over an injected override store."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
//! Callers resolve a principal's permissions once and gate every route or
//! action through [`has_permission`] against that set, rather than comparing
//! role names inline.

use parking_lot::Mutex;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::audit::{AuditAction, AuditLog};
use crate::catalog;
use crate::identity::UserProfile;
use crate::metrics::PermissionMetrics;
use crate::overrides::{OverrideStore, Overrides, StoreError};
use crate::resolve::{has_permission, resolve, states_for, EffectivePermissions, PermissionState};

/// Errors returned by administrative engine operations.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The key does not name a catalog entry.
    #[error("unknown permission: {0}")]
    UnknownPermission(String),
    /// The override store rejected the write; nothing was changed or audited.
    #[error("failed to persist overrides: {0}")]
    Persistence(#[from] StoreError),
}

/// Resolves effective permissions and edits overrides through an injected store.
pub struct PermissionEngine<S> {
    store: S,
    audit: Option<Mutex<AuditLog>>,
    metrics: Option<PermissionMetrics>,
}

impl<S: OverrideStore> PermissionEngine<S> {
    /// Create an engine over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            audit: None,
            metrics: None,
        }
    }

    /// Record every override change in the given audit trail.
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(Mutex::new(audit));
        self
    }

    /// Count evaluations, denials, and store activity.
    pub fn with_metrics(mut self, metrics: PermissionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Overrides currently stored for the user.
    pub fn overrides_for(&self, user_id: &str) -> Overrides {
        self.store.get(user_id)
    }

    /// Resolve the user's effective permission set.
    pub fn effective_for(&self, profile: &UserProfile) -> EffectivePermissions {
        let overrides = self.store.get(&profile.id);
        let effective = resolve(profile.role, &overrides, &profile.explicit_permissions);
        if let Some(metrics) = &self.metrics {
            metrics.inc_evaluation();
        }
        debug!(
            user_id = %profile.id,
            role = %profile.role,
            overrides = overrides.len(),
            granted = effective.len(),
            "resolved effective permissions"
        );
        effective
    }

    /// Resolve and check a single key.
    pub fn is_allowed(&self, profile: &UserProfile, key: Option<&str>) -> bool {
        let allowed = has_permission(&self.effective_for(profile), key);
        if !allowed {
            if let Some(metrics) = &self.metrics {
                metrics.inc_denial();
            }
            debug!(user_id = %profile.id, permission = key.unwrap_or_default(), "permission denied");
        }
        allowed
    }

    /// Full catalog annotated with the user's resolved state.
    pub fn permissions_with_state(&self, profile: &UserProfile) -> Vec<PermissionState> {
        states_for(&self.effective_for(profile))
    }

    /// Force a key to grant (`Some(true)`), deny (`Some(false)`), or inherit (`None`).
    ///
    /// Returns the user's override map as written. The change is audited only
    /// once the store has accepted it.
    pub fn set_override(
        &self,
        actor: &str,
        user_id: &str,
        key: &str,
        value: Option<bool>,
    ) -> Result<Overrides, PermissionError> {
        if !catalog::contains(key) {
            return Err(PermissionError::UnknownPermission(key.to_owned()));
        }
        let mut overrides = self.store.get(user_id);
        let action = match value {
            Some(granted) => {
                overrides.insert(key.to_owned(), granted);
                AuditAction::OverrideSet
            }
            None => {
                overrides.remove(key);
                AuditAction::OverrideCleared
            }
        };
        self.persist(user_id, &overrides)?;
        info!(actor, user_id, permission = key, value = ?value, "permission override changed");
        self.record(
            actor,
            action,
            user_id,
            json!({"permission": key, "value": value, "overrides": &overrides}),
        );
        Ok(overrides)
    }

    /// Remove every override for the user, returning the overrides that were cleared.
    pub fn reset_user(&self, actor: &str, user_id: &str) -> Result<Overrides, PermissionError> {
        let previous = self.store.get(user_id);
        self.persist(user_id, &Overrides::new())?;
        info!(actor, user_id, cleared = previous.len(), "permission overrides reset");
        self.record(
            actor,
            AuditAction::OverrideReset,
            user_id,
            json!({"cleared": &previous}),
        );
        Ok(previous)
    }

    fn persist(&self, user_id: &str, overrides: &Overrides) -> Result<(), StoreError> {
        match self.store.try_set(user_id, overrides) {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_override_write();
                }
                Ok(())
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_store_failure();
                }
                error!(user_id, error = %err, "failed to persist permission overrides");
                Err(err)
            }
        }
    }

    fn record(&self, actor: &str, action: AuditAction, subject: &str, metadata: serde_json::Value) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(err) = audit.lock().append(actor, action, subject, metadata) {
            error!(actor, subject, error = %err, "failed to append audit entry");
        }
    }
}
