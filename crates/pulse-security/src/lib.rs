//! ---
//! pulse_section: "06-security-access-control"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Role and permission evaluation for the Pulse dashboard."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
//! Permission engine: the static catalog, per-role defaults, override
//! resolution, and durable per-user override storage.
#![warn(missing_docs)]

pub mod audit;
pub mod catalog;
pub mod engine;
pub mod identity;
pub mod metrics;
pub mod overrides;
pub mod rbac;
pub mod resolve;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use catalog::{list_all, Permission};
pub use engine::{PermissionEngine, PermissionError};
pub use identity::{ProfileDirectory, UserId, UserProfile};
pub use metrics::PermissionMetrics;
pub use overrides::{
    overrides_from_value, FileOverrideStore, MemoryOverrideStore, OverrideStore, Overrides,
    StoreError,
};
pub use rbac::{defaults_for, normalize_role, Role};
pub use resolve::{has_permission, list_with_state, resolve, EffectivePermissions, PermissionState};
