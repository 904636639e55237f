//! ---
//! pulse_section: "06-security-access-control"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Static permission catalog for the Pulse dashboard."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
//! The permission catalog is versioned with the code. Adding a permission is a
//! definition change here, never a stored-state change.

use serde::Serialize;

/// A named capability gating a feature, action, or data view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Permission {
    /// Unique, stable identifier (e.g. `view_dashboard`).
    pub key: &'static str,
    /// Human readable name.
    pub label: &'static str,
    /// Explanation of what the grant allows.
    pub description: &'static str,
}

const fn permission(key: &'static str, label: &'static str, description: &'static str) -> Permission {
    Permission {
        key,
        label,
        description,
    }
}

/// Every known permission, in rendering order.
pub const CATALOG: &[Permission] = &[
    permission(
        "view_dashboard",
        "View dashboard",
        "Open the home dashboard with team and personal KPIs.",
    ),
    permission(
        "view_scorecards",
        "View scorecards",
        "See scorecards and the metrics attached to them.",
    ),
    permission(
        "manage_scorecards",
        "Manage scorecards",
        "Create, edit, and archive scorecards and their metric targets.",
    ),
    permission(
        "view_coaching",
        "View coaching",
        "See coaching plans and session notes shared with you.",
    ),
    permission(
        "coach_team",
        "Coach team",
        "Run coaching sessions and record feedback for team members.",
    ),
    permission(
        "manage_coaching_plans",
        "Manage coaching plans",
        "Create and assign coaching plans and their milestones.",
    ),
    permission(
        "view_contests",
        "View contests",
        "See active and past contests.",
    ),
    permission(
        "manage_contests",
        "Manage contests",
        "Create, schedule, and close contests.",
    ),
    permission(
        "view_leaderboards",
        "View leaderboards",
        "See contest and scorecard leaderboards.",
    ),
    permission(
        "manage_badges",
        "Manage badges",
        "Define badges and award them to users.",
    ),
    permission(
        "view_reports",
        "View reports",
        "Open team and organization performance reports.",
    ),
    permission(
        "export_data",
        "Export data",
        "Download report and scorecard data as files.",
    ),
    permission(
        "view_integrations",
        "View integrations",
        "See connected CRM and data integrations and their sync status.",
    ),
    permission(
        "manage_integrations",
        "Manage integrations",
        "Connect, configure, and disconnect integrations.",
    ),
    permission(
        "manage_teams",
        "Manage teams",
        "Create teams and move members between them.",
    ),
    permission(
        "manage_users",
        "Manage users",
        "Invite, deactivate, and change the role of users.",
    ),
    permission(
        "manage_permissions",
        "Manage permissions",
        "Grant or revoke individual permissions for any user.",
    ),
    permission(
        "manage_organization",
        "Manage organization",
        "Edit organization profile, branding, and settings.",
    ),
    permission(
        "manage_billing",
        "Manage billing",
        "Change the subscription plan and payment details.",
    ),
    permission(
        "view_systems",
        "View systems",
        "Open system health, job queues, and diagnostic pages.",
    ),
];

pub(crate) const fn str_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

pub(crate) const fn catalog_contains(key: &str) -> bool {
    let mut i = 0;
    while i < CATALOG.len() {
        if str_eq(CATALOG[i].key, key) {
            return true;
        }
        i += 1;
    }
    false
}

const fn keys_unique(entries: &[Permission]) -> bool {
    let mut i = 0;
    while i < entries.len() {
        let mut j = i + 1;
        while j < entries.len() {
            if str_eq(entries[i].key, entries[j].key) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(keys_unique(CATALOG), "duplicate key in permission catalog");

/// Return the full catalog in definition order.
pub fn list_all() -> &'static [Permission] {
    CATALOG
}

/// Lookup a catalog entry by key.
pub fn lookup(key: &str) -> Option<&'static Permission> {
    CATALOG.iter().find(|permission| permission.key == key)
}

/// Whether the key names a catalog entry.
pub fn contains(key: &str) -> bool {
    lookup(key).is_some()
}
