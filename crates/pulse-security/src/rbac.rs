//! ---
//! pulse_section: "06-security-access-control"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Roles, role normalization, and per-role default grants."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::catalog::catalog_contains;

/// Role enumerates the principal categories driving default authorization.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Full organization administrator.
    Admin,
    /// Team manager with coaching and contest management rights.
    Manager,
    /// Coach working with reps on their plans.
    Coach,
    /// Individual contributor; the least privileged role.
    #[default]
    PowerUser,
}

impl Role {
    /// Stable snake_case name of the role.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Map a free-form role string onto the closed [`Role`] set.
///
/// Matching trims whitespace and ignores case. `"power user"` is accepted as a
/// synonym of `power_user`. Anything unrecognised, including `None`, becomes
/// [`Role::PowerUser`].
pub fn normalize_role(raw: Option<&str>) -> Role {
    let Some(raw) = raw else {
        return Role::PowerUser;
    };
    match raw.trim().to_lowercase().as_str() {
        "admin" => Role::Admin,
        "manager" => Role::Manager,
        "coach" => Role::Coach,
        "power_user" | "power user" => Role::PowerUser,
        _ => Role::PowerUser,
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        normalize_role(Some(raw))
    }
}

const ADMIN_DEFAULTS: &[&str] = &[
    "view_dashboard",
    "view_scorecards",
    "manage_scorecards",
    "view_coaching",
    "coach_team",
    "manage_coaching_plans",
    "view_contests",
    "manage_contests",
    "view_leaderboards",
    "manage_badges",
    "view_reports",
    "export_data",
    "view_integrations",
    "manage_integrations",
    "manage_teams",
    "manage_users",
    "manage_permissions",
    "manage_organization",
    "manage_billing",
    "view_systems",
];

const MANAGER_DEFAULTS: &[&str] = &[
    "view_dashboard",
    "view_scorecards",
    "manage_scorecards",
    "view_coaching",
    "coach_team",
    "manage_coaching_plans",
    "view_contests",
    "manage_contests",
    "view_leaderboards",
    "manage_badges",
    "view_reports",
    "export_data",
    "view_integrations",
    "manage_teams",
];

const COACH_DEFAULTS: &[&str] = &[
    "view_dashboard",
    "view_scorecards",
    "view_coaching",
    "coach_team",
    "manage_coaching_plans",
    "view_contests",
    "view_leaderboards",
    "view_reports",
];

const POWER_USER_DEFAULTS: &[&str] = &[
    "view_dashboard",
    "view_scorecards",
    "view_coaching",
    "view_contests",
    "view_leaderboards",
];

const fn all_in_catalog(keys: &[&str]) -> bool {
    let mut i = 0;
    while i < keys.len() {
        if !catalog_contains(keys[i]) {
            return false;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    all_in_catalog(ADMIN_DEFAULTS)
        && all_in_catalog(MANAGER_DEFAULTS)
        && all_in_catalog(COACH_DEFAULTS)
        && all_in_catalog(POWER_USER_DEFAULTS),
    "role default references a key missing from the catalog"
);

fn configured_defaults(role: Role) -> &'static [&'static str] {
    match role {
        Role::Admin => ADMIN_DEFAULTS,
        Role::Manager => MANAGER_DEFAULTS,
        Role::Coach => COACH_DEFAULTS,
        Role::PowerUser => POWER_USER_DEFAULTS,
    }
}

/// Baseline permission keys granted to a role.
///
/// A role without configured defaults falls back to the `power_user` table.
pub fn defaults_for(role: Role) -> BTreeSet<&'static str> {
    let keys = match configured_defaults(role) {
        [] => POWER_USER_DEFAULTS,
        keys => keys,
    };
    keys.iter().copied().collect()
}
