//! ---
//! pulse_section: "03-persistence-logging"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Structured logging adapters for permission events."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing as __tracing;

/// Environment variable holding the filter directive for tools.
pub const FILTER_ENV: &str = "PULSE_LOG";

/// Install a stderr subscriber for tools and tests.
///
/// Stdout is left to command output. The filter comes from `PULSE_LOG`, then
/// `RUST_LOG`, then `warn`, so interactive commands stay quiet by default.
/// Returns `false` when a subscriber was already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    Registry::default()
        .with(filter)
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// User whose permissions are being evaluated or changed.
    pub user: Option<&'a str>,
    /// Normalized role of that user.
    pub role: Option<&'a str>,
    /// Permission key involved.
    pub permission: Option<&'a str>,
    /// Administrator performing a change.
    pub actor: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a user identifier.
    pub fn with_user(mut self, user: &'a str) -> Self {
        self.user = Some(user);
        self
    }

    /// Attach a role name.
    pub fn with_role(mut self, role: &'a str) -> Self {
        self.role = Some(role);
        self
    }

    /// Attach a permission key.
    pub fn with_permission(mut self, permission: &'a str) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Attach the acting administrator.
    pub fn with_actor(mut self, actor: &'a str) -> Self {
        self.actor = Some(actor);
        self
    }
}

/// How an administrative request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    /// The change was stored (and audited when auditing is on).
    Applied,
    /// The request was invalid, e.g. an unknown permission key. Logged at `warn`.
    Refused,
    /// Storage or the audit trail failed. Logged at `error`.
    Failed,
}

impl AdminOutcome {
    /// Stable label written to the `outcome` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminOutcome::Applied => "applied",
            AdminOutcome::Refused => "refused",
            AdminOutcome::Failed => "failed",
        }
    }
}

/// Record the outcome of an administrative action such as `permission.override`.
pub fn log_admin_event(context: &LogContext, action: &str, outcome: AdminOutcome, detail: &str) {
    let label = outcome.as_str();
    match outcome {
        AdminOutcome::Applied => {
            crate::__pulse_event!(INFO, *context, [action = action, outcome = label], "{detail}")
        }
        AdminOutcome::Refused => {
            crate::__pulse_event!(WARN, *context, [action = action, outcome = label], "{detail}")
        }
        AdminOutcome::Failed => {
            crate::__pulse_event!(ERROR, *context, [action = action, outcome = label], "{detail}")
        }
    }
}
