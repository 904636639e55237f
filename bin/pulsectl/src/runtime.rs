//! ---
//! pulse_section: "05-networking-external-interfaces"
//! pulse_subsection: "binary"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Administrative CLI for Pulse permissions."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use pulse_common::config::AppConfig;
use pulse_logging::pulse_warn;
use pulse_logging::LogContext;
use pulse_security::{AuditLog, FileOverrideStore, PermissionEngine, ProfileDirectory, UserProfile};
use serde_json::json;

/// Engine wired to the configured override store.
pub type Engine = PermissionEngine<FileOverrideStore>;

fn open_store(config: &AppConfig) -> Result<FileOverrideStore> {
    FileOverrideStore::open(&config.overrides.directory, &config.overrides.namespace).with_context(
        || {
            format!(
                "unable to open override store in {}",
                config.overrides.directory.display()
            )
        },
    )
}

/// Engine for read-only commands. The audit trail is left closed, so a damaged
/// trail cannot stop evaluation.
pub fn build_engine(config: &AppConfig) -> Result<Engine> {
    Ok(PermissionEngine::new(open_store(config)?))
}

/// Engine for commands that change overrides, recording to the audit trail when enabled.
pub fn build_admin_engine(config: &AppConfig) -> Result<Engine> {
    let mut engine = PermissionEngine::new(open_store(config)?);
    if config.audit.enabled {
        engine = engine.with_audit(AuditLog::open(&config.audit.path)?);
    }
    Ok(engine)
}

/// Identifies the principal whose permissions are inspected.
#[derive(Debug, Args)]
pub struct PrincipalArgs {
    /// User identifier overrides are stored under.
    #[arg(long, value_name = "ID")]
    pub user: String,

    /// Role of the user; free-form, normalized (unknown roles become power_user).
    #[arg(long, value_name = "ROLE")]
    pub role: Option<String>,

    /// Explicit permission attached to the user record (repeatable).
    #[arg(long = "grant", value_name = "KEY")]
    pub grants: Vec<String>,

    /// JSON file of profile records keyed by user id; overrides `[profiles].path`.
    #[arg(long, value_name = "FILE")]
    pub profiles: Option<PathBuf>,
}

impl PrincipalArgs {
    /// Build the profile from flags, falling back to the profiles file.
    pub fn profile(&self, config: &AppConfig) -> Result<UserProfile> {
        if let Some(role) = &self.role {
            let record = json!({"role": role, "permissions": self.grants});
            return Ok(UserProfile::from_record(self.user.clone(), &record));
        }

        let source = self.profiles.as_ref().or(config.profiles.path.as_ref());
        let found = match source {
            Some(path) => ProfileDirectory::load_json(path)?.get(&self.user),
            None => None,
        };
        let mut profile = found.unwrap_or_else(|| {
            pulse_warn!(
                context = LogContext::new().with_user(&self.user),
                "no profile record found; evaluating as power_user"
            );
            UserProfile::from_record(self.user.clone(), &serde_json::Value::Null)
        });
        profile
            .explicit_permissions
            .extend(self.grants.iter().cloned());
        Ok(profile)
    }
}
