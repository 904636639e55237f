//! ---
//! pulse_section: "05-networking-external-interfaces"
//! pulse_subsection: "binary"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Administrative CLI for Pulse permissions."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use anyhow::Result;
use clap::Args;
use pulse_common::config::AppConfig;
use pulse_logging::{log_admin_event, AdminOutcome, LogContext};
use pulse_security::{AuditLog, PermissionError};

use crate::runtime::build_admin_engine;

fn default_actor() -> String {
    std::env::var("USER").unwrap_or_else(|_| "pulsectl".to_owned())
}

/// Log a rejected change at the level its cause deserves and hand it back.
fn report_failure(ctx: &LogContext, action: &str, err: PermissionError) -> anyhow::Error {
    let outcome = match &err {
        PermissionError::UnknownPermission(_) => AdminOutcome::Refused,
        PermissionError::Persistence(_) => AdminOutcome::Failed,
    };
    log_admin_event(ctx, action, outcome, &err.to_string());
    err.into()
}

#[derive(Debug, Args)]
pub struct OverrideCommand {
    /// User whose override changes.
    #[arg(long, value_name = "ID")]
    user: String,

    /// Permission key to change.
    #[arg(long, value_name = "KEY")]
    permission: String,

    /// Administrator recorded in the audit trail (defaults to $USER).
    #[arg(long, value_name = "NAME")]
    actor: Option<String>,
}

impl OverrideCommand {
    /// Force grant (`Some(true)`), force deny (`Some(false)`), or clear (`None`).
    pub fn execute(self, config: &AppConfig, value: Option<bool>) -> Result<()> {
        let engine = build_admin_engine(config)?;
        let actor = self.actor.unwrap_or_else(default_actor);
        let ctx = LogContext::new()
            .with_user(&self.user)
            .with_permission(&self.permission)
            .with_actor(&actor);

        let overrides = engine
            .set_override(&actor, &self.user, &self.permission, value)
            .map_err(|err| report_failure(&ctx, "permission.override", err))?;
        let summary = format!("{} override(s) stored", overrides.len());
        log_admin_event(&ctx, "permission.override", AdminOutcome::Applied, &summary);
        println!("{}: {summary}", self.user);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct ResetCommand {
    /// User whose overrides are removed.
    #[arg(long, value_name = "ID")]
    user: String,

    /// Administrator recorded in the audit trail (defaults to $USER).
    #[arg(long, value_name = "NAME")]
    actor: Option<String>,
}

impl ResetCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let engine = build_admin_engine(config)?;
        let actor = self.actor.unwrap_or_else(default_actor);
        let ctx = LogContext::new().with_user(&self.user).with_actor(&actor);
        let cleared = engine
            .reset_user(&actor, &self.user)
            .map_err(|err| report_failure(&ctx, "permission.reset", err))?;
        let summary = format!("{} override(s) cleared", cleared.len());
        log_admin_event(&ctx, "permission.reset", AdminOutcome::Applied, &summary);
        println!("{}: {summary}", self.user);
        Ok(())
    }
}

/// Verify the audit chain. Returns whether it is intact.
pub fn verify_audit(config: &AppConfig) -> Result<bool> {
    if !config.audit.enabled {
        println!("audit trail disabled");
        return Ok(true);
    }
    let log = AuditLog::open(&config.audit.path)?;
    let intact = log.verify()?;
    let entries = log.entries()?.len();
    if intact {
        println!("audit trail intact ({entries} entries)");
    } else {
        log_admin_event(
            &LogContext::new(),
            "permission.audit",
            AdminOutcome::Failed,
            "audit chain verification failed",
        );
        println!("audit trail TAMPERED");
    }
    Ok(intact)
}
