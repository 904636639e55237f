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
use pulse_security::{catalog, defaults_for, Role};
use strum::IntoEnumIterator;

use crate::runtime::{build_engine, PrincipalArgs};

/// Print the permission catalog in definition order.
pub fn list_catalog(json: bool) -> Result<()> {
    let entries = catalog::list_all();
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    for permission in entries {
        println!(
            "{:<22} {:<22} {}",
            permission.key, permission.label, permission.description
        );
    }
    Ok(())
}

/// Print each role with its default keys.
pub fn roles(json: bool) -> Result<()> {
    if json {
        let table: serde_json::Map<String, serde_json::Value> = Role::iter()
            .map(|role| (role.to_string(), serde_json::json!(defaults_for(role))))
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }
    for role in Role::iter() {
        let keys: Vec<_> = defaults_for(role).into_iter().collect();
        println!("{role}: {}", keys.join(", "));
    }
    Ok(())
}

#[derive(Debug, Args)]
pub struct ShowCommand {
    #[command(flatten)]
    principal: PrincipalArgs,
}

impl ShowCommand {
    pub fn execute(self, config: &AppConfig, json: bool) -> Result<()> {
        let engine = build_engine(config)?;
        let profile = self.principal.profile(config)?;
        let rows = engine.permissions_with_state(&profile);
        if json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }
        let overrides = engine.overrides_for(&profile.id);
        println!("user: {} (role: {})", profile.id, profile.role);
        for row in rows {
            let marker = if row.enabled { "[x]" } else { "[ ]" };
            let source = match overrides.get(row.key) {
                Some(true) => " (forced grant)",
                Some(false) => " (forced deny)",
                None => "",
            };
            println!("{marker} {:<22} {}{source}", row.key, row.label);
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct CheckCommand {
    #[command(flatten)]
    principal: PrincipalArgs,

    /// Permission key to check; omit to check "no permission required".
    #[arg(long, value_name = "KEY")]
    permission: Option<String>,
}

impl CheckCommand {
    /// Returns whether the permission is held.
    pub fn execute(self, config: &AppConfig) -> Result<bool> {
        let engine = build_engine(config)?;
        let profile = self.principal.profile(config)?;
        let allowed = engine.is_allowed(&profile, self.permission.as_deref());
        println!("{}", if allowed { "allowed" } else { "denied" });
        Ok(allowed)
    }
}
