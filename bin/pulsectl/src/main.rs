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
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use pulse_common::config::AppConfig;

mod inspect;
mod overrides;
mod runtime;

const CONFIG_CANDIDATES: &[&str] = &["pulse.toml", "configs/pulse.toml"];

#[derive(Debug, Parser)]
#[command(author, version, about = "Pulse permission administration utility", long_about = None)]
struct Cli {
    /// Configuration file (otherwise PULSE_CONFIG, then pulse.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON where supported.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    json: bool,

    /// Also write logs to the configured daily rolling file.
    #[arg(long = "persist-logs", global = true, action = ArgAction::SetTrue)]
    persist_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "List every permission in catalog order")]
    Catalog,
    #[command(about = "List roles with their default permissions")]
    Roles,
    #[command(about = "Show every permission with the user's effective state")]
    Show(inspect::ShowCommand),
    #[command(about = "Check a single permission; exits 1 when denied")]
    Check(inspect::CheckCommand),
    #[command(about = "Force-grant a permission for a user")]
    Grant(overrides::OverrideCommand),
    #[command(about = "Force-deny a permission for a user")]
    Deny(overrides::OverrideCommand),
    #[command(about = "Return a permission to the role default for a user")]
    Clear(overrides::OverrideCommand),
    #[command(about = "Remove every override for a user")]
    Reset(overrides::ResetCommand),
    #[command(name = "verify-audit", about = "Verify the override audit trail")]
    VerifyAudit,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(CONFIG_CANDIDATES),
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&cli)?;
    let _tracing = if cli.persist_logs {
        Some(pulse_common::init_tracing("pulsectl", &config.logging)?)
    } else {
        pulse_logging::init();
        None
    };

    match cli.command {
        Commands::Catalog => inspect::list_catalog(cli.json)?,
        Commands::Roles => inspect::roles(cli.json)?,
        Commands::Show(cmd) => cmd.execute(&config, cli.json)?,
        Commands::Check(cmd) => return cmd.execute(&config),
        Commands::Grant(cmd) => cmd.execute(&config, Some(true))?,
        Commands::Deny(cmd) => cmd.execute(&config, Some(false))?,
        Commands::Clear(cmd) => cmd.execute(&config, None)?,
        Commands::Reset(cmd) => cmd.execute(&config)?,
        Commands::VerifyAudit => return overrides::verify_audit(&config),
    }
    Ok(true)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_override_and_check_commands() {
        let cli = Cli::try_parse_from([
            "pulsectl",
            "--json",
            "grant",
            "--user",
            "mgr-1",
            "--permission",
            "manage_permissions",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Grant(_)));

        let cli = Cli::try_parse_from([
            "pulsectl",
            "check",
            "--user",
            "rep-1",
            "--role",
            "power user",
            "--grant",
            "export_data",
            "--permission",
            "export_data",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Check(_)));
    }

    #[test]
    fn override_requires_permission() {
        assert!(Cli::try_parse_from(["pulsectl", "deny", "--user", "u"]).is_err());
    }
}
