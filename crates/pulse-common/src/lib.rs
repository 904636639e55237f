//! ---
//! pulse_section: "01-core-functionality"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Shared primitives for Pulse services and tools."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
//! Configuration loading and tracing setup shared across the workspace.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, AuditConfig, LoadedAppConfig, LoggingConfig, OverrideStoreConfig, ProfilesConfig,
};
pub use logging::{init_tracing, LogFormat, TracingGuard};
