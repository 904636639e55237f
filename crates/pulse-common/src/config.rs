//! ---
//! pulse_section: "01-core-functionality"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Shared configuration for Pulse services and tools."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_override_directory() -> PathBuf {
    PathBuf::from("target/state")
}

fn default_override_namespace() -> String {
    "pulse.permission_overrides".to_owned()
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("target/state/permission_audit.log")
}

/// Primary configuration object for Pulse tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub overrides: OverrideStoreConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub profiles: ProfilesConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "PULSE_CONFIG";

    /// Load configuration from disk, respecting the `PULSE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// `PULSE_CONFIG` must point at a readable file when set. Otherwise the first
    /// existing candidate wins, and defaults apply when none exists.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_file(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_file(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!("no configuration file found; using defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    /// Load and validate a specific configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.overrides.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Where permission overrides are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideStoreConfig {
    #[serde(default = "default_override_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_override_namespace")]
    pub namespace: String,
}

impl Default for OverrideStoreConfig {
    fn default() -> Self {
        Self {
            directory: default_override_directory(),
            namespace: default_override_namespace(),
        }
    }
}

impl OverrideStoreConfig {
    /// The namespace names a single file, so it is limited to `[A-Za-z0-9._-]`
    /// and may not be `.` or `..`.
    pub fn validate(&self) -> Result<()> {
        let namespace = self.namespace.as_str();
        if namespace.is_empty() {
            return Err(anyhow!("overrides.namespace must not be empty"));
        }
        let single_segment = namespace != "."
            && namespace != ".."
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !single_segment {
            return Err(anyhow!(
                "overrides.namespace '{namespace}' may only contain letters, digits, '.', '_' and '-'"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: default_audit_path(),
        }
    }
}

impl AuditConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.path.as_os_str().is_empty() {
            return Err(anyhow!("audit.path must be set when audit is enabled"));
        }
        Ok(())
    }
}

/// Optional source of user profile records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.overrides.namespace, "pulse.permission_overrides");
        assert!(config.audit.enabled);
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        assert!(config.profiles.path.is_none());
    }

    #[test]
    fn sections_are_parsed() {
        let config: AppConfig = r#"
            [logging]
            directory = "/var/log/pulse"
            format = "pretty"

            [overrides]
            directory = "/var/lib/pulse"
            namespace = "tenant-42"

            [audit]
            enabled = false

            [profiles]
            path = "profiles.json"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.overrides.directory, PathBuf::from("/var/lib/pulse"));
        assert_eq!(config.overrides.namespace, "tenant-42");
        assert!(!config.audit.enabled);
        assert_eq!(config.profiles.path, Some(PathBuf::from("profiles.json")));
    }

    #[test]
    fn namespace_must_be_a_plain_file_name() {
        for bad in ["", "a/b", "a\\b", "with space", "..", "tenant:1"] {
            let document = format!("[overrides]\nnamespace = {bad:?}\n");
            assert!(
                document.parse::<AppConfig>().is_err(),
                "namespace {bad:?} should be rejected"
            );
        }
        let ok = "[overrides]\nnamespace = \"pulse.permission_overrides-v2\"\n";
        assert!(ok.parse::<AppConfig>().is_ok());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!("[overrides".parse::<AppConfig>().is_err());
    }

    #[test]
    fn missing_candidates_fall_back_to_defaults() {
        if std::env::var(AppConfig::ENV_CONFIG_PATH).is_ok() {
            return;
        }
        let loaded = AppConfig::load_with_source(&["does/not/exist.toml"]).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.overrides.namespace, "pulse.permission_overrides");
    }
}
