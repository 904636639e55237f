//! ---
//! pulse_section: "06-security-access-control"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Hash-chained audit trail of permission override changes."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Administrative change recorded in the trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    /// A single key was forced to grant or deny.
    #[serde(rename = "permission.override.set")]
    OverrideSet,
    /// A single key was returned to its inherited state.
    #[serde(rename = "permission.override.clear")]
    OverrideCleared,
    /// Every override for a user was removed.
    #[serde(rename = "permission.override.reset")]
    OverrideReset,
}

impl AuditAction {
    fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OverrideSet => "permission.override.set",
            AuditAction::OverrideCleared => "permission.override.clear",
            AuditAction::OverrideReset => "permission.override.reset",
        }
    }
}

/// Entry recorded in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    /// Timestamp when the change was made.
    pub timestamp: DateTime<Utc>,
    /// Administrator who made the change.
    pub actor: String,
    /// Kind of change.
    pub action: AuditAction,
    /// User whose permissions changed.
    pub subject: String,
    /// Change details (permission key, new value, resulting overrides).
    pub metadata: serde_json::Value,
    /// SHA-256 over the entry contents and previous hash.
    pub hash: String,
    /// Hash of the previous entry, or zeroes for the first one.
    pub previous_hash: String,
}

impl AuditEntry {
    fn compute_hash(
        timestamp: DateTime<Utc>,
        actor: &str,
        action: AuditAction,
        subject: &str,
        metadata: &serde_json::Value,
        previous_hash: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(
            timestamp
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_be_bytes(),
        );
        hasher.update(actor.as_bytes());
        hasher.update(action.as_str().as_bytes());
        hasher.update(subject.as_bytes());
        hasher.update(metadata.to_string().as_bytes());
        hasher.update(previous_hash.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn expected_hash(&self, previous_hash: &str) -> String {
        Self::compute_hash(
            self.timestamp,
            &self.actor,
            self.action,
            &self.subject,
            &self.metadata,
            previous_hash,
        )
    }
}

/// Audit trail backed by a newline-delimited JSON file.
///
/// The head of the chain is read from the file on every append, so several
/// handles (or processes) appending in turn extend one chain.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Open the trail at `path`, failing if its last entry cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        head_hash(&path)?;
        Ok(Self { path })
    }

    /// Location of the trail.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new entry and return it.
    pub fn append(
        &self,
        actor: &str,
        action: AuditAction,
        subject: &str,
        metadata: serde_json::Value,
    ) -> Result<AuditEntry> {
        let timestamp = Utc::now();
        let previous_hash = head_hash(&self.path)?;
        let hash = AuditEntry::compute_hash(
            timestamp,
            actor,
            action,
            subject,
            &metadata,
            &previous_hash,
        );
        let entry = AuditEntry {
            timestamp,
            actor: actor.to_owned(),
            action,
            subject: subject.to_owned(),
            metadata,
            hash,
            previous_hash,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("unable to open audit log {}", self.path.display()))?;
        file.write_all(serde_json::to_string(&entry)?.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(entry)
    }

    /// All recorded entries in append order.
    pub fn entries(&self) -> Result<Vec<AuditEntry>> {
        read_entries(&self.path)
    }

    /// Check the hash chain. Returns `false` if any entry was altered or removed.
    pub fn verify(&self) -> Result<bool> {
        let mut previous = GENESIS_HASH.to_owned();
        for entry in read_entries(&self.path)? {
            if entry.previous_hash != previous || entry.expected_hash(&previous) != entry.hash {
                return Ok(false);
            }
            previous = entry.hash;
        }
        Ok(true)
    }
}

/// Hash of the last entry in the file, or the genesis hash for an empty trail.
fn head_hash(path: &Path) -> Result<String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(GENESIS_HASH.to_owned()),
        Err(err) => {
            return Err(err).with_context(|| format!("unable to read audit log {}", path.display()))
        }
    };
    match contents.lines().rev().find(|line| !line.trim().is_empty()) {
        Some(line) => {
            let entry: AuditEntry = serde_json::from_str(line)
                .with_context(|| format!("malformed audit entry in {}", path.display()))?;
            Ok(entry.hash)
        }
        None => Ok(GENESIS_HASH.to_owned()),
    }
}

fn read_entries(path: &Path) -> Result<Vec<AuditEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(path)
        .with_context(|| format!("unable to open audit log {}", path.display()))?;
    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry = serde_json::from_str(&line)
            .with_context(|| format!("malformed audit entry in {}", path.display()))?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn appended_entries_chain_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit").join("overrides.log");
        let log = AuditLog::open(&path).unwrap();
        let first = log
            .append(
                "admin-1",
                AuditAction::OverrideSet,
                "user-1",
                json!({"permission": "export_data", "value": true}),
            )
            .unwrap();
        assert_eq!(first.previous_hash, GENESIS_HASH);

        let reopened = AuditLog::open(&path).unwrap();
        let second = reopened
            .append("admin-1", AuditAction::OverrideReset, "user-1", json!({}))
            .unwrap();
        assert_eq!(second.previous_hash, first.hash);
        assert_eq!(reopened.entries().unwrap().len(), 2);
        assert!(reopened.verify().unwrap());
    }

    #[test]
    fn audit_log_detects_tampering() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::open(&path).unwrap();
        log.append(
            "alice",
            AuditAction::OverrideSet,
            "bob",
            json!({"permission": "view_systems", "value": false}),
        )
        .unwrap();
        log.append(
            "alice",
            AuditAction::OverrideCleared,
            "bob",
            json!({"permission": "view_systems"}),
        )
        .unwrap();
        assert!(log.verify().unwrap());

        let contents = fs::read_to_string(&path).unwrap();
        let mut entries: Vec<serde_json::Value> = contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        entries[0]["metadata"]["value"] = json!(true);
        let rewritten: String = entries
            .iter()
            .map(|value| format!("{value}\n"))
            .collect();
        fs::write(&path, rewritten).unwrap();
        assert!(!AuditLog::open(&path).unwrap().verify().unwrap());
    }

    #[test]
    fn dropped_entry_breaks_the_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::open(&path).unwrap();
        for subject in ["a", "b", "c"] {
            log.append("root", AuditAction::OverrideReset, subject, json!({}))
                .unwrap();
        }
        let contents = fs::read_to_string(&path).unwrap();
        let kept: Vec<_> = contents
            .lines()
            .enumerate()
            .filter(|(index, _)| *index != 1)
            .map(|(_, line)| line)
            .collect();
        fs::write(&path, kept.join("\n")).unwrap();
        assert!(!AuditLog::open(&path).unwrap().verify().unwrap());
    }

    #[test]
    fn independent_handles_extend_one_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        // Two handles opened up front, as two CLI processes would.
        let first = AuditLog::open(&path).unwrap();
        let second = AuditLog::open(&path).unwrap();
        for round in 0..3 {
            let subject = format!("user-{round}");
            first
                .append("alice", AuditAction::OverrideSet, &subject, json!({}))
                .unwrap();
            second
                .append("bob", AuditAction::OverrideReset, &subject, json!({}))
                .unwrap();
        }
        assert_eq!(first.entries().unwrap().len(), 6);
        assert!(first.verify().unwrap());
    }

    #[test]
    fn action_serializes_with_dotted_name() {
        assert_eq!(
            serde_json::to_string(&AuditAction::OverrideCleared).unwrap(),
            "\"permission.override.clear\""
        );
    }
}
