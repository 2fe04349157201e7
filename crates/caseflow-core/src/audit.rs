//! Append-only audit trail.
//!
//! [`AuditLog`] is the storage seam. [`append_with_fallback`] layers the
//! actor-substitution rule on top: when the acting agency is not a known
//! actor, the entry is re-recorded under the configured fallback actor and its
//! details are annotated, instead of failing the surrounding operation.

use crate::error::{CaseflowError, Result};
use crate::types::{AuditAction, AuditLogEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Suffix appended to `details` when the fallback actor was substituted.
pub const FALLBACK_NOTE: &str = " (Logged by System)";

// ---------------------------------------------------------------------------
// AuditLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub case_id: String,
    pub actor_id: String,
    pub action: AuditAction,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

pub trait AuditLog {
    /// Append one entry.
    ///
    /// Fails with [`CaseflowError::ReferentialIntegrity`] when `actor_id` is
    /// not a known actor.
    fn append(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry>;
}

// ---------------------------------------------------------------------------
// AuditPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPolicy {
    /// Actor recorded for entries the engine writes on its own behalf.
    #[serde(default = "default_system_actor")]
    pub system_actor: String,
    /// Actor substituted when the acting agency fails actor validation.
    #[serde(default = "default_fallback_actor")]
    pub fallback_actor: String,
}

fn default_system_actor() -> String {
    "SYSTEM".to_string()
}

fn default_fallback_actor() -> String {
    "user-agency-alpha".to_string()
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            system_actor: default_system_actor(),
            fallback_actor: default_fallback_actor(),
        }
    }
}

/// Result of an append that may have gone through the fallback actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appended {
    pub entry: AuditLogEntry,
    pub fallback_used: bool,
}

/// Append `entry`, retrying once under `policy.fallback_actor` on a
/// referential-integrity failure. Any other error, including a failure of the
/// retry itself, is returned unchanged.
pub fn append_with_fallback<A: AuditLog + ?Sized>(
    log: &A,
    policy: &AuditPolicy,
    entry: NewAuditEntry,
) -> Result<Appended> {
    match log.append(&entry) {
        Ok(entry) => Ok(Appended {
            entry,
            fallback_used: false,
        }),
        Err(CaseflowError::ReferentialIntegrity { actor }) => {
            tracing::warn!(
                case_id = %entry.case_id,
                actor = %actor,
                fallback = %policy.fallback_actor,
                "audit actor unknown, recording under fallback actor"
            );
            let retry = NewAuditEntry {
                actor_id: policy.fallback_actor.clone(),
                details: format!("{}{FALLBACK_NOTE}", entry.details),
                ..entry
            };
            let entry = log.append(&retry)?;
            Ok(Appended {
                entry,
                fallback_used: true,
            })
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
