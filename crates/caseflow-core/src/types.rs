use crate::error::CaseflowError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CaseStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    New,
    Queued,
    Assigned,
    Wip,
    Ptp,
    Dispute,
    Paid,
    Escalated,
    Closed,
}

impl CaseStatus {
    /// Statuses that count against an agency's capacity.
    pub const ACTIVE: [CaseStatus; 3] = [CaseStatus::Assigned, CaseStatus::Wip, CaseStatus::Ptp];

    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::New => "NEW",
            CaseStatus::Queued => "QUEUED",
            CaseStatus::Assigned => "ASSIGNED",
            CaseStatus::Wip => "WIP",
            CaseStatus::Ptp => "PTP",
            CaseStatus::Dispute => "DISPUTE",
            CaseStatus::Paid => "PAID",
            CaseStatus::Escalated => "ESCALATED",
            CaseStatus::Closed => "CLOSED",
        }
    }

    /// True when a case in this status must carry an assignee.
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(CaseStatus::New),
            "QUEUED" => Ok(CaseStatus::Queued),
            "ASSIGNED" => Ok(CaseStatus::Assigned),
            "WIP" => Ok(CaseStatus::Wip),
            "PTP" => Ok(CaseStatus::Ptp),
            "DISPUTE" => Ok(CaseStatus::Dispute),
            "PAID" => Ok(CaseStatus::Paid),
            "ESCALATED" => Ok(CaseStatus::Escalated),
            "CLOSED" => Ok(CaseStatus::Closed),
            _ => Err(CaseflowError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            _ => Err(CaseflowError::InvalidPriority(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// SlaStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlaStatus {
    Pending,
    Active,
    Paused,
    Breached,
    Completed,
}

impl SlaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SlaStatus::Pending => "PENDING",
            SlaStatus::Active => "ACTIVE",
            SlaStatus::Paused => "PAUSED",
            SlaStatus::Breached => "BREACHED",
            SlaStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SlaStatus {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SlaStatus::Pending),
            "ACTIVE" => Ok(SlaStatus::Active),
            "PAUSED" => Ok(SlaStatus::Paused),
            "BREACHED" => Ok(SlaStatus::Breached),
            "COMPLETED" => Ok(SlaStatus::Completed),
            _ => Err(CaseflowError::InvalidSlaStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Rejection,
    Reallocated,
    StatusChange,
    Ptp,
    Proof,
    SlaBreachEscalation,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Rejection => "REJECTION",
            AuditAction::Reallocated => "REALLOCATED",
            AuditAction::StatusChange => "STATUS_CHANGE",
            AuditAction::Ptp => "PTP",
            AuditAction::Proof => "PROOF",
            AuditAction::SlaBreachEscalation => "SLA_BREACH_ESCALATION",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REJECTION" => Ok(AuditAction::Rejection),
            "REALLOCATED" => Ok(AuditAction::Reallocated),
            "STATUS_CHANGE" => Ok(AuditAction::StatusChange),
            "PTP" => Ok(AuditAction::Ptp),
            "PROOF" => Ok(AuditAction::Proof),
            "SLA_BREACH_ESCALATION" => Ok(AuditAction::SlaBreachEscalation),
            _ => Err(CaseflowError::InvalidAuditAction(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Case
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub status: CaseStatus,
    pub priority: Priority,
    pub sla_status: SlaStatus,
    pub assigned_to_id: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// A fresh, unassigned case as an ingestion process would create it.
    pub fn new(id: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: id.into(),
            status: CaseStatus::New,
            priority,
            sla_status: SlaStatus::Pending,
            assigned_to_id: None,
            assigned_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Assignee is present iff the status is active, and `assigned_at` follows the assignee.
    pub fn is_consistent(&self) -> bool {
        self.status.is_active() == self.assigned_to_id.is_some()
            && self.assigned_to_id.is_some() == self.assigned_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// CaseFields
// ---------------------------------------------------------------------------

/// The subset of case columns the engine is allowed to write.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseFields {
    pub status: CaseStatus,
    pub sla_status: SlaStatus,
    pub assigned_to_id: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl CaseFields {
    pub fn requeued() -> Self {
        Self {
            status: CaseStatus::Queued,
            sla_status: SlaStatus::Pending,
            assigned_to_id: None,
            assigned_at: None,
        }
    }

    pub fn assigned(agency_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: CaseStatus::Assigned,
            sla_status: SlaStatus::Active,
            assigned_to_id: Some(agency_id.into()),
            assigned_at: Some(at),
        }
    }
}

// ---------------------------------------------------------------------------
// AuditLogEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub case_id: String,
    pub actor_id: String,
    pub action: AuditAction,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
