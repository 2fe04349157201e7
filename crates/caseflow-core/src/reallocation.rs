//! Rejection and reallocation of a single case.
//!
//! One invocation runs as a single unit of work:
//!
//! ```text
//! locate case ─► requeue ─► REJECTION entry ─┬─ LOW priority ───────────► commit
//!                                            └─ scan candidates (trust ↓)
//!                                                 ├─ first with load < capacity
//!                                                 │    ─► assign ─► REALLOCATED entry ─► commit
//!                                                 └─ none ─► stays QUEUED ─► commit
//! ```
//!
//! Any error before commit drops the transaction, which rolls back every
//! write of the invocation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agency::AgencyDirectory;
use crate::audit::{append_with_fallback, AuditLog, AuditPolicy, NewAuditEntry};
use crate::db::Database;
use crate::error::{CaseflowError, Result};
use crate::load::LoadEvaluator;
use crate::store::CaseStore;
use crate::types::{AuditAction, AuditLogEntry, CaseFields, CaseStatus, Priority};

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RejectionRequest {
    pub case_id: String,
    pub reason: String,
    /// Agency handing the case back.
    pub rejected_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reallocation {
    Reassigned { agency_id: String, agency_name: String },
    /// Every eligible agency was at capacity; the case stays queued.
    NoneAvailable,
    /// LOW priority: left for a later scheduling pass.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionOutcome {
    pub case_id: String,
    pub priority: Priority,
    pub previous_status: CaseStatus,
    pub previous_agency: Option<String>,
    pub rejection: AuditLogEntry,
    /// The rejecting agency failed actor validation and the fallback actor was recorded.
    pub fallback_used: bool,
    pub reallocation: Reallocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reallocation_entry: Option<AuditLogEntry>,
}

// ---------------------------------------------------------------------------
// ReallocationEngine
// ---------------------------------------------------------------------------

pub struct ReallocationEngine<'a, D: AgencyDirectory + ?Sized> {
    directory: &'a D,
    policy: &'a AuditPolicy,
}

impl<'a, D: AgencyDirectory + ?Sized> ReallocationEngine<'a, D> {
    pub fn new(directory: &'a D, policy: &'a AuditPolicy) -> Self {
        Self { directory, policy }
    }

    /// Run one rejection against `db` inside a single IMMEDIATE transaction.
    ///
    /// Nothing is written unless the whole sequence succeeds.
    pub fn execute(&self, db: &mut Database, request: &RejectionRequest) -> Result<RejectionOutcome> {
        let tx = db.begin()?;
        let outcome = self.reject_and_reallocate(&tx, request)?;
        self.revalidate_capacity(&tx, &outcome)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// The rejection algorithm over any transactional store.
    ///
    /// The caller owns the transaction and decides whether to commit.
    pub fn reject_and_reallocate<S>(&self, store: &S, request: &RejectionRequest) -> Result<RejectionOutcome>
    where
        S: CaseStore + AuditLog + ?Sized,
    {
        let case = store
            .get_case(&request.case_id)?
            .ok_or_else(|| CaseflowError::CaseNotFound(request.case_id.clone()))?;

        store.update_case(&case.id, &CaseFields::requeued())?;
        tracing::info!(
            case_id = %case.id,
            from = %case.status,
            rejected_by = %request.rejected_by,
            "case requeued"
        );

        let rejected_at = Utc::now();
        let rejection = append_with_fallback(
            store,
            self.policy,
            NewAuditEntry {
                case_id: case.id.clone(),
                actor_id: request.rejected_by.clone(),
                action: AuditAction::Rejection,
                details: format!("Reason: {}", request.reason),
                timestamp: rejected_at,
            },
        )?;

        let (reallocation, reallocation_entry) = if case.priority == Priority::Low {
            tracing::info!(case_id = %case.id, "low priority case left in queue");
            (Reallocation::Deferred, None)
        } else {
            self.reallocate(store, &case.id, &request.rejected_by, rejected_at)?
        };

        Ok(RejectionOutcome {
            case_id: case.id,
            priority: case.priority,
            previous_status: case.status,
            previous_agency: case.assigned_to_id,
            rejection: rejection.entry,
            fallback_used: rejection.fallback_used,
            reallocation,
            reallocation_entry,
        })
    }

    /// First-fit scan over candidates in descending trust order.
    fn reallocate<S>(
        &self,
        store: &S,
        case_id: &str,
        rejected_by: &str,
        not_before: DateTime<Utc>,
    ) -> Result<(Reallocation, Option<AuditLogEntry>)>
    where
        S: CaseStore + AuditLog + ?Sized,
    {
        let loads = LoadEvaluator::new(store);

        for candidate in self.directory.candidates_excluding(rejected_by) {
            if !loads.has_spare_capacity(candidate)? {
                continue;
            }

            let assigned_at = Utc::now().max(not_before);
            store.update_case(case_id, &CaseFields::assigned(&candidate.id, assigned_at))?;
            let entry = store.append(&NewAuditEntry {
                case_id: case_id.to_string(),
                actor_id: self.policy.system_actor.clone(),
                action: AuditAction::Reallocated,
                details: format!("Reallocated to {}", candidate.name),
                timestamp: assigned_at,
            })?;
            tracing::info!(case_id, agency = %candidate.id, "case reallocated");

            return Ok((
                Reallocation::Reassigned {
                    agency_id: candidate.id.clone(),
                    agency_name: candidate.name.clone(),
                },
                Some(entry),
            ));
        }

        tracing::warn!(case_id, "no agency with spare capacity, case remains queued");
        Ok((Reallocation::NoneAvailable, None))
    }

    /// Re-count the chosen agency's load right before commit.
    pub fn revalidate_capacity<S>(&self, store: &S, outcome: &RejectionOutcome) -> Result<()>
    where
        S: CaseStore + ?Sized,
    {
        let Reallocation::Reassigned { agency_id, .. } = &outcome.reallocation else {
            return Ok(());
        };
        let Some(agency) = self.directory.get(agency_id) else {
            return Ok(());
        };
        let load = LoadEvaluator::new(store).current_load(agency_id)?;
        if load > agency.capacity {
            return Err(CaseflowError::CapacityExceeded {
                agency: agency_id.clone(),
                load,
                capacity: agency.capacity,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
