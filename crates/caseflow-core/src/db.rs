//! SQLite persistence for cases, actors and the audit trail.
//!
//! # Tables
//!
//! - **`User`**: every identity that may appear as an audit actor or case
//!   assignee (agencies plus the system sentinels).
//! - **`Case`**: one row per case. `assignedToId` references `User`.
//! - **`AuditLog`**: append-only. `caseId` references `Case` and `actorId`
//!   references `User`; the latter is what turns an unknown actor into
//!   [`CaseflowError::ReferentialIntegrity`].
//!
//! # Locking
//!
//! [`Database::begin`] opens the transaction with `BEGIN IMMEDIATE`, so the
//! write lock is held from the first load count until commit. A second
//! invocation blocks on `begin` for at most the configured busy timeout and
//! then fails with [`CaseflowError::LockTimeout`].

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::agency::AgencyDirectory;
use crate::audit::{AuditLog, AuditPolicy, NewAuditEntry};
use crate::error::{CaseflowError, Result};
use crate::store::CaseStore;
use crate::types::{AuditLogEntry, Case, CaseFields};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "User" (
    id   TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS "Case" (
    id               TEXT PRIMARY KEY NOT NULL,
    status           TEXT NOT NULL,
    priority         TEXT NOT NULL,
    currentSLAStatus TEXT NOT NULL,
    assignedToId     TEXT REFERENCES "User"(id),
    assignedAt       TEXT,
    updatedAt        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS "Case_assignedToId_status_idx" ON "Case"(assignedToId, status);

CREATE TABLE IF NOT EXISTS "AuditLog" (
    id        TEXT PRIMARY KEY NOT NULL,
    caseId    TEXT NOT NULL REFERENCES "Case"(id),
    actorId   TEXT NOT NULL REFERENCES "User"(id),
    action    TEXT NOT NULL,
    details   TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS "AuditLog_caseId_idx" ON "AuditLog"(caseId);
"#;

const CASE_COLUMNS: &str =
    "id, status, priority, currentSLAStatus, assignedToId, assignedAt, updatedAt";

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::io::ensure_dir(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start the unit of work for one invocation.
    pub fn begin(&mut self) -> Result<CaseTx<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(CaseTx { tx })
    }

    pub fn upsert_actor(&self, id: &str, name: &str, role: &str) -> Result<()> {
        self.conn.execute(
            r#"INSERT INTO "User" (id, name, role) VALUES (?1, ?2, ?3)
               ON CONFLICT(id) DO UPDATE SET name = excluded.name, role = excluded.role"#,
            params![id, name, role],
        )?;
        Ok(())
    }

    /// Upsert a `User` row for every identity that can hold a case or sign an
    /// audit entry: the system actor, the fallback actor and each agency.
    ///
    /// Agencies added to the registry after the database was created are not
    /// assignable until this has run.
    pub fn sync_actors<D: AgencyDirectory + ?Sized>(&self, policy: &AuditPolicy, directory: &D) -> Result<()> {
        self.upsert_actor(&policy.system_actor, "System", "SYSTEM")?;
        if directory.get(&policy.fallback_actor).is_none() {
            self.upsert_actor(&policy.fallback_actor, "System Fallback", "SYSTEM")?;
        }
        for agency in directory.list() {
            self.upsert_actor(&agency.id, &agency.name, "AGENCY")?;
        }
        Ok(())
    }

    pub fn insert_case(&self, case: &Case) -> Result<()> {
        if self.load_case(&case.id)?.is_some() {
            return Err(CaseflowError::CaseExists(case.id.clone()));
        }
        self.conn.execute(
            r#"INSERT INTO "Case"
                 (id, status, priority, currentSLAStatus, assignedToId, assignedAt, updatedAt)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                case.id,
                case.status.as_str(),
                case.priority.as_str(),
                case.sla_status.as_str(),
                case.assigned_to_id,
                case.assigned_at.map(format_ts),
                format_ts(case.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn load_case(&self, id: &str) -> Result<Option<Case>> {
        select_case(&self.conn, id)
    }

    /// Audit entries for `case_id`, oldest first.
    pub fn list_audit(&self, case_id: &str) -> Result<Vec<AuditLogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT id, caseId, actorId, action, details, timestamp
               FROM "AuditLog" WHERE caseId = ?1
               ORDER BY timestamp, rowid"#,
        )?;
        let rows = stmt
            .query_map(params![case_id], |row| {
                Ok(RawAuditRow {
                    id: row.get(0)?,
                    case_id: row.get(1)?,
                    actor_id: row.get(2)?,
                    action: row.get(3)?,
                    details: row.get(4)?,
                    timestamp: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawAuditRow::into_entry).collect()
    }

    pub fn active_load(&self, agency_id: &str) -> Result<u32> {
        count_active(&self.conn, agency_id)
    }

    /// `(agency_id, load)` for every agency in candidate order.
    pub fn active_loads<D: AgencyDirectory + ?Sized>(&self, directory: &D) -> Result<Vec<(String, u32)>> {
        directory
            .candidates_excluding("")
            .into_iter()
            .map(|a| Ok((a.id.clone(), self.active_load(&a.id)?)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// CaseTx
// ---------------------------------------------------------------------------

/// An open IMMEDIATE transaction. Dropping it without [`CaseTx::commit`]
/// rolls back every write made through it.
pub struct CaseTx<'conn> {
    tx: Transaction<'conn>,
}

impl CaseTx<'_> {
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

impl CaseStore for CaseTx<'_> {
    fn get_case(&self, id: &str) -> Result<Option<Case>> {
        select_case(&self.tx, id)
    }

    fn update_case(&self, id: &str, fields: &CaseFields) -> Result<()> {
        let changed = self.tx.execute(
            r#"UPDATE "Case"
               SET status = ?1, currentSLAStatus = ?2, assignedToId = ?3,
                   assignedAt = ?4, updatedAt = ?5
               WHERE id = ?6"#,
            params![
                fields.status.as_str(),
                fields.sla_status.as_str(),
                fields.assigned_to_id,
                fields.assigned_at.map(format_ts),
                format_ts(Utc::now()),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(CaseflowError::CaseNotFound(id.to_string()));
        }
        Ok(())
    }

    fn count_active_cases(&self, agency_id: &str) -> Result<u32> {
        count_active(&self.tx, agency_id)
    }
}

impl AuditLog for CaseTx<'_> {
    fn append(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry> {
        let id = Uuid::new_v4().to_string();
        let inserted = self.tx.execute(
            r#"INSERT INTO "AuditLog" (id, caseId, actorId, action, details, timestamp)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                id,
                entry.case_id,
                entry.actor_id,
                entry.action.as_str(),
                entry.details,
                format_ts(entry.timestamp),
            ],
        );
        match inserted {
            Ok(_) => Ok(AuditLogEntry {
                id,
                case_id: entry.case_id.clone(),
                actor_id: entry.actor_id.clone(),
                action: entry.action,
                details: entry.details.clone(),
                timestamp: entry.timestamp,
            }),
            // The same constraint also guards caseId, so only blame the actor
            // when the actor row is actually missing.
            Err(e) if is_foreign_key_violation(&e) && !actor_exists(&self.tx, &entry.actor_id)? => {
                Err(CaseflowError::ReferentialIntegrity {
                    actor: entry.actor_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Query helpers (work on a bare connection or a transaction)
// ---------------------------------------------------------------------------

fn select_case(conn: &Connection, id: &str) -> Result<Option<Case>> {
    let raw = conn
        .query_row(
            &format!(r#"SELECT {CASE_COLUMNS} FROM "Case" WHERE id = ?1"#),
            params![id],
            |row| {
                Ok(RawCaseRow {
                    id: row.get(0)?,
                    status: row.get(1)?,
                    priority: row.get(2)?,
                    sla_status: row.get(3)?,
                    assigned_to_id: row.get(4)?,
                    assigned_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        )
        .optional()?;
    raw.map(RawCaseRow::into_case).transpose()
}

fn count_active(conn: &Connection, agency_id: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        r#"SELECT COUNT(*) FROM "Case"
           WHERE assignedToId = ?1 AND status IN ('ASSIGNED', 'WIP', 'PTP')"#,
        params![agency_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn actor_exists(conn: &Connection, actor_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        r#"SELECT EXISTS(SELECT 1 FROM "User" WHERE id = ?1)"#,
        params![actor_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| CaseflowError::InvalidTimestamp(s.to_string()))
}

// Rows are read as plain strings first so enum and timestamp parse failures
// surface as CaseflowError rather than rusqlite conversion errors.

struct RawCaseRow {
    id: String,
    status: String,
    priority: String,
    sla_status: String,
    assigned_to_id: Option<String>,
    assigned_at: Option<String>,
    updated_at: String,
}

impl RawCaseRow {
    fn into_case(self) -> Result<Case> {
        Ok(Case {
            id: self.id,
            status: self.status.parse()?,
            priority: self.priority.parse()?,
            sla_status: self.sla_status.parse()?,
            assigned_to_id: self.assigned_to_id,
            assigned_at: self.assigned_at.as_deref().map(parse_ts).transpose()?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

struct RawAuditRow {
    id: String,
    case_id: String,
    actor_id: String,
    action: String,
    details: String,
    timestamp: String,
}

impl RawAuditRow {
    fn into_entry(self) -> Result<AuditLogEntry> {
        Ok(AuditLogEntry {
            id: self.id,
            case_id: self.case_id,
            actor_id: self.actor_id,
            action: self.action.parse()?,
            details: self.details,
            timestamp: parse_ts(&self.timestamp)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuditAction, CaseStatus, Priority, SlaStatus};
    use tempfile::TempDir;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_actor("SYSTEM", "System", "SYSTEM").unwrap();
        db.upsert_actor("agency-a", "Agency A", "AGENCY").unwrap();
        db.upsert_actor("agency-b", "Agency B", "AGENCY").unwrap();
        db
    }

    fn held_by(id: &str, agency: &str, status: CaseStatus) -> Case {
        let mut case = Case::new(id, Priority::High);
        case.status = status;
        case.sla_status = SlaStatus::Active;
        case.assigned_to_id = Some(agency.to_string());
        case.assigned_at = Some(Utc::now());
        case
    }

    fn entry(case_id: &str, actor: &str) -> NewAuditEntry {
        NewAuditEntry {
            case_id: case_id.into(),
            actor_id: actor.into(),
            action: AuditAction::Rejection,
            details: "Reason: test".into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn insert_and_load_case() {
        let db = seeded();
        let case = held_by("c1", "agency-a", CaseStatus::Wip);
        db.insert_case(&case).unwrap();

        let loaded = db.load_case("c1").unwrap().unwrap();
        assert_eq!(loaded.status, CaseStatus::Wip);
        assert_eq!(loaded.assigned_to_id.as_deref(), Some("agency-a"));
        assert!(loaded.is_consistent());
        assert!(db.load_case("missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_case_is_rejected() {
        let db = seeded();
        db.insert_case(&Case::new("c1", Priority::Low)).unwrap();
        let err = db.insert_case(&Case::new("c1", Priority::Low)).unwrap_err();
        assert!(matches!(err, CaseflowError::CaseExists(id) if id == "c1"));
    }

    #[test]
    fn active_count_only_includes_active_statuses() {
        let db = seeded();
        db.insert_case(&held_by("c1", "agency-a", CaseStatus::Assigned)).unwrap();
        db.insert_case(&held_by("c2", "agency-a", CaseStatus::Wip)).unwrap();
        db.insert_case(&held_by("c3", "agency-a", CaseStatus::Ptp)).unwrap();
        db.insert_case(&held_by("c4", "agency-a", CaseStatus::Paid)).unwrap();
        db.insert_case(&held_by("c5", "agency-b", CaseStatus::Assigned)).unwrap();

        assert_eq!(db.active_load("agency-a").unwrap(), 3);
        assert_eq!(db.active_load("agency-b").unwrap(), 1);
        assert_eq!(db.active_load("nobody").unwrap(), 0);
    }

    #[test]
    fn count_sees_uncommitted_writes_in_same_tx() {
        let mut db = seeded();
        db.insert_case(&Case::new("c1", Priority::High)).unwrap();
        let tx = db.begin().unwrap();
        tx.update_case("c1", &CaseFields::assigned("agency-b", Utc::now()))
            .unwrap();
        assert_eq!(tx.count_active_cases("agency-b").unwrap(), 1);
    }

    #[test]
    fn dropped_tx_rolls_back() {
        let mut db = seeded();
        db.insert_case(&held_by("c1", "agency-a", CaseStatus::Assigned)).unwrap();
        {
            let tx = db.begin().unwrap();
            tx.update_case("c1", &CaseFields::requeued()).unwrap();
            tx.append(&entry("c1", "agency-a")).unwrap();
        }
        let case = db.load_case("c1").unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::Assigned);
        assert!(db.list_audit("c1").unwrap().is_empty());
    }

    #[test]
    fn committed_tx_persists() {
        let mut db = seeded();
        db.insert_case(&held_by("c1", "agency-a", CaseStatus::Assigned)).unwrap();
        let tx = db.begin().unwrap();
        tx.update_case("c1", &CaseFields::requeued()).unwrap();
        tx.append(&entry("c1", "agency-a")).unwrap();
        tx.commit().unwrap();

        let case = db.load_case("c1").unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::Queued);
        assert!(case.assigned_to_id.is_none());
        let trail = db.list_audit("c1").unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::Rejection);
    }

    #[test]
    fn update_of_missing_case_is_not_found() {
        let mut db = seeded();
        let tx = db.begin().unwrap();
        let err = tx.update_case("ghost", &CaseFields::requeued()).unwrap_err();
        assert!(matches!(err, CaseflowError::CaseNotFound(_)));
    }

    #[test]
    fn unknown_actor_is_referential_error_and_tx_survives() {
        let mut db = seeded();
        db.insert_case(&Case::new("c1", Priority::High)).unwrap();
        let tx = db.begin().unwrap();
        let err = tx.append(&entry("c1", "ghost-agency")).unwrap_err();
        assert!(
            matches!(&err, CaseflowError::ReferentialIntegrity { actor } if actor == "ghost-agency"),
            "got {err:?}"
        );
        // The failed statement must not poison the transaction.
        tx.append(&entry("c1", "SYSTEM")).unwrap();
        tx.commit().unwrap();
        assert_eq!(db.list_audit("c1").unwrap().len(), 1);
    }

    #[test]
    fn unknown_case_is_not_blamed_on_actor() {
        let mut db = seeded();
        let tx = db.begin().unwrap();
        let err = tx.append(&entry("no-such-case", "SYSTEM")).unwrap_err();
        assert!(matches!(err, CaseflowError::Database(_)), "got {err:?}");
    }

    #[test]
    fn audit_trail_is_ordered_by_timestamp() {
        let mut db = seeded();
        db.insert_case(&Case::new("c1", Priority::High)).unwrap();
        let now = Utc::now();
        let tx = db.begin().unwrap();
        let mut later = entry("c1", "SYSTEM");
        later.timestamp = now + chrono::Duration::seconds(5);
        later.action = AuditAction::Reallocated;
        tx.append(&later).unwrap();
        let mut earlier = entry("c1", "agency-a");
        earlier.timestamp = now;
        tx.append(&earlier).unwrap();
        tx.commit().unwrap();

        let trail = db.list_audit("c1").unwrap();
        assert_eq!(trail[0].action, AuditAction::Rejection);
        assert_eq!(trail[1].action, AuditAction::Reallocated);
    }

    #[test]
    fn second_writer_times_out_on_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cases.db");
        let mut first = Database::open(&path, Duration::from_millis(50)).unwrap();
        let mut second = Database::open(&path, Duration::from_millis(50)).unwrap();

        let _held = first.begin().unwrap();
        let err = second.begin().err().expect("second begin must fail");
        assert!(matches!(err, CaseflowError::LockTimeout(_)), "got {err:?}");
    }

    #[test]
    fn sync_actors_registers_new_agencies() {
        use crate::agency::{Agency, StaticDirectory};

        let db = Database::open_in_memory().unwrap();
        let policy = AuditPolicy::default();
        let dir = StaticDirectory::new(vec![Agency::new("agency-a", "Agency A", 90, 2)]);
        db.sync_actors(&policy, &dir).unwrap();
        assert!(actor_exists(&db.conn, "SYSTEM").unwrap());
        assert!(actor_exists(&db.conn, "user-agency-alpha").unwrap());
        assert!(!actor_exists(&db.conn, "agency-d").unwrap());

        let grown = StaticDirectory::new(vec![
            Agency::new("agency-a", "Agency A", 90, 2),
            Agency::new("agency-d", "Agency D", 99, 2),
        ]);
        db.sync_actors(&policy, &grown).unwrap();
        db.sync_actors(&policy, &grown).unwrap();
        assert!(actor_exists(&db.conn, "agency-d").unwrap());
        db.insert_case(&held_by("c1", "agency-d", CaseStatus::Assigned)).unwrap();
    }

    #[test]
    fn reopening_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/cases.db");
        {
            let db = Database::open(&path, Duration::from_secs(1)).unwrap();
            db.upsert_actor("agency-a", "Agency A", "AGENCY").unwrap();
            db.insert_case(&Case::new("c1", Priority::Medium)).unwrap();
        }
        let db = Database::open(&path, Duration::from_secs(1)).unwrap();
        assert_eq!(db.load_case("c1").unwrap().unwrap().priority, Priority::Medium);
    }
}
