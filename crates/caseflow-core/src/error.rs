use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaseflowError {
    #[error("not initialized: run 'caseflow init'")]
    NotInitialized,

    #[error("case not found: {0}")]
    CaseNotFound(String),

    #[error("case already exists: {0}")]
    CaseExists(String),

    /// The audit actor does not reference a known actor row.
    #[error("unknown audit actor '{actor}'")]
    ReferentialIntegrity { actor: String },

    #[error("agency '{agency}' would hold {load} active cases, capacity is {capacity}")]
    CapacityExceeded {
        agency: String,
        load: u32,
        capacity: u32,
    },

    #[error("timed out waiting for the database lock: {0}")]
    LockTimeout(String),

    #[error("invalid case status: {0}")]
    InvalidStatus(String),

    #[error("invalid priority: {0}")]
    InvalidPriority(String),

    #[error("invalid SLA status: {0}")]
    InvalidSlaStatus(String),

    #[error("invalid audit action: {0}")]
    InvalidAuditAction(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("unsupported proof type '{0}': verification requires a PDF")]
    UnsupportedProofType(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl From<rusqlite::Error> for CaseflowError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                CaseflowError::LockTimeout(e.to_string())
            }
            _ => CaseflowError::Database(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaseflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn busy_maps_to_lock_timeout() {
        let err: CaseflowError = failure(rusqlite::ffi::SQLITE_BUSY).into();
        assert!(matches!(err, CaseflowError::LockTimeout(_)), "got {err:?}");
    }

    #[test]
    fn other_failures_stay_database_errors() {
        let err: CaseflowError = failure(rusqlite::ffi::SQLITE_CONSTRAINT).into();
        assert!(matches!(err, CaseflowError::Database(_)), "got {err:?}");
    }
}
