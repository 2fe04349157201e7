use crate::error::Result;
use crate::types::{Case, CaseFields};

/// Transactional access to case records.
///
/// Implementations operate inside an open transaction: writes become visible
/// to later reads through the same store immediately, and to everyone else
/// only once the transaction commits.
pub trait CaseStore {
    fn get_case(&self, id: &str) -> Result<Option<Case>>;

    fn update_case(&self, id: &str, fields: &CaseFields) -> Result<()>;

    /// Cases in ASSIGNED, WIP or PTP currently held by `agency_id`.
    fn count_active_cases(&self, agency_id: &str) -> Result<u32>;
}
