use crate::agency::Agency;
use crate::error::Result;
use crate::store::CaseStore;

/// Reads an agency's active caseload straight from the store.
///
/// Nothing is cached: each call sees the current in-transaction state, which
/// is what the capacity check relies on.
pub struct LoadEvaluator<'a, S: CaseStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CaseStore + ?Sized> LoadEvaluator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn current_load(&self, agency_id: &str) -> Result<u32> {
        self.store.count_active_cases(agency_id)
    }

    /// `load < capacity`, strictly.
    pub fn has_spare_capacity(&self, agency: &Agency) -> Result<bool> {
        let load = self.current_load(&agency.id)?;
        tracing::debug!(
            agency = %agency.id,
            load,
            capacity = agency.capacity,
            "evaluated agency load"
        );
        Ok(load < agency.capacity)
    }
}
