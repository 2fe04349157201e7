//! Agency registry.
//!
//! The engine reads agencies through [`AgencyDirectory`] so the registry can
//! come from configuration (see [`StaticDirectory`]) rather than being baked
//! into the allocation code.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Agency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: String,
    /// Display name used in audit details and CLI output.
    pub name: String,
    /// Higher is preferred when reallocating.
    pub trust_score: u32,
    /// Maximum number of concurrently active cases.
    pub capacity: u32,
}

impl Agency {
    pub fn new(id: impl Into<String>, name: impl Into<String>, trust_score: u32, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            trust_score,
            capacity,
        }
    }
}

// ---------------------------------------------------------------------------
// AgencyDirectory
// ---------------------------------------------------------------------------

pub trait AgencyDirectory {
    fn list(&self) -> &[Agency];

    fn get(&self, id: &str) -> Option<&Agency> {
        self.list().iter().find(|a| a.id == id)
    }

    /// Every agency except `excluded`, highest trust score first.
    ///
    /// Ties are broken by ascending id so the scan order is reproducible.
    fn candidates_excluding(&self, excluded: &str) -> Vec<&Agency> {
        let mut candidates: Vec<&Agency> =
            self.list().iter().filter(|a| a.id != excluded).collect();
        candidates.sort_by(|a, b| {
            b.trust_score
                .cmp(&a.trust_score)
                .then_with(|| a.id.cmp(&b.id))
        });
        candidates
    }
}

/// A fixed set of agencies, loaded once per invocation.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    agencies: Vec<Agency>,
}

impl StaticDirectory {
    pub fn new(agencies: Vec<Agency>) -> Self {
        Self { agencies }
    }
}

impl AgencyDirectory for StaticDirectory {
    fn list(&self) -> &[Agency] {
        &self.agencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StaticDirectory {
        StaticDirectory::new(vec![
            Agency::new("gamma", "Gamma Partners", 60, 3),
            Agency::new("alpha", "Alpha Collections", 92, 4),
            Agency::new("beta", "Beta Recovery", 78, 5),
        ])
    }

    fn ids(agencies: &[&Agency]) -> Vec<String> {
        agencies.iter().map(|a| a.id.clone()).collect()
    }

    #[test]
    fn candidates_are_sorted_by_descending_score() {
        let dir = directory();
        assert_eq!(ids(&dir.candidates_excluding("nobody")), ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn rejecting_agency_is_excluded() {
        let dir = directory();
        assert_eq!(ids(&dir.candidates_excluding("alpha")), ["beta", "gamma"]);
    }

    #[test]
    fn ties_break_on_agency_id() {
        let dir = StaticDirectory::new(vec![
            Agency::new("zeta", "Zeta", 70, 1),
            Agency::new("eta", "Eta", 70, 1),
            Agency::new("theta", "Theta", 90, 1),
        ]);
        assert_eq!(ids(&dir.candidates_excluding("")), ["theta", "eta", "zeta"]);
    }

    #[test]
    fn get_finds_by_id() {
        let dir = directory();
        assert_eq!(dir.get("beta").map(|a| a.capacity), Some(5));
        assert!(dir.get("delta").is_none());
    }
}
