use crate::output::print_json;
use caseflow_core::verify::{verify_proof, ProofVerdict};

pub fn run(file: &str, json: bool) -> anyhow::Result<()> {
    let verdict = verify_proof(file)?;

    if json {
        print_json(&serde_json::json!({
            "file": file,
            "valid": verdict.is_valid(),
            "result": verdict,
        }))?;
    } else {
        println!("Verifying proof for: {file}");
        match verdict {
            ProofVerdict::Verified { confidence } => {
                println!("Check passed: date and amount match invoice records.");
                println!("Confidence: {confidence:.2}");
            }
            ProofVerdict::Flagged => {
                println!("Check failed: document appears fraudulent or illegible.");
            }
        }
    }

    if !verdict.is_valid() {
        anyhow::bail!("proof '{file}' failed verification");
    }
    Ok(())
}
