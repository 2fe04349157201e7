use super::open_project;
use crate::output::print_json;
use anyhow::Context;
use caseflow_core::reallocation::{Reallocation, ReallocationEngine, RejectionRequest};

pub fn run(
    root: &std::path::Path,
    case_id: &str,
    reason: &str,
    rejected_by: &str,
    json: bool,
) -> anyhow::Result<()> {
    let (config, mut db) = open_project(root)?;
    let directory = config.directory();
    let engine = ReallocationEngine::new(&directory, &config.audit);

    let request = RejectionRequest {
        case_id: case_id.to_string(),
        reason: reason.to_string(),
        rejected_by: rejected_by.to_string(),
    };
    let outcome = engine
        .execute(&mut db, &request)
        .with_context(|| format!("rejection of case '{case_id}' rolled back"))?;

    if json {
        return print_json(&outcome);
    }

    println!(
        "Case {} located ({} priority, was {}).",
        outcome.case_id, outcome.priority, outcome.previous_status
    );
    if outcome.fallback_used {
        println!(
            "Rejection from {rejected_by} logged under fallback actor {}.",
            outcome.rejection.actor_id
        );
    } else {
        println!("Rejection logged by {}.", outcome.rejection.actor_id);
    }
    match &outcome.reallocation {
        Reallocation::Reassigned {
            agency_id,
            agency_name,
        } => println!("Reallocated to {agency_name} ({agency_id})."),
        Reallocation::NoneAvailable => {
            println!("No available agencies. Case remains in queue.")
        }
        Reallocation::Deferred => println!("Low priority case returned to queue."),
    }
    Ok(())
}
