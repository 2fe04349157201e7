use super::open_project;
use crate::output::{print_json, Table};
use anyhow::Context;
use caseflow_core::types::{Case, CaseStatus, Priority, SlaStatus};
use chrono::Utc;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum CaseSubcommand {
    /// Insert a case, as an ingestion process would
    Add {
        id: String,
        /// LOW, MEDIUM or HIGH
        #[arg(long)]
        priority: String,
        /// Initial status (default: ASSIGNED with --assigned-to, NEW otherwise)
        #[arg(long)]
        status: Option<String>,
        /// Agency currently holding the case
        #[arg(long)]
        assigned_to: Option<String>,
    },
    /// Show a case and its audit trail
    Show { id: String },
}

pub fn run(root: &Path, subcmd: CaseSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CaseSubcommand::Add {
            id,
            priority,
            status,
            assigned_to,
        } => add(root, &id, &priority, status.as_deref(), assigned_to, json),
        CaseSubcommand::Show { id } => show(root, &id, json),
    }
}

fn add(
    root: &Path,
    id: &str,
    priority: &str,
    status: Option<&str>,
    assigned_to: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let priority: Priority = priority
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("unknown priority '{priority}'"))?;
    let status: CaseStatus = match status {
        Some(s) => s
            .to_ascii_uppercase()
            .parse()
            .with_context(|| format!("unknown status '{s}'"))?,
        None if assigned_to.is_some() => CaseStatus::Assigned,
        None => CaseStatus::New,
    };

    if status.is_active() != assigned_to.is_some() {
        anyhow::bail!(
            "status {status} {} an assigned agency",
            if status.is_active() { "requires" } else { "cannot have" }
        );
    }

    let (config, db) = open_project(root)?;
    if let Some(agency) = &assigned_to {
        if !config.agencies.iter().any(|a| &a.id == agency) {
            anyhow::bail!("agency '{agency}' is not in the registry");
        }
    }

    let now = Utc::now();
    let case = Case {
        id: id.to_string(),
        status,
        priority,
        sla_status: if status.is_active() {
            SlaStatus::Active
        } else {
            SlaStatus::Pending
        },
        assigned_at: assigned_to.as_ref().map(|_| now),
        assigned_to_id: assigned_to,
        updated_at: now,
    };
    db.insert_case(&case)
        .with_context(|| format!("failed to add case '{id}'"))?;

    if json {
        print_json(&case)?;
    } else {
        println!("Added case [{id}] ({priority}, {status})");
    }
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_config, db) = open_project(root)?;
    let case = db
        .load_case(id)?
        .with_context(|| format!("case '{id}' not found"))?;
    let trail = db.list_audit(id)?;

    if json {
        print_json(&serde_json::json!({
            "case": case,
            "audit": trail,
        }))?;
        return Ok(());
    }

    println!("Case:      {}", case.id);
    println!("Status:    {}", case.status);
    println!("Priority:  {}", case.priority);
    println!("SLA:       {}", case.sla_status);
    println!(
        "Assigned:  {}",
        case.assigned_to_id.as_deref().unwrap_or("-")
    );
    println!();

    let table = Table::audit_trail(&trail);
    if table.is_empty() {
        println!("No audit entries.");
    } else {
        table.print();
    }
    Ok(())
}
