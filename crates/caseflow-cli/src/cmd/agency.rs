use super::open_project;
use crate::output::{print_json, Table};
use caseflow_core::agency::AgencyDirectory;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum AgencySubcommand {
    /// List agencies in reallocation order with their current load
    List,
}

pub fn run(root: &Path, subcmd: AgencySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        AgencySubcommand::List => list(root, json),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (config, db) = open_project(root)?;
    let directory = config.directory();
    let loads = db.active_loads(&directory)?;

    if json {
        let items: Vec<_> = loads
            .iter()
            .filter_map(|(id, load)| directory.get(id).map(|a| (a, load)))
            .map(|(a, load)| {
                serde_json::json!({
                    "id": a.id,
                    "name": a.name,
                    "trust_score": a.trust_score,
                    "capacity": a.capacity,
                    "load": load,
                })
            })
            .collect();
        return print_json(&items);
    }

    if loads.is_empty() {
        println!("No agencies configured.");
        return Ok(());
    }

    Table::agency_loads(
        loads
            .iter()
            .filter_map(|(id, load)| directory.get(id).map(|a| (a, *load))),
    )
    .print();
    Ok(())
}
