//! Rendering for command output: pretty JSON under `--json`, aligned text
//! tables otherwise.

use caseflow_core::agency::Agency;
use caseflow_core::types::AuditLogEntry;
use serde::Serialize;

const GUTTER: &str = "  ";

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A left-aligned text table. Columns grow to their widest cell.
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    /// Audit trail, one entry per row in the order given.
    pub fn audit_trail(entries: &[AuditLogEntry]) -> Self {
        let mut table = Self::new(&["TIME", "ACTION", "ACTOR", "DETAILS"]);
        for e in entries {
            table.push([
                e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.action.to_string(),
                e.actor_id.clone(),
                e.details.clone(),
            ]);
        }
        table
    }

    /// Agencies with their active load, shown as `load/capacity`.
    pub fn agency_loads<'a>(loads: impl IntoIterator<Item = (&'a Agency, u32)>) -> Self {
        let mut table = Self::new(&["ID", "NAME", "SCORE", "LOAD"]);
        for (agency, load) in loads {
            let marker = if load >= agency.capacity { " full" } else { "" };
            table.push([
                agency.id.clone(),
                agency.name.clone(),
                agency.trust_score.to_string(),
                format!("{load}/{}{marker}", agency.capacity),
            ]);
        }
        table
    }

    pub fn push<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = Vec::with_capacity(self.rows.len() + 2);
        out.push(render_line(self.headers.iter().copied(), &widths));
        out.push(
            widths
                .iter()
                .map(|&w| "-".repeat(w))
                .collect::<Vec<_>>()
                .join(GUTTER),
        );
        for row in &self.rows {
            out.push(render_line(row.iter().map(String::as_str), &widths));
        }
        out.join("\n")
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect();
    padded.join(GUTTER).trim_end().to_string()
}
