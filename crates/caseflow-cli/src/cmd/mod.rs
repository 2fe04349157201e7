pub mod agency;
pub mod case;
pub mod config;
pub mod init;
pub mod reject;
pub mod verify;

use anyhow::Context;
use caseflow_core::{config::Config, db::Database};
use std::path::Path;

/// Load the config, open the database it points at and bring the actor rows
/// in line with the configured agencies.
pub fn open_project(root: &Path) -> anyhow::Result<(Config, Database)> {
    let config = Config::load(root).context("failed to load config")?;
    let path = config.database_path(root);
    let db = Database::open(&path, config.database.busy_timeout())
        .with_context(|| format!("failed to open database {}", path.display()))?;
    db.sync_actors(&config.audit, &config.directory())
        .context("failed to register actors")?;
    Ok((config, db))
}
