use crate::output::print_json;
use anyhow::Context;
use caseflow_core::{config::Config, db::Database, io, paths};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    if !json {
        println!("Initializing caseflow in: {}", root.display());
    }

    let dir = paths::caseflow_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_path = paths::config_path(root);
    let created_config = !config_path.exists();
    if created_config {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
    }
    let config = Config::load(root).context("failed to load config")?;

    let db_path = config.database_path(root);
    let db = Database::open(&db_path, config.database.busy_timeout())
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    db.sync_actors(&config.audit, &config.directory())
        .context("failed to register actors")?;

    if json {
        print_json(&serde_json::json!({
            "root": root,
            "config_created": created_config,
            "database": db_path,
            "agencies": config.agencies.len(),
        }))?;
    } else {
        let verb = if created_config { "created" } else { "exists: " };
        println!("  {verb} {}", paths::CONFIG_FILE);
        println!("  database: {}", db_path.display());
        println!("  actors:   {} agencies + system", config.agencies.len());
    }
    Ok(())
}
