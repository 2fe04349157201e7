use std::path::{Path, PathBuf};

pub const CASEFLOW_DIR: &str = ".caseflow";
pub const CONFIG_FILE: &str = ".caseflow/config.yaml";

pub fn caseflow_dir(root: &Path) -> PathBuf {
    root.join(CASEFLOW_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured database path. Relative paths live under `.caseflow/`.
pub fn database_path(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        caseflow_dir(root).join(configured)
    }
}
