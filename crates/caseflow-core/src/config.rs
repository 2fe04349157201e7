use crate::agency::{Agency, StaticDirectory};
use crate::audit::AuditPolicy;
use crate::error::{CaseflowError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Relative paths resolve under `.caseflow/`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// How long to wait for the write lock before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("caseflow.db")
}

fn default_busy_timeout_ms() -> u64 {
    10_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub audit: AuditPolicy,
    #[serde(default = "default_agencies")]
    pub agencies: Vec<Agency>,
}

fn default_version() -> u32 {
    1
}

fn default_agencies() -> Vec<Agency> {
    vec![
        Agency::new("user-agency-alpha", "Alpha Collections", 92, 4),
        Agency::new("user-agency-beta", "Beta Recovery", 78, 5),
        Agency::new("user-agency-gamma", "Gamma Partners", 60, 3),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: DatabaseConfig::default(),
            audit: AuditPolicy::default(),
            agencies: default_agencies(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CaseflowError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn directory(&self) -> StaticDirectory {
        StaticDirectory::new(self.agencies.clone())
    }

    pub fn database_path(&self, root: &Path) -> PathBuf {
        paths::database_path(root, &self.database.path)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.agencies.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no agencies configured; rejected cases can never be reallocated"
                    .to_string(),
            });
        }

        let mut seen = HashSet::new();
        for agency in &self.agencies {
            if !seen.insert(agency.id.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate agency id '{}'", agency.id),
                });
            }
            if agency.capacity == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "agency '{}' has capacity 0 and will never receive cases",
                        agency.id
                    ),
                });
            }
        }

        for (field, value) in [
            ("audit.system_actor", &self.audit.system_actor),
            ("audit.fallback_actor", &self.audit.fallback_actor),
        ] {
            if value.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{field} must not be empty"),
                });
            }
        }

        // Rejections logged through the fallback would then be attributed to
        // a real agency instead of a system identity.
        if self.agencies.iter().any(|a| a.id == self.audit.fallback_actor) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "audit.fallback_actor '{}' is a registered agency; \
                     fallback rejections will be attributed to that agency",
                    self.audit.fallback_actor
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        Config::default().save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.agencies.len(), 3);
        assert_eq!(loaded.database.busy_timeout(), Duration::from_secs(10));
        assert_eq!(loaded.audit.system_actor, "SYSTEM");
    }

    #[test]
    fn missing_config_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, CaseflowError::NotInitialized));
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "agencies:\n  - id: solo\n    name: Solo Agency\n    trust_score: 50\n    capacity: 2\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.agencies.len(), 1);
        assert_eq!(cfg.database.path, PathBuf::from("caseflow.db"));
        assert_eq!(cfg.audit.fallback_actor, "user-agency-alpha");
    }

    #[test]
    fn default_config_flags_agency_fallback_actor() {
        let warnings = Config::default().validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(warnings[0].message.contains("user-agency-alpha"));
    }

    #[test]
    fn sentinel_fallback_actor_is_clean() {
        let mut cfg = Config::default();
        cfg.audit.fallback_actor = "SYSTEM".to_string();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn duplicate_agency_is_error() {
        let mut cfg = Config::default();
        cfg.audit.fallback_actor = "SYSTEM".to_string();
        cfg.agencies.push(Agency::new("user-agency-beta", "Beta Again", 10, 1));
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("duplicate")));
    }

    #[test]
    fn zero_capacity_and_empty_actor_are_reported() {
        let mut cfg = Config::default();
        cfg.audit.fallback_actor = "SYSTEM".to_string();
        cfg.audit.system_actor = " ".to_string();
        cfg.agencies[2].capacity = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("capacity 0")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("audit.system_actor")));
    }

    #[test]
    fn relative_database_path_resolves_under_root() {
        let cfg = Config::default();
        let p = cfg.database_path(Path::new("/work"));
        assert_eq!(p, PathBuf::from("/work/.caseflow/caseflow.db"));
    }
}
