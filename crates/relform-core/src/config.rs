//! Engine configuration that downstream crates can serialize/deserialize.
//!
//! These knobs only shape *names*: identifier length limits and which columns
//! the catalog treats as system-managed. Operators never read the environment
//! themselves; callers build a config once and hand it to the constructors.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum identifier length supported by the catalog (constraint names
    /// are clipped to fit).
    pub max_identifier_len: usize,

    /// Name of the system row-identifier column.
    pub row_id_column: String,

    /// Columns maintained by the catalog itself.
    pub system_columns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_identifier_len: 63,
            row_id_column: "RID".to_string(),
            system_columns: ["RID", "RCB", "RMB", "RCT", "RMT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RELFORM_MAX_IDENTIFIER_LEN`: identifier length limit
    /// - `RELFORM_ROW_ID_COLUMN`: system row-identifier column name
    /// - `RELFORM_SYSTEM_COLUMNS`: comma-separated system column names
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("RELFORM_MAX_IDENTIFIER_LEN") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_identifier_len = v;
            }
        }

        if let Ok(s) = std::env::var("RELFORM_ROW_ID_COLUMN") {
            if !s.trim().is_empty() {
                cfg.row_id_column = s.trim().to_string();
            }
        }

        if let Ok(s) = std::env::var("RELFORM_SYSTEM_COLUMNS") {
            let cols: Vec<String> = s
                .split(',')
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string())
                .collect();
            if !cols.is_empty() {
                cfg.system_columns = cols;
            }
        }

        cfg
    }

    /// Reject configurations that cannot produce a valid constraint name.
    pub fn validate(&self) -> Result<()> {
        // Room for at least one character, the separator, and a short suffix.
        if self.max_identifier_len < 8 {
            return Err(Error::Config(format!(
                "max_identifier_len must be at least 8, got {}",
                self.max_identifier_len
            )));
        }
        if self.row_id_column.is_empty() {
            return Err(Error::Config("row_id_column must not be empty".into()));
        }
        Ok(())
    }

    pub fn is_system_column(&self, name: &str) -> bool {
        self.system_columns.iter().any(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_identifier_len, 63);
        assert!(cfg.is_system_column("RMT"));
        assert!(!cfg.is_system_column("name"));
    }

    #[test]
    fn test_from_env_overrides_and_falls_back() {
        // Only this test touches the RELFORM_* variables.
        std::env::set_var("RELFORM_MAX_IDENTIFIER_LEN", "40");
        std::env::set_var("RELFORM_ROW_ID_COLUMN", "  ");
        std::env::set_var("RELFORM_SYSTEM_COLUMNS", "RID, created ,,");
        let cfg = EngineConfig::from_env();
        assert_eq!(cfg.max_identifier_len, 40);
        assert_eq!(cfg.row_id_column, "RID");
        assert_eq!(cfg.system_columns, vec!["RID", "created"]);
        assert!(cfg.validate().is_ok());

        std::env::set_var("RELFORM_MAX_IDENTIFIER_LEN", "lots");
        assert_eq!(EngineConfig::from_env().max_identifier_len, 63);

        for var in [
            "RELFORM_MAX_IDENTIFIER_LEN",
            "RELFORM_ROW_ID_COLUMN",
            "RELFORM_SYSTEM_COLUMNS",
        ] {
            std::env::remove_var(var);
        }
        assert_eq!(EngineConfig::from_env(), EngineConfig::default());
    }

    #[test]
    fn test_tiny_identifier_limit_rejected() {
        let cfg = EngineConfig {
            max_identifier_len: 3,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }
}
