//! Configuration system for the compiler.
//!
//! Supports TOML-based configuration; every setting has a built-in default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;
use crate::error::{Result, SlicerError};
use crate::sql_ast::SqlJoinType;

/// Marker projected in place of a collapsed totals-dimension.
pub const DEFAULT_TOTALS_MARKER: &str = "_ROLLUP_TOTALS_";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SlicerConfig {
    pub compiler: CompilerConfig,
}

/// Query compilation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Dialect used when rendering without an explicit one (default: duckdb).
    pub dialect: DialectKind,
    /// Literal standing in for totals-dimensions in totals statements.
    pub totals_marker: String,
    /// How comparison sub-queries join the base query (default: left).
    pub reference_join: ReferenceJoin,
    /// Wrap the divisor of `_p` references in `NULLIF(x, 0)` (default: true).
    pub guard_percentage_division: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceJoin {
    #[default]
    Left,
    Inner,
}

impl From<ReferenceJoin> for SqlJoinType {
    fn from(join: ReferenceJoin) -> Self {
        match join {
            ReferenceJoin::Left => SqlJoinType::Left,
            ReferenceJoin::Inner => SqlJoinType::Inner,
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::default(),
            totals_marker: DEFAULT_TOTALS_MARKER.to_string(),
            reference_join: ReferenceJoin::default(),
            guard_percentage_division: true,
        }
    }
}

impl SlicerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SlicerError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(toml_str)
            .map_err(|e| SlicerError::Config(format!("failed to parse config: {e}")))?;
        if cfg.compiler.totals_marker.is_empty() {
            return Err(SlicerError::Config(
                "compiler.totals_marker must not be empty".to_string(),
            ));
        }
        Ok(cfg)
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `SLICER_CONFIG` environment variable
    /// 2. `./slicer.toml` (current directory)
    /// 3. `~/.config/slicer/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("SLICER_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from SLICER_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring SLICER_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("slicer.toml") {
            tracing::info!("loaded config from ./slicer.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("slicer").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = SlicerConfig::default();
        assert_eq!(cfg.compiler.dialect, DialectKind::Duckdb);
        assert_eq!(cfg.compiler.totals_marker, "_ROLLUP_TOTALS_");
        assert_eq!(cfg.compiler.reference_join, ReferenceJoin::Left);
        assert!(cfg.compiler.guard_percentage_division);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[compiler]
dialect = "postgres"
reference_join = "inner"
guard_percentage_division = false
"#;
        let cfg = SlicerConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.compiler.dialect, DialectKind::Postgres);
        assert_eq!(cfg.compiler.reference_join, ReferenceJoin::Inner);
        assert!(!cfg.compiler.guard_percentage_division);
        // unspecified keys keep their defaults
        assert_eq!(cfg.compiler.totals_marker, DEFAULT_TOTALS_MARKER);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            SlicerConfig::from_toml("[compiler]\ndialect = \"oracle\"\n"),
            Err(SlicerError::Config(_))
        ));
        assert!(matches!(
            SlicerConfig::from_toml("[compiler]\ntotals_marker = \"\"\n"),
            Err(SlicerError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[compiler]\ntotals_marker = \"~totals~\"").unwrap();
        let cfg = SlicerConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.compiler.totals_marker, "~totals~");

        let missing = SlicerConfig::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(SlicerError::Config(_))));
    }
}
