//! Pipeline configuration.
//!
//! A single [`PipelineConfig`] covers the small differences between
//! dashboard variants: whether duplicate hospitals are dropped, which CSV
//! headers hold each required field, and the delimiter.
//!
//! Resolution order (later wins): defaults, JSON config file, environment
//! (`INSTALLBOARD_DEDUPE`, `INSTALLBOARD_DELIMITER`), CLI flags.
//!
//! ```json
//! {
//!   "dedupe": "first-wins",
//!   "delimiter": ",",
//!   "columnMap": {
//!     "cluster": "Cluster",
//!     "hospital": "Hospital",
//!     "tanksRequired": "# Tanks MoH",
//!     "tanksInstalled": "# Installed"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::validation::validate_pipeline_config;

/// Environment variable overriding [`PipelineConfig::dedupe`].
pub const ENV_DEDUPE: &str = "INSTALLBOARD_DEDUPE";

/// Environment variable overriding [`PipelineConfig::delimiter`].
pub const ENV_DELIMITER: &str = "INSTALLBOARD_DELIMITER";

/// Environment variable pointing at a JSON config file.
pub const ENV_CONFIG: &str = "INSTALLBOARD_CONFIG";

/// Maximum accepted upload size (50 MiB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// Dedupe policy
// =============================================================================

/// What to do with repeated hospital identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DedupePolicy {
    /// Keep the first row per hospital, drop later ones.
    #[default]
    FirstWins,
    /// Keep every row.
    None,
}

impl DedupePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupePolicy::FirstWins => "first-wins",
            DedupePolicy::None => "none",
        }
    }
}

impl fmt::Display for DedupePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DedupePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first-wins" | "first_wins" | "first" => Ok(DedupePolicy::FirstWins),
            "none" | "off" => Ok(DedupePolicy::None),
            other => Err(ConfigError::UnknownDedupe(other.to_string())),
        }
    }
}

// =============================================================================
// Column map
// =============================================================================

/// CSV header names for each required field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnMap {
    pub cluster: String,
    pub hospital: String,
    pub tanks_required: String,
    pub tanks_installed: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            cluster: "Cluster".to_string(),
            hospital: "Hospital".to_string(),
            tanks_required: "# Tanks MoH".to_string(),
            tanks_installed: "# Installed".to_string(),
        }
    }
}

impl ColumnMap {
    /// Required header names, in display order.
    pub fn required(&self) -> [&str; 4] {
        [
            self.cluster.as_str(),
            self.hospital.as_str(),
            self.tanks_required.as_str(),
            self.tanks_installed.as_str(),
        ]
    }
}

// =============================================================================
// Pipeline config
// =============================================================================

/// Options for one dashboard computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Duplicate hospital handling.
    pub dedupe: DedupePolicy,

    /// Required header names.
    pub column_map: ColumnMap,

    /// Force a delimiter instead of auto-detecting it.
    pub delimiter: Option<char>,
}

impl PipelineConfig {
    /// Parse and schema-check a JSON config.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        validate_pipeline_config(&value).map_err(ConfigError::Invalid)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Load a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        debug!("Loaded config from {}", path.as_ref().display());
        Self::from_json(&content)
    }

    /// Defaults, or the given file, then environment overrides.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.with_env()
    }

    /// Apply `INSTALLBOARD_*` environment overrides.
    pub fn with_env(self) -> ConfigResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DEDUPE) {
            self.dedupe = value.parse()?;
        }
        if let Some(value) = lookup(ENV_DELIMITER) {
            self.delimiter = Some(parse_delimiter(&value)?);
        }
        Ok(self)
    }
}

/// Parse a delimiter argument; accepts a single character or `\t` / `tab`.
pub fn parse_delimiter(value: &str) -> ConfigResult<char> {
    match value {
        "\\t" | "tab" | "TAB" => return Ok('\t'),
        _ => {}
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::InvalidDelimiter(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.dedupe, DedupePolicy::FirstWins);
        assert_eq!(config.column_map.tanks_required, "# Tanks MoH");
        assert_eq!(config.column_map.tanks_installed, "# Installed");
        assert!(config.delimiter.is_none());
    }

    #[test]
    fn test_from_json_partial() {
        let config = PipelineConfig::from_json(
            r#"{"dedupe": "none", "columnMap": {"hospital": "Site"}}"#,
        )
        .unwrap();
        assert_eq!(config.dedupe, DedupePolicy::None);
        assert_eq!(config.column_map.hospital, "Site");
        assert_eq!(config.column_map.cluster, "Cluster");
    }

    #[test]
    fn test_from_json_rejects_unknown_policy() {
        let err = PipelineConfig::from_json(r#"{"dedupe": "last-wins"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_json_rejects_unknown_key() {
        let err = PipelineConfig::from_json(r#"{"dedup": "none"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"delimiter": ";"}}"#).unwrap();
        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.delimiter, Some(';'));
    }

    #[test]
    fn test_overrides_beat_file_values() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_DEDUPE, "none"), (ENV_DELIMITER, "tab")]);
        let config = PipelineConfig::from_json(r#"{"dedupe": "first-wins"}"#)
            .unwrap()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.dedupe, DedupePolicy::None);
        assert_eq!(config.delimiter, Some('\t'));
    }

    #[test]
    fn test_bad_override() {
        let result = PipelineConfig::default()
            .with_overrides(|k| (k == ENV_DEDUPE).then(|| "sometimes".to_string()));
        assert!(matches!(result, Err(ConfigError::UnknownDedupe(_))));
    }

    #[test]
    fn test_dedupe_from_str() {
        assert_eq!("first-wins".parse::<DedupePolicy>().unwrap(), DedupePolicy::FirstWins);
        assert_eq!("NONE".parse::<DedupePolicy>().unwrap(), DedupePolicy::None);
        assert_eq!(DedupePolicy::FirstWins.to_string(), "first-wins");
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), ',');
        assert_eq!(parse_delimiter("\\t").unwrap(), '\t');
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("").is_err());
    }
}
