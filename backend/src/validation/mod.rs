//! JSON Schema validation for dashboard configuration files.
//!
//! The schema is embedded at compile time from
//! `schemas/pipeline-config.json` and checked with JSON Schema Draft 7
//! before a config is deserialized, so typos such as `"dedup"` or an
//! unknown policy name are reported instead of silently ignored.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use installboard::validation::validate_pipeline_config;
//!
//! assert!(validate_pipeline_config(&json!({ "dedupe": "none" })).is_ok());
//! assert!(validate_pipeline_config(&json!({ "dedupe": "maybe" })).is_err());
//! ```

use serde_json::Value;

const PIPELINE_CONFIG_SCHEMA: &str = include_str!("../../schemas/pipeline-config.json");

/// Validate a JSON value against a schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn pipeline_config_schema() -> Result<Value, Vec<String>> {
    serde_json::from_str(PIPELINE_CONFIG_SCHEMA)
        .map_err(|e| vec![format!("Invalid embedded schema: {}", e)])
}

/// Validate a config document against the embedded pipeline-config schema.
pub fn validate_pipeline_config(data: &Value) -> Result<(), Vec<String>> {
    let schema = pipeline_config_schema()?;
    validate(&schema, data)
}
