//! Compile options carried by a program snapshot, plus per-tree
//! analyzer-style configuration.

use crate::error::Result;
use std::collections::HashMap;

/// Options shared by every unit of one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Parse inputs on a thread pool. Purely a performance knob: output
    /// ordering and diagnostics are identical either way.
    pub concurrent_build: bool,
    /// Output name used when the compilation has no source units to derive
    /// one from.
    pub fallback_output_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            concurrent_build: true,
            fallback_output_name: "out".to_string(),
        }
    }
}

/// Analyzer configuration key/values associated with one original unit.
///
/// The result assembler remaps these onto whatever current tree each
/// original ended up as after the transformer pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TreeConfig {
    pub values: HashMap<String, String>,
}

impl TreeConfig {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn from_json(text: &str) -> Result<TreeConfig> {
        let values = serde_json::from_str(text)?;
        Ok(TreeConfig { values })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.values)?)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tree_config_json_round_trip() {
        let config = TreeConfig::from_json(r#"{"dotnet_analyzer_level":"strict"}"#).unwrap();
        assert_eq!(config.get("dotnet_analyzer_level"), Some("strict"));
        let text = config.to_json().unwrap();
        assert_eq!(TreeConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(TreeConfig::from_json("not json").is_err());
    }
}
