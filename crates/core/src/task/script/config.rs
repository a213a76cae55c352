//! Configuration for script steps.
//!
//! The script sees `source` (the step's `Object`) and `target` (its `Result`)
//! and its final value becomes the new `Result`. `run(name, args)` invokes a
//! named transformer of the running configuration.

use serde::{Deserialize, Serialize};

/// Step type name.
pub const TASK_TYPE: &str = "script";

/// Script step configuration.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize, Default)]
pub struct Processor {
    /// Script engine type (defaults to Rhai).
    #[serde(default)]
    pub engine: ScriptEngine,
    /// Script source code to execute.
    #[serde(alias = "code")]
    pub script: String,
}

/// Supported script engine types.
#[derive(PartialEq, Eq, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptEngine {
    /// Rhai scripting engine.
    #[default]
    Rhai,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_code_alias() {
        let config: Processor = serde_json::from_value(json!({"code": "1 + 1"})).unwrap();
        assert_eq!(config.script, "1 + 1");
        assert_eq!(config.engine, ScriptEngine::Rhai);
    }

    #[test]
    fn test_script_is_required() {
        assert!(serde_json::from_value::<Processor>(json!({"engine": "rhai"})).is_err());
    }
}
