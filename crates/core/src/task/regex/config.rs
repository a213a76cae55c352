//! Configuration for regular expression substitution steps.

use serde::{Deserialize, Serialize};

/// Step type name.
pub const TASK_TYPE: &str = "regex";

/// Regex step configuration.
///
/// Group references follow `regex` expansion rules: `$1abc` names a group `1abc`, write `${1}abc`.
#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
pub struct Processor {
    /// Pattern searched for in the `Object` string.
    #[serde(rename = "match")]
    pub pattern: String,
    /// Output template. `$1` or `${name}` refer to capture groups of the first match.
    #[serde(default)]
    pub replacement: String,
}
