//! Configuration for print steps.

use serde::{Deserialize, Serialize};

/// Step type name.
pub const TASK_TYPE: &str = "print";

/// Placeholder replaced with the rendered `Object`.
pub const PLACEHOLDER: &str = "{}";

/// Print step configuration.
///
/// Templates use `{}` placeholders; printf-style verbs such as `%v` are not expanded.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct Processor {
    /// Output template. Every `{}` is replaced with `Object`.
    #[serde(default = "default_format")]
    pub format: String,
    /// Also emit the rendered text to the log.
    #[serde(default)]
    pub log: bool,
}

impl Default for Processor {
    fn default() -> Self {
        Self {
            format: default_format(),
            log: false,
        }
    }
}

fn default_format() -> String {
    PLACEHOLDER.to_string()
}
