//! Configuration for field projection and injection steps.

use crate::config::Fragment;
use serde::{Deserialize, Serialize};

/// Step type name.
pub const TASK_TYPE: &str = "field";

#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
pub struct Processor {
    /// Member of `Object` to extract. The whole `Object` is used when absent.
    pub source: Option<String>,
    /// Member of `Result` to write. The whole `Result` is replaced when absent.
    pub target: Option<String>,
    /// Optional step applied to the extracted value.
    pub map: Option<Fragment>,
}
