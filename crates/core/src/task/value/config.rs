//! Configuration for literal value steps.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Step type name.
pub const TASK_TYPE: &str = "value";

#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
pub struct Processor {
    /// Literal written into `Result`.
    #[serde(default)]
    pub value: Value,
}
