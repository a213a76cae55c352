//! Configuration for ordered chains of steps.

use crate::config::Fragment;
use serde::{Deserialize, Serialize};

/// Step type name.
pub const TASK_TYPE: &str = "sequence";

#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
pub struct Processor {
    /// Steps executed in order. Each entry is a full step fragment.
    #[serde(default)]
    pub steps: Vec<Fragment>,
}
