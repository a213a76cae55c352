//! Configuration for alias steps.
//!
//! An alias step is produced for every named transformer of a configuration
//! and bound to that name. The explicit `alias` type takes the name from the
//! `name` field instead.

use crate::value::Map;
use serde::{Deserialize, Serialize};

/// Step type name of the explicit alias step.
pub const TASK_TYPE: &str = "alias";

#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
pub struct Processor {
    /// Named transformer to delegate to. Only read by the explicit `alias` type.
    pub name: Option<String>,
    /// Members merged into `Object` before delegating, overwriting on conflict.
    pub ctx: Option<Map>,
}
