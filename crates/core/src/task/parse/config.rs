//! Configuration for JSON encode and decode steps.

use serde::{Deserialize, Serialize};

/// Step type name.
pub const TASK_TYPE: &str = "parse";

#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
pub struct Processor {
    #[serde(default)]
    pub format: Format,
}

/// Direction of the conversion.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Decode JSON bytes into a mapping or an array.
    #[default]
    FromBytes,
    /// Encode `Object` as JSON bytes.
    ToBytes,
}
