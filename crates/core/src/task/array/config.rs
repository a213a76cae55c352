//! Configuration for element-wise mapping steps.

use crate::config::Fragment;
use serde::{Deserialize, Serialize};

/// Step type name.
pub const TASK_TYPE: &str = "array";

#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
pub struct Processor {
    /// Step applied to every element of `Object`.
    #[serde(default)]
    pub map: Fragment,
}
