//! HTTP integration: the `http` step and the HTTP configuration source.

pub mod config;
pub mod processor;
pub mod source;

use exporter_core::registry::{self, Registry};

/// Registers the `http` step type.
pub fn register(registry: &Registry) -> Result<(), registry::Error> {
    registry.register(config::TASK_TYPE, processor::build)
}
