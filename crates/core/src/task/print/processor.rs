//! Renders `Object` into a text template.

use super::config::{PLACEHOLDER, TASK_TYPE};
use crate::config::Fragment;
use crate::registry::{self, Registry};
use crate::task::context::TransformationContext;
use crate::task::transformer::{Error, Transformer};
use crate::value::Value;
use tracing::info;

pub fn build(
    fragment: &Fragment,
    _registry: &Registry,
) -> Result<Box<dyn Transformer>, registry::Error> {
    let mut config: super::config::Processor = registry::decode(TASK_TYPE, fragment)?;
    if config.format.is_empty() {
        config.format = PLACEHOLDER.to_string();
    }
    Ok(Box::new(Processor { config }))
}

#[derive(Debug)]
pub struct Processor {
    config: super::config::Processor,
}

#[async_trait::async_trait]
impl Transformer for Processor {
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error> {
        let rendered = self
            .config
            .format
            .replace(PLACEHOLDER, &ctx.object.to_string());
        if self.config.log {
            info!("{}", rendered);
        }
        ctx.result = Value::String(rendered);
        Ok(())
    }
}
