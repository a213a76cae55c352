//! Element-wise mapping over an array `Object`.
//!
//! Elements are processed one at a time in input order. Each element gets a
//! fresh context and its result is appended to the array in `Result`, reusing
//! an array that is already there.

use super::config::TASK_TYPE;
use crate::config::{Fragment, TransformerConfig};
use crate::registry::{self, Registry};
use crate::task::context::TransformationContext;
use crate::task::transformer::{Error, Transformer};
use crate::value::Value;

pub fn build(
    fragment: &Fragment,
    registry: &Registry,
) -> Result<Box<dyn Transformer>, registry::Error> {
    let config: super::config::Processor = registry::decode(TASK_TYPE, fragment)?;
    if config.map.is_null() {
        return Err(registry::Error::parse(TASK_TYPE, "array requires a map step"));
    }
    let map = TransformerConfig::parse(&config.map, registry)?;
    Ok(Box::new(Processor { map }))
}

#[derive(Debug)]
pub struct Processor {
    map: TransformerConfig,
}

#[async_trait::async_trait]
impl Transformer for Processor {
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error> {
        if ctx.object.as_array().is_none() {
            return Err(Error::object_type("array", ctx.object.kind()));
        }

        let mut results = match std::mem::take(&mut ctx.result) {
            Value::Array(existing) => existing,
            _ => Vec::new(),
        };

        let items = ctx.object.as_array().map(Vec::as_slice).unwrap_or_default();
        results.reserve(items.len());
        for (index, item) in items.iter().enumerate() {
            let mut element = ctx.derive(item.clone(), Value::empty_map());
            self.map
                .transformer
                .transform(&mut element)
                .await
                .map_err(|source| Error::Element {
                    index,
                    source: Box::new(source),
                })?;
            results.push(element.result);
        }

        ctx.result = Value::Array(results);
        Ok(())
    }
}
