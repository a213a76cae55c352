//! Indirect reference to a named transformer.
//!
//! The target is looked up in the context's transformer table at execution
//! time, so an alias always runs the definition of the generation that is
//! executing it.

use super::config::TASK_TYPE;
use crate::config::Fragment;
use crate::registry::{self, Registry, TransformerFactory};
use crate::task::context::TransformationContext;
use crate::task::transformer::{Error, Transformer, MAX_ALIAS_DEPTH};
use crate::value::Map;
use std::sync::Arc;

/// Factory bound to one named transformer.
#[derive(Debug, Clone)]
pub struct Factory {
    name: String,
}

impl Factory {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TransformerFactory for Factory {
    fn build(
        &self,
        fragment: &Fragment,
        _registry: &Registry,
    ) -> Result<Box<dyn Transformer>, registry::Error> {
        let config: super::config::Processor = registry::decode(&self.name, fragment)?;
        Ok(Box::new(Processor {
            name: self.name.clone(),
            ctx: config.ctx.unwrap_or_default(),
        }))
    }
}

/// Builds an alias whose target comes from the `name` field.
pub fn build(
    fragment: &Fragment,
    _registry: &Registry,
) -> Result<Box<dyn Transformer>, registry::Error> {
    let config: super::config::Processor = registry::decode(TASK_TYPE, fragment)?;
    let name = config
        .name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| registry::Error::parse(TASK_TYPE, "alias requires a name"))?;
    Ok(Box::new(Processor {
        name,
        ctx: config.ctx.unwrap_or_default(),
    }))
}

/// Delegates to a named transformer after merging fixed parameters into `Object`.
#[derive(Debug)]
pub struct Processor {
    name: String,
    ctx: Map,
}

#[async_trait::async_trait]
impl Transformer for Processor {
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error> {
        if !self.ctx.is_empty() {
            let found = ctx.object.kind();
            let object = ctx
                .object
                .as_map_mut()
                .ok_or(Error::object_type("map", found))?;
            for (key, value) in &self.ctx {
                object.insert(key.clone(), value.clone());
            }
        }

        let transformers = Arc::clone(&ctx.transformers);
        let target = transformers
            .get(&self.name)
            .ok_or_else(|| Error::UndefinedAlias(self.name.clone()))?;

        if ctx.depth >= MAX_ALIAS_DEPTH {
            return Err(Error::RecursionLimit(MAX_ALIAS_DEPTH));
        }
        ctx.depth += 1;
        let outcome = target.transform(ctx).await;
        ctx.depth -= 1;

        outcome.map_err(|source| Error::Alias {
            name: self.name.clone(),
            source: Box::new(source),
        })
    }
}
