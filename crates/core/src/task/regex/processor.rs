//! Regular expression extraction.
//!
//! When the pattern matches, `Result` is the replacement template expanded
//! with the capture groups of the first match. Otherwise the input passes
//! through unchanged.

use super::config::TASK_TYPE;
use crate::config::Fragment;
use crate::registry::{self, Registry};
use crate::task::context::TransformationContext;
use crate::task::transformer::{Error, Transformer};
use crate::value::Value;
use ::regex::Regex;

pub fn build(
    fragment: &Fragment,
    _registry: &Registry,
) -> Result<Box<dyn Transformer>, registry::Error> {
    let config: super::config::Processor = registry::decode(TASK_TYPE, fragment)?;
    let pattern = Regex::new(&config.pattern).map_err(|e| registry::Error::parse(TASK_TYPE, e))?;
    Ok(Box::new(Processor {
        pattern,
        replacement: config.replacement,
    }))
}

#[derive(Debug)]
pub struct Processor {
    pattern: Regex,
    replacement: String,
}

#[async_trait::async_trait]
impl Transformer for Processor {
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error> {
        let input = ctx
            .object
            .as_str()
            .ok_or_else(|| Error::object_type("string", ctx.object.kind()))?;

        let output = match self.pattern.captures(input) {
            Some(captures) => {
                let mut expanded = String::new();
                captures.expand(&self.replacement, &mut expanded);
                expanded
            }
            None => input.to_string(),
        };
        ctx.result = Value::String(output);
        Ok(())
    }
}
