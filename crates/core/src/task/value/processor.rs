//! Writes a literal into `Result`.

use super::config::TASK_TYPE;
use crate::config::Fragment;
use crate::registry::{self, Registry};
use crate::task::context::TransformationContext;
use crate::task::transformer::{Error, Transformer};

pub fn build(
    fragment: &Fragment,
    _registry: &Registry,
) -> Result<Box<dyn Transformer>, registry::Error> {
    let config: super::config::Processor = registry::decode(TASK_TYPE, fragment)?;
    Ok(Box::new(Processor { config }))
}

#[derive(Debug)]
pub struct Processor {
    config: super::config::Processor,
}

#[async_trait::async_trait]
impl Transformer for Processor {
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error> {
        ctx.result = self.config.value.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    #[tokio::test]
    async fn test_sets_literal() {
        let step = build(&json!({"type": "value", "value": [1, "a"]}), &Registry::new()).unwrap();
        let mut ctx = TransformationContext::default();
        step.transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.result, Value::from(json!([1, "a"])));
    }

    #[tokio::test]
    async fn test_missing_value_is_null() {
        let step = build(&json!({"type": "value"}), &Registry::new()).unwrap();
        let mut ctx = TransformationContext::default();
        step.transform(&mut ctx).await.unwrap();
        assert!(ctx.result.is_null());
    }
}
