//! Ordered chain of steps.
//!
//! The first step works on the sequence's own context. Every later step that
//! does not keep the context gets a fresh one whose `object` is the previous
//! step's `result`. The last such step is seeded with the sequence's incoming
//! `result`, so the sequence ends up holding exactly that step's output.

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
    let steps = config
        .steps
        .iter()
        .map(|step| TransformerConfig::parse(step, registry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Box::new(Processor { steps }))
}

#[derive(Debug)]
pub struct Processor {
    steps: Vec<TransformerConfig>,
}

#[async_trait::async_trait]
impl Transformer for Processor {
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error> {
        let Some(last) = self.steps.len().checked_sub(1) else {
            return Ok(());
        };

        let mut reserved = match self.steps[last].keep_context {
            false if last > 0 => Some(ctx.result.clone()),
            _ => None,
        };
        let mut owned: Option<TransformationContext> = None;

        for (index, step) in self.steps.iter().enumerate() {
            if !step.keep_context && index > 0 {
                let object = match owned.take() {
                    Some(previous) => previous.result,
                    None => std::mem::take(&mut ctx.result),
                };
                let result = match index == last {
                    true => reserved.take().unwrap_or_else(Value::empty_map),
                    false => Value::empty_map(),
                };
                owned = Some(ctx.derive(object, result));
            }

            let current = match owned.as_mut() {
                Some(current) => current,
                None => &mut *ctx,
            };
            step.transformer
                .transform(current)
                .await
                .map_err(|source| Error::Step {
                    index,
                    source: Box::new(source),
                })?;
        }

        if let Some(current) = owned {
            ctx.result = current.result;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::register_builtins;
    use serde_json::json;

    fn resolve(fragment: serde_json::Value) -> Box<dyn Transformer> {
        let registry = Registry::new();
        register_builtins(&registry).unwrap();
        registry.resolve(TASK_TYPE, &fragment).unwrap()
    }

    #[tokio::test]
    async fn test_result_equals_last_step() {
        let sequence = resolve(json!({
            "steps": [
                {"type": "value", "value": {"a": {"b": "deep"}}},
                {"type": "field", "source": "a"},
                {"type": "field", "source": "b"},
            ]
        }));
        let mut ctx = TransformationContext::default();
        sequence.transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.result, Value::from("deep"));
    }

    #[tokio::test]
    async fn test_empty_sequence_is_identity() {
        let sequence = resolve(json!({"steps": []}));
        let mut ctx = TransformationContext::new(
            Value::from("in"),
            Value::from("out"),
            Default::default(),
        );
        sequence.transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.object, Value::from("in"));
        assert_eq!(ctx.result, Value::from("out"));
    }

    #[tokio::test]
    async fn test_first_step_sees_sequence_object() {
        let sequence = resolve(json!({
            "steps": [{"type": "field", "source": "k"}]
        }));
        let mut ctx = TransformationContext::new(
            Value::from(json!({"k": 7})),
            Value::empty_map(),
            Default::default(),
        );
        sequence.transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.result, Value::from(7u64));
    }

    #[tokio::test]
    async fn test_last_step_is_seeded_with_incoming_result() {
        let sequence = resolve(json!({
            "steps": [
                {"type": "value", "value": 5},
                {"type": "field", "target": "n"},
            ]
        }));
        let mut ctx = TransformationContext::new(
            Value::empty_map(),
            Value::from(json!({"existing": true})),
            Default::default(),
        );
        sequence.transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.result, Value::from(json!({"existing": true, "n": 5})));
    }

    #[tokio::test]
    async fn test_keep_context_step_reaches_back() {
        let sequence = resolve(json!({
            "steps": [
                {"type": "value", "value": {"name": "x"}},
                {"type": "field", "source": "name", "target": "label"},
                {"type": "field", "keep_context": true, "source": "name", "target": "again"},
            ]
        }));
        let mut ctx = TransformationContext::default();
        sequence.transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.result, Value::from(json!({"label": "x", "again": "x"})));
    }

    #[tokio::test]
    async fn test_failure_identifies_step_and_stops() {
        let sequence = resolve(json!({
            "steps": [
                {"type": "value", "value": {"a": 1}},
                {"type": "field", "source": "missing"},
                {"type": "print", "log": true},
            ]
        }));
        let mut ctx = TransformationContext::default();
        let err = sequence.transform(&mut ctx).await.unwrap_err();
        match err {
            Error::Step { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, Error::MissingField(ref f) if f == "missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
