//! Execution context passed between transformers.
//!
//! A context pairs the input `object` with the output `result` of one step and
//! carries the read-only table of named transformers of the running generation.

use super::transformer::Transformers;
use crate::value::Value;
use std::sync::Arc;

/// Data threaded through one step.
#[derive(Clone)]
pub struct TransformationContext {
    /// Input of the step.
    pub object: Value,
    /// Output built by the step.
    pub result: Value,
    /// Named transformers of the current generation.
    pub transformers: Arc<Transformers>,
    /// Number of alias hops taken to reach this context.
    pub(crate) depth: usize,
}

impl TransformationContext {
    pub fn new(object: Value, result: Value, transformers: Arc<Transformers>) -> Self {
        Self {
            object,
            result,
            transformers,
            depth: 0,
        }
    }

    /// Creates a child context sharing this context's transformer table.
    pub fn derive(&self, object: Value, result: Value) -> Self {
        Self {
            object,
            result,
            transformers: Arc::clone(&self.transformers),
            depth: self.depth,
        }
    }

    /// Successor context of a non-`keep_context` step: the previous result
    /// becomes the input and the output starts as an empty mapping.
    pub fn next(self) -> Self {
        Self {
            object: self.result,
            result: Value::empty_map(),
            transformers: self.transformers,
            depth: self.depth,
        }
    }
}

impl Default for TransformationContext {
    fn default() -> Self {
        Self::new(Value::empty_map(), Value::empty_map(), Arc::default())
    }
}

impl std::fmt::Debug for TransformationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.transformers.keys().collect();
        names.sort();
        f.debug_struct("TransformationContext")
            .field("object", &self.object)
            .field("result", &self.result)
            .field("transformers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_moves_result_into_object() {
        let ctx = TransformationContext::new(Value::from("in"), Value::from("out"), Arc::default());
        let next = ctx.next();
        assert_eq!(next.object, Value::from("out"));
        assert_eq!(next.result, Value::empty_map());
    }

    #[test]
    fn test_derive_shares_table() {
        let ctx = TransformationContext::default();
        let child = ctx.derive(Value::Null, Value::Null);
        assert!(Arc::ptr_eq(&ctx.transformers, &child.transformers));
    }
}
