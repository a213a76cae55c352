//! The step abstraction shared by every leaf and composite transformer.
//!
//! A transformer reads `object` from a [`TransformationContext`] and writes its
//! output into `result`. Composites own their children and decide, per child,
//! whether the child sees the same context or a fresh one.

use super::context::TransformationContext;
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum number of alias hops a single execution may take.
pub const MAX_ALIAS_DEPTH: usize = 64;

/// Named transformers of one configuration generation.
///
/// Built once per generation and never mutated afterwards.
pub type Transformers = HashMap<String, Arc<dyn Transformer>>;

/// Errors raised while executing a transformer.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("{slot} must be a {expected}, got {found}")]
    Type {
        slot: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Object has no field {0}")]
    MissingField(String),
    #[error("Alias for undefined transformer: {0}")]
    UndefinedAlias(String),
    #[error("Alias nesting exceeded {0} levels")]
    RecursionLimit(usize),
    #[error("Step [{index}] failed with error: {source}")]
    Step {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("Element [{index}] failed with error: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("Mapping of field {field} failed with error: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<Error>,
    },
    #[error("Alias {name} failed with error: {source}")]
    Alias {
        name: String,
        #[source]
        source: Box<Error>,
    },
    #[error("Transformer {kind} failed with error: {source}")]
    Leaf {
        kind: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Wraps a leaf-specific error, keeping it opaque to the composites.
    pub fn leaf<E>(kind: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Leaf {
            kind,
            source: source.into(),
        }
    }

    pub fn object_type(expected: &'static str, found: &'static str) -> Self {
        Error::Type {
            slot: "Object",
            expected,
            found,
        }
    }

    pub fn result_type(expected: &'static str, found: &'static str) -> Self {
        Error::Type {
            slot: "Result",
            expected,
            found,
        }
    }
}

/// An executable step.
#[async_trait::async_trait]
pub trait Transformer: Send + Sync {
    /// Runs the step against `ctx`, reading `ctx.object` and writing `ctx.result`.
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error>;
}
