//! Registry of transformer factories keyed by step type name.
//!
//! The registry is an explicit handle rather than process-wide state. Clones
//! share the same table, so the reloader, the configuration parser and the
//! composite factories all see one collision-checked namespace.

use crate::config::Fragment;
use crate::task::transformer::Transformer;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Errors raised while registering or resolving step types.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Transformer type is required")]
    MissingType,
    #[error("Unknown transformer type {0}")]
    UnknownType(String),
    #[error("Transformer with name {0} is already registered")]
    DuplicateName(String),
    #[error("Parsing {kind} configuration failed with error: {source}")]
    Parse {
        kind: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub fn parse<E>(kind: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Parse {
            kind: kind.into(),
            source: source.into(),
        }
    }
}

/// Builds a transformer from its configuration fragment.
///
/// Composite factories use `registry` to resolve nested fragments.
pub trait TransformerFactory: Send + Sync {
    fn build(&self, fragment: &Fragment, registry: &Registry)
        -> Result<Box<dyn Transformer>, Error>;
}

impl<F> TransformerFactory for F
where
    F: Fn(&Fragment, &Registry) -> Result<Box<dyn Transformer>, Error> + Send + Sync,
{
    fn build(
        &self,
        fragment: &Fragment,
        registry: &Registry,
    ) -> Result<Box<dyn Transformer>, Error> {
        self(fragment, registry)
    }
}

/// Shared table of step type name to factory.
#[derive(Clone, Default)]
pub struct Registry {
    factories: Arc<RwLock<HashMap<String, Arc<dyn TransformerFactory>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `factory`. Fails when the name is already bound.
    pub fn register<F>(&self, name: &str, factory: F) -> Result<(), Error>
    where
        F: TransformerFactory + 'static,
    {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        factories.insert(name.to_string(), Arc::new(factory));
        debug!(name, "registered transformer factory");
        Ok(())
    }

    /// Removes the binding for `name`. Returns whether a binding existed.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            debug!(name, "unregistered transformer factory");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Sorted snapshot of the bound names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Looks up the factory bound to `name` and builds a transformer from `fragment`.
    ///
    /// The lock is released before the factory runs so that composite
    /// factories can resolve their children through the same registry.
    pub fn resolve(&self, name: &str, fragment: &Fragment) -> Result<Box<dyn Transformer>, Error> {
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType(name.to_string()))?;
        factory.build(fragment, self)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}

/// Decodes the type-specific fields of a fragment. Unknown fields are ignored.
pub fn decode<T: DeserializeOwned>(kind: &str, fragment: &Fragment) -> Result<T, Error> {
    T::deserialize(fragment).map_err(|e| Error::parse(kind, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::context::TransformationContext;
    use crate::task::transformer;
    use serde_json::json;

    struct Noop;

    #[async_trait::async_trait]
    impl Transformer for Noop {
        async fn transform(&self, _ctx: &mut TransformationContext) -> Result<(), transformer::Error> {
            Ok(())
        }
    }

    fn noop(_: &Fragment, _: &Registry) -> Result<Box<dyn Transformer>, Error> {
        Ok(Box::new(Noop))
    }

    #[test]
    fn test_register_duplicate_fails() {
        let registry = Registry::new();
        registry.register("noop", noop).unwrap();
        let err = registry.register("noop", noop).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(ref name) if name == "noop"));
        assert_eq!(
            err.to_string(),
            "Transformer with name noop is already registered"
        );
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = Registry::new();
        registry.register("noop", noop).unwrap();
        assert!(registry.unregister("noop"));
        assert!(!registry.unregister("noop"));
        assert!(!registry.contains("noop"));
        registry.register("noop", noop).unwrap();
    }

    #[test]
    fn test_resolve_unknown_type() {
        let registry = Registry::new();
        let err = registry.resolve("missing", &json!({})).err().unwrap();
        assert!(matches!(err, Error::UnknownType(ref name) if name == "missing"));
    }

    #[test]
    fn test_factory_can_resolve_recursively() {
        let registry = Registry::new();
        registry.register("noop", noop).unwrap();
        registry
            .register("wrapper", |fragment: &Fragment, registry: &Registry| {
                registry.resolve("noop", fragment)
            })
            .unwrap();
        assert!(registry.resolve("wrapper", &json!({})).is_ok());
    }

    #[test]
    fn test_clones_share_table() {
        let registry = Registry::new();
        let clone = registry.clone();
        clone.register("noop", noop).unwrap();
        assert!(registry.contains("noop"));
        assert_eq!(registry.names(), vec!["noop".to_string()]);
    }

    #[test]
    fn test_decode_reports_kind() {
        #[derive(serde::Deserialize, Debug)]
        struct Cfg {
            #[allow(dead_code)]
            map: String,
        }
        let err = decode::<Cfg>("field", &json!({"map": 1})).unwrap_err();
        assert!(matches!(err, Error::Parse { ref kind, .. } if kind == "field"));
    }
}
