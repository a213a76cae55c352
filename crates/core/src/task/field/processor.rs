//! Field projection and injection.
//!
//! `source` picks a member out of `Object`, `map` optionally transforms it and
//! `target` decides where the value lands in `Result`. Each part is optional.

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
    let map = config
        .map
        .as_ref()
        .map(|map| TransformerConfig::parse(map, registry))
        .transpose()?;
    Ok(Box::new(Processor {
        source: config.source,
        target: config.target,
        map,
    }))
}

#[derive(Debug)]
pub struct Processor {
    source: Option<String>,
    target: Option<String>,
    map: Option<TransformerConfig>,
}

impl Processor {
    fn extract(&self, object: &Value) -> Result<Value, Error> {
        let Some(source) = &self.source else {
            return Ok(object.clone());
        };
        let map = object
            .as_map()
            .ok_or_else(|| Error::object_type("map", object.kind()))?;
        map.get(source)
            .cloned()
            .ok_or_else(|| Error::MissingField(source.clone()))
    }

    fn label(&self) -> String {
        self.target
            .as_ref()
            .or(self.source.as_ref())
            .cloned()
            .unwrap_or_else(|| "<object>".to_string())
    }
}

#[async_trait::async_trait]
impl Transformer for Processor {
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error> {
        let value = self.extract(&ctx.object)?;

        if self.target.is_some() {
            if ctx.result.is_null() {
                ctx.result = Value::empty_map();
            }
            if ctx.result.as_map().is_none() {
                return Err(Error::result_type("map", ctx.result.kind()));
            }
        }

        let value = match &self.map {
            Some(mapper) => {
                let seed = match &self.target {
                    Some(target) => ctx
                        .result
                        .as_map_mut()
                        .and_then(|parent| parent.remove(target)),
                    None => Some(std::mem::take(&mut ctx.result)),
                };
                let seeded = seed.is_some();
                let mut mapped = ctx.derive(value, seed.unwrap_or_else(Value::empty_map));
                if let Err(source) = mapper.transformer.transform(&mut mapped).await {
                    // A failed mapping hands the seed back to `Result`.
                    if seeded {
                        match &self.target {
                            Some(target) => {
                                if let Some(parent) = ctx.result.as_map_mut() {
                                    parent.insert(target.clone(), mapped.result);
                                }
                            }
                            None => ctx.result = mapped.result,
                        }
                    }
                    return Err(Error::Field {
                        field: self.label(),
                        source: Box::new(source),
                    });
                }
                mapped.result
            }
            None => value,
        };

        match &self.target {
            Some(target) => {
                if let Some(parent) = ctx.result.as_map_mut() {
                    parent.insert(target.clone(), value);
                }
            }
            None => ctx.result = value,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::register_builtins;
    use serde_json::json;

    const FIXTURE: &str = r#"
f2f:
  type: field
  source: keyname
  target: namekey
f2fm:
  type: field
  source: keyname
  target: namekey
  map:
    type: field
    source: subkey
arr:
  type: field
  source: items
  target: items
  map:
    type: array
    map:
      type: field
      target: url
"#;

    fn resolve(name: &str) -> Box<dyn Transformer> {
        let registry = Registry::new();
        register_builtins(&registry).unwrap();
        let fixture: serde_json::Value = serde_yaml::from_str(FIXTURE).unwrap();
        TransformerConfig::parse(&fixture[name], &registry)
            .unwrap()
            .transformer
    }

    fn context(object: serde_json::Value) -> TransformationContext {
        TransformationContext::new(Value::from(object), Value::empty_map(), Default::default())
    }

    #[tokio::test]
    async fn test_field_to_field() {
        let mut ctx = context(json!({"keyname": "value"}));
        resolve("f2f").transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.result, Value::from(json!({"namekey": "value"})));
    }

    #[tokio::test]
    async fn test_field_to_field_with_map() {
        let mut ctx = context(json!({"keyname": {"subkey": "subvalue"}}));
        resolve("f2fm").transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.result, Value::from(json!({"namekey": "subvalue"})));
    }

    #[tokio::test]
    async fn test_field_mapping_array() {
        let mut ctx = context(json!({"items": ["1", "2", "3"]}));
        resolve("arr").transform(&mut ctx).await.unwrap();
        assert_eq!(
            ctx.result,
            Value::from(json!({"items": [{"url": "1"}, {"url": "2"}, {"url": "3"}]}))
        );
    }

    #[tokio::test]
    async fn test_source_and_target() {
        let field = Processor {
            source: Some("a".to_string()),
            target: Some("b".to_string()),
            map: None,
        };
        let mut ctx = context(json!({"a": 5}));
        field.transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.result, Value::from(json!({"b": 5})));
    }

    #[tokio::test]
    async fn test_missing_source_is_an_error() {
        let field = Processor {
            source: Some("absent".to_string()),
            target: None,
            map: None,
        };
        for object in [json!({}), json!({"other": null})] {
            let mut ctx = context(object);
            let err = field.transform(&mut ctx).await.unwrap_err();
            assert!(matches!(err, Error::MissingField(ref f) if f == "absent"));
        }
    }

    #[tokio::test]
    async fn test_source_requires_map_object() {
        let field = Processor {
            source: Some("a".to_string()),
            target: None,
            map: None,
        };
        let mut ctx = context(json!([1, 2]));
        let err = field.transform(&mut ctx).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Type {
                slot: "Object",
                expected: "map",
                found: "array"
            }
        ));
    }

    #[tokio::test]
    async fn test_target_on_null_result_creates_map() {
        let field = Processor {
            source: None,
            target: Some("all".to_string()),
            map: None,
        };
        let mut ctx = TransformationContext::new(Value::from(1u64), Value::Null, Default::default());
        field.transform(&mut ctx).await.unwrap();
        assert_eq!(ctx.result, Value::from(json!({"all": 1})));
    }

    #[tokio::test]
    async fn test_target_on_scalar_result_is_type_error() {
        let field = Processor {
            source: None,
            target: Some("all".to_string()),
            map: None,
        };
        let mut ctx = TransformationContext::new(
            Value::from(1u64),
            Value::from("scalar"),
            Default::default(),
        );
        let err = field.transform(&mut ctx).await.unwrap_err();
        assert!(matches!(err, Error::Type { slot: "Result", .. }));
    }

    #[tokio::test]
    async fn test_map_failure_keeps_result() {
        let mut ctx = TransformationContext::new(
            Value::from(json!({"keyname": {"other": 1}})),
            Value::from(json!({"namekey": {"kept": 1}, "sibling": true})),
            Default::default(),
        );
        assert!(resolve("f2fm").transform(&mut ctx).await.is_err());
        assert_eq!(
            ctx.result,
            Value::from(json!({"namekey": {"kept": 1}, "sibling": true}))
        );

        let mut ctx = TransformationContext::new(
            Value::from(json!({"keyname": {"other": 1}})),
            Value::from(json!({"sibling": true})),
            Default::default(),
        );
        assert!(resolve("f2fm").transform(&mut ctx).await.is_err());
        assert_eq!(ctx.result, Value::from(json!({"sibling": true})));
    }

    #[tokio::test]
    async fn test_map_failure_names_field() {
        let mut ctx = context(json!({"keyname": {"other": 1}}));
        let err = resolve("f2fm").transform(&mut ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mapping of field namekey failed with error: Object has no field subkey"
        );
    }
}
