//! Rhai script step.
//!
//! Scripts are compiled once when the configuration is parsed. Each execution
//! runs on the blocking pool with a fresh engine, so the `run` callback can
//! block on nested transformers without stalling the async workers.

use super::config::TASK_TYPE;
use crate::config::Fragment;
use crate::registry::{self, Registry};
use crate::task::context::TransformationContext;
use crate::task::transformer::{Error, Transformer, MAX_ALIAS_DEPTH};
use crate::value::Value;
use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Scope, AST};
use std::sync::Arc;
use tokio::runtime::Handle;

pub fn build(
    fragment: &Fragment,
    _registry: &Registry,
) -> Result<Box<dyn Transformer>, registry::Error> {
    let config: super::config::Processor = registry::decode(TASK_TYPE, fragment)?;
    let ast = Engine::new()
        .compile(&config.script)
        .map_err(|e| registry::Error::parse(TASK_TYPE, e))?;
    Ok(Box::new(Processor { ast: Arc::new(ast) }))
}

#[derive(Debug)]
pub struct Processor {
    ast: Arc<AST>,
}

#[async_trait::async_trait]
impl Transformer for Processor {
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error> {
        let ast = Arc::clone(&self.ast);
        let source = value_to_dynamic(&ctx.object);
        let target = value_to_dynamic(&ctx.result);
        let base = ctx.derive(Value::Null, Value::Null);
        let handle = Handle::current();

        let outcome = tokio::task::spawn_blocking(move || {
            let engine = engine(base, handle);
            let mut scope = Scope::new();
            scope.push_dynamic("source", source);
            scope.push_dynamic("target", target);
            engine
                .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
                .and_then(dynamic_to_value)
        })
        .await
        .map_err(|e| Error::leaf(TASK_TYPE, e))?;

        ctx.result = outcome.map_err(|e| Error::leaf(TASK_TYPE, e))?;
        Ok(())
    }
}

/// Creates an engine exposing `run(name, args)` over the context's transformers.
fn engine(base: TransformationContext, handle: Handle) -> Engine {
    let mut engine = Engine::new();
    engine.register_fn("run", move |name: ImmutableString, args: Dynamic| {
        invoke(&base, &handle, name.as_str(), args)
    });
    engine
}

/// Runs a named transformer on a fresh context. Failures are reported to the
/// script as a map with an `error` member.
fn invoke(base: &TransformationContext, handle: &Handle, name: &str, args: Dynamic) -> Dynamic {
    let Some(transformer) = base.transformers.get(name) else {
        return error_map("undefined transformer".to_string());
    };
    if base.depth >= MAX_ALIAS_DEPTH {
        return error_map(Error::RecursionLimit(MAX_ALIAS_DEPTH).to_string());
    }
    let object = match dynamic_to_value(args) {
        Ok(object) => object,
        Err(e) => return error_map(e.to_string()),
    };

    let mut ctx = base.derive(object, Value::empty_map());
    ctx.depth += 1;
    match handle.block_on(transformer.transform(&mut ctx)) {
        Ok(()) => value_to_dynamic(&ctx.result),
        Err(e) => error_map(e.to_string()),
    }
}

fn error_map(message: String) -> Dynamic {
    let mut map = rhai::Map::new();
    map.insert("error".into(), Dynamic::from(message));
    Dynamic::from_map(map)
}

/// Converts a value into a script value. Byte buffers become blobs.
fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Dynamic::from_int(i),
            None => Dynamic::from_float(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Bytes(bytes) => Dynamic::from_blob(bytes.clone()),
        Value::Array(items) => Dynamic::from_array(items.iter().map(value_to_dynamic).collect()),
        Value::Map(map) => Dynamic::from_map(
            map.iter()
                .map(|(k, v)| (k.as_str().into(), value_to_dynamic(v)))
                .collect(),
        ),
    }
}

/// Converts a script value back into a value.
fn dynamic_to_value(value: Dynamic) -> Result<Value, Box<EvalAltResult>> {
    if value.is_blob() {
        return Ok(Value::Bytes(
            value.try_cast::<rhai::Blob>().unwrap_or_default(),
        ));
    }
    if value.is_array() {
        return value
            .try_cast::<rhai::Array>()
            .unwrap_or_default()
            .into_iter()
            .map(dynamic_to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }
    if value.is_map() {
        return value
            .try_cast::<rhai::Map>()
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| dynamic_to_value(v).map(|v| (k.to_string(), v)))
            .collect::<Result<_, _>>()
            .map(Value::Map);
    }
    rhai::serde::from_dynamic::<serde_json::Value>(&value).map(Value::from)
}
