//! JSON encoding and decoding of byte payloads.

use super::config::{Format, TASK_TYPE};
use crate::config::Fragment;
use crate::registry::{self, Registry};
use crate::task::context::TransformationContext;
use crate::task::transformer::{Error, Transformer};
use crate::value::Value;

pub fn build(
    fragment: &Fragment,
    _registry: &Registry,
) -> Result<Box<dyn Transformer>, registry::Error> {
    let config: super::config::Processor = registry::decode(TASK_TYPE, fragment)?;
    Ok(Box::new(Processor {
        format: config.format,
    }))
}

#[derive(Debug)]
pub struct Processor {
    format: Format,
}

/// Decodes a JSON document whose root is a mapping or, failing that, an array.
fn decode(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    match serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(bytes) {
        Ok(map) => Ok(Value::from(serde_json::Value::Object(map))),
        Err(_) => serde_json::from_slice::<Vec<serde_json::Value>>(bytes)
            .map(|items| Value::from(serde_json::Value::Array(items))),
    }
}

#[async_trait::async_trait]
impl Transformer for Processor {
    async fn transform(&self, ctx: &mut TransformationContext) -> Result<(), Error> {
        ctx.result = match self.format {
            Format::FromBytes => {
                let bytes = match &ctx.object {
                    Value::Bytes(bytes) => bytes.as_slice(),
                    Value::String(text) => text.as_bytes(),
                    other => return Err(Error::object_type("bytes", other.kind())),
                };
                decode(bytes).map_err(|e| Error::leaf(TASK_TYPE, e))?
            }
            Format::ToBytes => {
                let bytes = serde_json::to_vec(&ctx.object.to_json())
                    .map_err(|e| Error::leaf(TASK_TYPE, e))?;
                Value::Bytes(bytes)
            }
        };
        Ok(())
    }
}
