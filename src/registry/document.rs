//! Persisted configuration document
//!
//! On disk the document is `base64(json)` where the JSON is
//! `{"targets": [<target config>, ...]}`. Entries are kept as raw values so
//! one malformed entry can be skipped without losing the others.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Ordered list of target configuration records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigDocument {
    pub targets: Vec<Value>,
}

impl ConfigDocument {
    pub fn new(targets: Vec<Value>) -> Self {
        Self { targets }
    }

    /// Encode into the stored blob format
    pub fn encode(&self) -> Result<Bytes> {
        let json = serde_json::to_vec(self)
            .map_err(|e| Error::MalformedDocument(format!("encode: {}", e)))?;
        Ok(Bytes::from(STANDARD.encode(json)))
    }

    /// Decode a stored blob
    ///
    /// A root that is not an object is malformed. A missing or non-array
    /// `targets` member yields an empty document.
    pub fn decode(blob: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(blob)
            .map_err(|e| Error::MalformedDocument(format!("not text: {}", e)))?;

        let json = STANDARD
            .decode(text.trim())
            .map_err(|e| Error::MalformedDocument(format!("base64: {}", e)))?;

        let root: Value = serde_json::from_slice(&json)
            .map_err(|e| Error::MalformedDocument(format!("json: {}", e)))?;

        let Value::Object(mut root) = root else {
            return Err(Error::MalformedDocument("root is not an object".into()));
        };

        let targets = match root.remove("targets") {
            Some(Value::Array(targets)) => targets,
            Some(other) => {
                tracing::warn!(found = %other, "Document targets is not an array, ignoring");
                Vec::new()
            }
            None => Vec::new(),
        };

        Ok(Self { targets })
    }
}
