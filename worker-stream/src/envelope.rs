//! Structured reply envelope
//!
//! Wire shape is a JSON object carrying a `result` key or an `error` key. Key
//! presence decides the variant, so `{"result": null}` is a result.

use serde_json::{Map, Value};

const RESULT_KEY: &str = "result";
const ERROR_KEY: &str = "error";

/// Reply posted by an envelope-framed worker
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Result(Value),
    Error(Value),
}

impl Envelope {
    /// Parse a raw message. Returns `None` for messages with neither marker.
    ///
    /// The error marker wins when both are present.
    pub fn parse(message: Value) -> Option<Self> {
        let Value::Object(mut fields) = message else {
            return None;
        };

        if let Some(error) = fields.remove(ERROR_KEY) {
            return Some(Self::Error(error));
        }

        fields.remove(RESULT_KEY).map(Self::Result)
    }

    /// Encode into the wire shape
    pub fn into_value(self) -> Value {
        let mut fields = Map::with_capacity(1);
        match self {
            Self::Result(value) => fields.insert(RESULT_KEY.to_string(), value),
            Self::Error(value) => fields.insert(ERROR_KEY.to_string(), value),
        };
        Value::Object(fields)
    }
}
