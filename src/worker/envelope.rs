//! Worker result protocol.
//!
//! A unit reports by printing one JSON object as its last JSON line on
//! stdout, e.g. `{"status": "completed", "result": {...}}`. The exit code
//! decides success; the object only carries data.

use serde_json::Value;

/// Parsed result object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultEnvelope {
    pub result: Value,
    pub error: Option<String>,
}

impl ResultEnvelope {
    /// Parse a result line. Missing or malformed lines yield an empty envelope.
    #[must_use]
    pub fn parse(line: Option<&str>) -> Self {
        let Some(Value::Object(mut object)) = line.and_then(|l| serde_json::from_str::<Value>(l).ok())
        else {
            return Self::default();
        };

        let error = object
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        let result = match object.remove("result") {
            Some(result) => result,
            None => Value::Object(object),
        };
        Self { result, error }
    }
}

/// True if `line` looks like a JSON object line worth keeping.
#[must_use]
pub fn is_result_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('{') && trimmed.ends_with('}')
}
