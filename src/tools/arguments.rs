//! Typed access to tool call arguments.

use crate::error::EcoError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse the JSON-encoded argument string a provider sent.
    ///
    /// An empty string means "no arguments" and parses as `{}`.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(serde_json::json!({})));
        }
        serde_json::from_str(trimmed).map(Self::new)
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, EcoError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| EcoError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get the arguments as a JSON object.
    pub fn as_object(&self) -> Result<&serde_json::Map<String, serde_json::Value>, EcoError> {
        self.value
            .as_object()
            .ok_or_else(|| EcoError::InvalidArgument("Arguments must be a JSON object".into()))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, EcoError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            EcoError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
