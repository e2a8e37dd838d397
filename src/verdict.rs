//! The uniform outcome of every verification call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of checking one answer against one set of task parameters.
///
/// A fresh value is produced per call; two calls with identical inputs
/// produce equal results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the answer satisfies the task.
    pub verified: bool,
    /// Human-readable explanation of the outcome.
    pub message: String,
    /// Problem-specific witness values recomputed by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed: Option<Value>,
}

impl VerificationResult {
    /// A successful verification.
    pub fn accept(message: impl Into<String>) -> Self {
        Self {
            verified: true,
            message: message.into(),
            computed: None,
        }
    }

    /// A rejected answer or malformed input.
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            message: message.into(),
            computed: None,
        }
    }

    /// Attaches recomputed witness data.
    pub fn with_computed(mut self, computed: Value) -> Self {
        self.computed = Some(computed);
        self
    }
}

/// Encodes an integer as a JSON number when it fits in `u64`, otherwise as
/// a decimal string so no precision is lost.
pub(crate) fn int_value(value: u128) -> Value {
    match u64::try_from(value) {
        Ok(small) => Value::from(small),
        Err(_) => Value::String(value.to_string()),
    }
}
