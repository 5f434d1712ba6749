//! Task status snapshots returned by the service.

use std::num::FpCategory;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One status poll result.
///
/// Only `completed` and `error` drive the polling loop; every other field the
/// service sends is kept in [`StatusReport::extra`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Whether the task reached a terminal state.
    ///
    /// Any JSON value is accepted; `null`, `false`, `0` and `""` read as false.
    #[serde(default, deserialize_with = "deserialize_truthy")]
    pub completed: bool,

    /// Raw error value. Use [`StatusReport::error_message`] to interpret it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    /// Service-defined fields (progress, timings, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lifecycle state derived from a [`StatusReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet observed as completed.
    Pending,
    /// Completed without error.
    Succeeded,
    /// Completed and the service reported an error.
    Failed(String),
}

impl StatusReport {
    /// Returns the error message if the report carries a non-empty error.
    ///
    /// `null`, `false`, `0` and `""` count as no error.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref().filter(|value| is_truthy(value))?;
        match error {
            Value::String(message) => Some(message.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Classifies the report into a [`TaskState`].
    #[must_use]
    pub fn state(&self) -> TaskState {
        if !self.completed {
            return TaskState::Pending;
        }
        match self.error_message() {
            Some(message) => TaskState::Failed(message),
            None => TaskState::Succeeded,
        }
    }
}

/// Loose truthiness used by the service for its status flags.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => !number
            .as_f64()
            .is_some_and(|n| matches!(n.classify(), FpCategory::Zero | FpCategory::Nan)),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn deserialize_truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| is_truthy(&value))
}
