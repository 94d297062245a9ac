use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a command reports back to the CLI: a one-line message for humans
/// and a JSON `details` object for `--json` consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    /// The caller must fix something (a missing marker, a bad argument).
    UserError,
    Failure,
}

impl ExecutionOutcome {
    fn new(status: CommandStatus, message: impl Into<String>, details: Value) -> Self {
        Self {
            status,
            message: message.into(),
            details,
        }
    }

    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self::new(CommandStatus::Ok, message, details)
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self::new(CommandStatus::UserError, message, details)
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self::new(CommandStatus::Failure, message, details)
    }

    /// Adds `key` to `details`, turning non-object details into an object.
    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        if !self.details.is_object() {
            self.details = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.details {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.status {
            CommandStatus::Ok => 0,
            CommandStatus::UserError => 1,
            CommandStatus::Failure => 2,
        }
    }
}
