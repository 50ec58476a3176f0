//! Authorization request

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Values conditions inspect, keyed by condition name
pub type Context = HashMap<String, Value>;

/// What is being asked: may `subject` perform `action` on `resource`?
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Resource being accessed (may be empty)
    #[serde(default)]
    pub resource: String,
    pub action: String,
    pub subject: String,
    #[serde(default)]
    pub context: Context,
}

impl Request {
    pub fn new(
        subject: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Request {
            resource: resource.into(),
            action: action.into(),
            subject: subject.into(),
            context: Context::new(),
        }
    }

    /// Add a context value
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
