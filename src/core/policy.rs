//! Policy document structure
//!
//! A policy grants or denies a set of actions to a set of subjects on a set
//! of resources, optionally restricted by conditions. Subjects, actions and
//! resources are templates (see [`crate::pattern`]).

use super::condition::{ConditionRegistry, Conditions};
use super::pattern::{compile, Delimiters};
use crate::error::{Result, WardenError};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Effect of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action (takes precedence over Allow)
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }
}

impl std::str::FromStr for Effect {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            other => Err(WardenError::InvalidPolicy(format!(
                "effect must be 'allow' or 'deny', got '{}'",
                other
            ))),
        }
    }
}

/// A single access policy
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub id: String,
    pub description: String,
    /// Subject templates; an empty list applies to every subject
    pub subjects: Vec<String>,
    /// Resource templates; an empty list only applies to requests without a resource
    pub resources: Vec<String>,
    pub actions: Vec<String>,
    pub effect: Effect,
    pub conditions: Conditions,
    pub delimiters: Delimiters,
}

impl Policy {
    /// Create an empty policy with the given effect
    pub fn new(id: impl Into<String>, effect: Effect) -> Self {
        Policy {
            id: id.into(),
            description: String::new(),
            subjects: Vec::new(),
            resources: Vec::new(),
            actions: Vec::new(),
            effect,
            conditions: Conditions::new(),
            delimiters: Delimiters::default(),
        }
    }

    pub fn allow(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Allow)
    }

    pub fn deny(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Deny)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    pub fn resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }

    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn delimiters(mut self, start: char, end: char) -> Self {
        self.delimiters = Delimiters::new(start, end);
        self
    }

    /// True if the effect is allow
    pub fn allows_access(&self) -> bool {
        self.effect == Effect::Allow
    }

    /// Validate policy structure and that every template compiles
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(WardenError::InvalidPolicy(
                "policy id cannot be empty".to_string(),
            ));
        }
        if self.actions.is_empty() {
            return Err(WardenError::InvalidPolicy(format!(
                "policy '{}' has no actions",
                self.id
            )));
        }

        let templates = self
            .subjects
            .iter()
            .chain(&self.actions)
            .chain(&self.resources);
        for template in templates {
            if template.is_empty() {
                return Err(WardenError::InvalidPolicy(format!(
                    "policy '{}' contains an empty pattern",
                    self.id
                )));
            }
            compile(template, self.delimiters)?;
        }

        self.conditions.validate()
    }

    /// Persisted form of this policy
    pub fn to_record(&self) -> PolicyRecord {
        PolicyRecord {
            id: self.id.clone(),
            description: self.description.clone(),
            effect: self.effect,
            subjects: self.subjects.clone(),
            resources: self.resources.clone(),
            actions: self.actions.clone(),
            conditions: self.conditions.to_records(),
            delimiters: Some(self.delimiters).filter(|d| !d.is_default()),
        }
    }

    /// Rebuild a policy, decoding conditions through `registry`
    pub fn from_record(record: PolicyRecord, registry: &ConditionRegistry) -> Result<Self> {
        let conditions = registry.decode_all(&record.conditions)?;
        Ok(Policy {
            id: record.id,
            description: record.description,
            subjects: record.subjects,
            resources: record.resources,
            actions: record.actions,
            effect: record.effect,
            conditions,
            delimiters: record.delimiters.unwrap_or_default(),
        })
    }

    /// Parse policy from JSON string
    pub fn from_json(json: &str, registry: &ConditionRegistry) -> Result<Self> {
        let record: PolicyRecord = serde_json::from_str(json)?;
        Self::from_record(record, registry)
    }

    /// Serialize policy to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Serialize for Policy {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// Serialized policy, conditions kept as raw `{"type": ...}` records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub effect: Effect,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub conditions: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiters: Option<Delimiters>,
}
