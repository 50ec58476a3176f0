//! Condition evaluation for policies
//!
//! A policy carries a set of named conditions. The name is the key of the
//! request context value the condition inspects, e.g. a condition named `ip`
//! reads `request.context["ip"]`. Every condition must be fulfilled for the
//! policy to apply.
//!
//! Conditions persist as `{"type": "<kind>", ...fields}` records and are
//! rebuilt through a [`ConditionRegistry`], so new kinds can be registered
//! by the embedding application. The `type` field name is reserved for the
//! tag; a condition whose options use it is rejected by [`Conditions::validate`].

mod builtin;

pub use builtin::{
    BooleanCondition, CidrCondition, ResourceContainsCondition, StringEqualCondition,
    StringMatchCondition, StringPairsEqualCondition, SubjectIsNotOwnerCondition,
    SubjectIsOwnerCondition,
};

use super::request::Request;
use crate::error::{Result, WardenError};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Record field holding the condition kind
const TYPE_FIELD: &str = "type";

/// A predicate over a request
///
/// `fulfills` must be total: a missing or malformed context value yields
/// `false`, never a panic or an error.
pub trait Condition: fmt::Debug + Send + Sync {
    /// Type tag used when persisting
    fn kind(&self) -> &str;

    /// Type-specific fields, persisted next to the type tag
    fn options(&self) -> Value;

    /// Evaluate against the context value stored under this condition's name
    fn fulfills(&self, value: Option<&Value>, request: &Request) -> bool;
}

/// A condition that can be rebuilt from its persisted fields
pub trait NamedCondition: Condition + DeserializeOwned + Sized + 'static {
    const KIND: &'static str;
}

type Factory = Box<dyn Fn(Value) -> Result<Arc<dyn Condition>> + Send + Sync>;

/// Maps condition type tags to constructors
pub struct ConditionRegistry {
    factories: HashMap<String, Factory>,
}

impl ConditionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        ConditionRegistry {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in condition kind
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register::<StringEqualCondition>()
            .register::<StringMatchCondition>()
            .register::<CidrCondition>()
            .register::<SubjectIsOwnerCondition>()
            .register::<SubjectIsNotOwnerCondition>()
            .register::<StringPairsEqualCondition>()
            .register::<BooleanCondition>()
            .register::<ResourceContainsCondition>();
        registry
    }

    /// Register a condition kind, replacing any previous one with the same tag
    pub fn register<C: NamedCondition>(&mut self) -> &mut Self {
        self.factories.insert(
            C::KIND.to_string(),
            Box::new(|options: Value| -> Result<Arc<dyn Condition>> {
                let condition: C = serde_json::from_value(options)?;
                Ok(Arc::new(condition) as Arc<dyn Condition>)
            }),
        );
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Rebuild one condition from its `{"type": ..., ...}` record
    pub fn decode(&self, record: &Value) -> Result<Arc<dyn Condition>> {
        let mut fields = match record {
            Value::Object(map) => map.clone(),
            _ => {
                return Err(WardenError::InvalidPolicy(
                    "condition record must be an object".to_string(),
                ))
            }
        };

        let kind = match fields.remove(TYPE_FIELD) {
            Some(Value::String(kind)) => kind,
            _ => {
                return Err(WardenError::InvalidPolicy(format!(
                    "condition record is missing a string '{}' field",
                    TYPE_FIELD
                )))
            }
        };

        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| WardenError::UnknownCondition(kind.clone()))?;
        factory(Value::Object(fields))
    }

    /// Rebuild a whole condition set
    pub fn decode_all(&self, records: &BTreeMap<String, Value>) -> Result<Conditions> {
        let mut conditions = Conditions::new();
        for (name, record) in records {
            conditions.0.insert(name.clone(), self.decode(record)?);
        }
        Ok(conditions)
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("ConditionRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

/// Named conditions attached to a policy
#[derive(Clone, Default)]
pub struct Conditions(BTreeMap<String, Arc<dyn Condition>>);

impl Conditions {
    pub fn new() -> Self {
        Conditions(BTreeMap::new())
    }

    /// Add a condition under `name` (builder style)
    pub fn with(mut self, name: impl Into<String>, condition: impl Condition + 'static) -> Self {
        self.insert(name, Arc::new(condition));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, condition: Arc<dyn Condition>) {
        self.0.insert(name.into(), condition);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Condition>> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn Condition>)> {
        self.0.iter()
    }

    /// True when every condition is fulfilled; vacuously true when empty
    pub fn fulfilled_by(&self, request: &Request) -> bool {
        self.0
            .iter()
            .all(|(name, condition)| condition.fulfills(request.context.get(name), request))
    }

    /// Reject conditions that cannot be persisted and rebuilt
    ///
    /// Options must be an object without a `type` field.
    pub fn validate(&self) -> Result<()> {
        for (name, condition) in &self.0 {
            match condition.options() {
                Value::Object(fields) if !fields.contains_key(TYPE_FIELD) => {}
                Value::Object(_) => {
                    return Err(WardenError::InvalidPolicy(format!(
                        "condition '{}' ({}) uses the reserved '{}' field",
                        name,
                        condition.kind(),
                        TYPE_FIELD
                    )))
                }
                _ => {
                    return Err(WardenError::InvalidPolicy(format!(
                        "condition '{}' ({}) options must be an object",
                        name,
                        condition.kind()
                    )))
                }
            }
        }
        Ok(())
    }

    /// Persisted form: name -> `{"type": ..., ...fields}`
    pub fn to_records(&self) -> BTreeMap<String, Value> {
        self.0
            .iter()
            .map(|(name, condition)| (name.clone(), to_record(condition.as_ref())))
            .collect()
    }
}

fn to_record(condition: &dyn Condition) -> Value {
    let mut record = match condition.options() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    record.insert(
        TYPE_FIELD.to_string(),
        Value::String(condition.kind().to_string()),
    );
    Value::Object(record)
}

impl fmt::Debug for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl PartialEq for Conditions {
    fn eq(&self, other: &Self) -> bool {
        self.to_records() == other.to_records()
    }
}

impl Serialize for Conditions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, condition) in &self.0 {
            map.serialize_entry(name, &to_record(condition.as_ref()))?;
        }
        map.end()
    }
}
