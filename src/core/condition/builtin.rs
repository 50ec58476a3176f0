//! Built-in condition kinds

use super::{Condition, NamedCondition};
use crate::core::request::Request;
use ipnet::IpNet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::IpAddr;

/// Implements `kind` and `options` for a serde-backed condition
macro_rules! persisted_as {
    () => {
        fn kind(&self) -> &str {
            <Self as NamedCondition>::KIND
        }

        fn options(&self) -> Value {
            serde_json::to_value(self).unwrap_or_default()
        }
    };
}

/// Context value is a string equal to `equals`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringEqualCondition {
    pub equals: String,
}

impl StringEqualCondition {
    pub fn new(equals: impl Into<String>) -> Self {
        StringEqualCondition {
            equals: equals.into(),
        }
    }
}

impl Condition for StringEqualCondition {
    persisted_as!();

    fn fulfills(&self, value: Option<&Value>, _request: &Request) -> bool {
        value.and_then(Value::as_str) == Some(self.equals.as_str())
    }
}

impl NamedCondition for StringEqualCondition {
    const KIND: &'static str = "StringEqualCondition";
}

/// Context value is a string the regex `matches` finds a match in
///
/// The expression is not anchored. An invalid expression never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringMatchCondition {
    pub matches: String,
}

impl StringMatchCondition {
    pub fn new(matches: impl Into<String>) -> Self {
        StringMatchCondition {
            matches: matches.into(),
        }
    }
}

impl Condition for StringMatchCondition {
    persisted_as!();

    fn fulfills(&self, value: Option<&Value>, _request: &Request) -> bool {
        let Some(text) = value.and_then(Value::as_str) else {
            return false;
        };
        match Regex::new(&self.matches) {
            Ok(regex) => regex.is_match(text),
            Err(_) => false,
        }
    }
}

impl NamedCondition for StringMatchCondition {
    const KIND: &'static str = "StringMatchCondition";
}

/// Context value is an IP address inside the `cidr` network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidrCondition {
    pub cidr: String,
}

impl CidrCondition {
    pub fn new(cidr: impl Into<String>) -> Self {
        CidrCondition { cidr: cidr.into() }
    }
}

impl Condition for CidrCondition {
    persisted_as!();

    fn fulfills(&self, value: Option<&Value>, _request: &Request) -> bool {
        let Some(ip) = value
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        else {
            return false;
        };
        match self.cidr.parse::<IpNet>() {
            Ok(net) => net.contains(&ip),
            Err(_) => false,
        }
    }
}

impl NamedCondition for CidrCondition {
    const KIND: &'static str = "CIDRCondition";
}

/// Context value names the request subject as owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectIsOwnerCondition {}

impl Condition for SubjectIsOwnerCondition {
    persisted_as!();

    fn fulfills(&self, value: Option<&Value>, request: &Request) -> bool {
        value.and_then(Value::as_str) == Some(request.subject.as_str())
    }
}

impl NamedCondition for SubjectIsOwnerCondition {
    const KIND: &'static str = "SubjectIsOwnerCondition";
}

/// Context value names an owner other than the request subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectIsNotOwnerCondition {}

impl Condition for SubjectIsNotOwnerCondition {
    persisted_as!();

    fn fulfills(&self, value: Option<&Value>, request: &Request) -> bool {
        match value.and_then(Value::as_str) {
            Some(owner) => owner != request.subject,
            None => false,
        }
    }
}

impl NamedCondition for SubjectIsNotOwnerCondition {
    const KIND: &'static str = "SubjectIsNotOwnerCondition";
}

/// Context value is a list of `[a, b]` string pairs, each with `a == b`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringPairsEqualCondition {}

impl Condition for StringPairsEqualCondition {
    persisted_as!();

    fn fulfills(&self, value: Option<&Value>, _request: &Request) -> bool {
        let Some(pairs) = value.and_then(Value::as_array) else {
            return false;
        };
        pairs.iter().all(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([Value::String(a), Value::String(b)]) => a == b,
            _ => false,
        })
    }
}

impl NamedCondition for StringPairsEqualCondition {
    const KIND: &'static str = "StringPairsEqualCondition";
}

/// Context value is a boolean equal to `value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanCondition {
    pub value: bool,
}

impl BooleanCondition {
    pub fn new(value: bool) -> Self {
        BooleanCondition { value }
    }
}

impl Condition for BooleanCondition {
    persisted_as!();

    fn fulfills(&self, value: Option<&Value>, _request: &Request) -> bool {
        value.and_then(Value::as_bool) == Some(self.value)
    }
}

impl NamedCondition for BooleanCondition {
    const KIND: &'static str = "BooleanCondition";
}

/// Request resource contains the context's `value`
///
/// The context value is an object `{"value": "...", "delimiter": "..."}`.
/// With a delimiter, both resource and value are wrapped in it so only whole
/// segments match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContainsCondition {}

impl Condition for ResourceContainsCondition {
    persisted_as!();

    fn fulfills(&self, value: Option<&Value>, request: &Request) -> bool {
        let Some(filter) = value.and_then(Value::as_object) else {
            return false;
        };
        let needle = match filter.get("value").and_then(Value::as_str) {
            Some(needle) if !needle.is_empty() => needle,
            _ => return false,
        };

        match filter.get("delimiter").and_then(Value::as_str) {
            Some(delimiter) => {
                let resource = format!("{delimiter}{}{delimiter}", request.resource);
                resource.contains(&format!("{delimiter}{needle}{delimiter}"))
            }
            None => request.resource.contains(needle),
        }
    }
}

impl NamedCondition for ResourceContainsCondition {
    const KIND: &'static str = "ResourceContainsCondition";
}
