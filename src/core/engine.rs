//! Policy evaluation engine with deny precedence
//!
//! Decides whether a request is allowed by evaluating every candidate policy
//! the store returns for the request subject.
//! Key features:
//! - Explicit deny takes precedence over allow
//! - Fail-closed: nothing matching means denied
//! - Malformed patterns abort the decision instead of being skipped
//! - Optional compiled-pattern cache

use super::cache::PatternCache;
use super::pattern::{self, Delimiters};
use super::policy::{Effect, Policy};
use super::request::Request;
use crate::error::{Result, WardenError};
use crate::store::PolicyStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why a request was denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenyReason {
    /// A matching policy with effect deny
    ExplicitDeny { policy: String },
    /// No matching policy with effect allow
    NoMatchingAllow,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::ExplicitDeny { policy } => {
                write!(f, "explicitly denied by policy '{}'", policy)
            }
            DenyReason::NoMatchingAllow => write!(f, "no matching allow policy"),
        }
    }
}

/// Outcome of a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(DenyReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }
}

/// Reduction of matching policies into a verdict
///
/// Tracks "allowed by" and "denied by" independently so the result does not
/// depend on the order policies were recorded in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    allowed_by: Option<String>,
    denied_by: Option<String>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a policy that matched the request
    pub fn record(&mut self, policy_id: &str, effect: Effect) {
        let slot = match effect {
            Effect::Allow => &mut self.allowed_by,
            Effect::Deny => &mut self.denied_by,
        };
        if slot.is_none() {
            *slot = Some(policy_id.to_string());
        }
    }

    /// True once a deny matched; further policies cannot change the verdict
    pub fn is_settled(&self) -> bool {
        self.denied_by.is_some()
    }

    pub fn verdict(&self) -> Verdict {
        match (&self.denied_by, &self.allowed_by) {
            (Some(policy), _) => Verdict::Denied(DenyReason::ExplicitDeny {
                policy: policy.clone(),
            }),
            (None, Some(_)) => Verdict::Allowed,
            (None, None) => Verdict::Denied(DenyReason::NoMatchingAllow),
        }
    }
}

/// Decides whether a subject may perform an action on a resource
pub trait Warden: Send + Sync {
    /// `Ok(())` when allowed, `Err(WardenError::Forbidden)` when denied,
    /// any other error when the decision could not be made
    ///
    /// ```
    /// use std::sync::Arc;
    /// use warden::{MemoryStore, Policy, PolicyEngine, Request, Warden};
    ///
    /// let store = MemoryStore::with_policies(vec![
    ///     Policy::allow("p1").subjects(["peter"]).actions(["<.*>"]),
    /// ]).unwrap();
    /// let engine = PolicyEngine::new(Arc::new(store));
    ///
    /// assert!(engine.is_allowed(&Request::new("peter", "delete", "")).is_ok());
    /// let err = engine.is_allowed(&Request::new("ken", "delete", "")).unwrap_err();
    /// assert!(err.is_forbidden());
    /// ```
    fn is_allowed(&self, request: &Request) -> Result<()>;
}

/// Policy evaluation engine
pub struct PolicyEngine {
    store: Arc<dyn PolicyStore>,
    cache: Option<PatternCache>,
}

impl PolicyEngine {
    /// Create an engine over `store` without a pattern cache
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        PolicyEngine { store, cache: None }
    }

    /// Create an engine caching up to `capacity` compiled patterns
    pub fn with_pattern_cache(store: Arc<dyn PolicyStore>, capacity: usize) -> Self {
        PolicyEngine {
            store,
            cache: PatternCache::new(capacity),
        }
    }

    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        &self.store
    }

    pub fn pattern_cache(&self) -> Option<&PatternCache> {
        self.cache.as_ref()
    }

    /// Decide a request
    ///
    /// Store failures and malformed patterns are returned as errors, never
    /// folded into a denial.
    pub fn decide(&self, request: &Request) -> Result<Verdict> {
        let candidates = self.store.find_policies_for_subject(&request.subject)?;
        debug!(
            "Evaluating {} candidate policies for subject '{}', action '{}', resource '{}'",
            candidates.len(),
            request.subject,
            request.action,
            request.resource
        );
        self.decide_among(request, &candidates)
    }

    /// Decide a request against an explicit candidate set
    pub fn decide_among(&self, request: &Request, candidates: &[Policy]) -> Result<Verdict> {
        let mut tally = Tally::new();

        for policy in candidates {
            if !self.applies(policy, request)? {
                continue;
            }
            tally.record(&policy.id, policy.effect);
            if tally.is_settled() {
                break;
            }
        }

        let verdict = tally.verdict();
        if let Verdict::Denied(DenyReason::ExplicitDeny { policy }) = &verdict {
            warn!(
                "Subject '{}' denied '{}' on '{}' by policy '{}'",
                request.subject, request.action, request.resource, policy
            );
        }
        Ok(verdict)
    }

    /// Check if a policy applies to a request: action, subject, resource and
    /// conditions all match
    pub fn applies(&self, policy: &Policy, request: &Request) -> Result<bool> {
        if !self.match_any(&policy.actions, policy.delimiters, &request.action)? {
            return Ok(false);
        }

        // An empty subject list applies to every subject
        if !policy.subjects.is_empty()
            && !self.match_any(&policy.subjects, policy.delimiters, &request.subject)?
        {
            debug!("Policy '{}' skipped: subject mismatch", policy.id);
            return Ok(false);
        }

        // A policy without resources only applies to requests without one
        let resource_free = request.resource.is_empty() && policy.resources.is_empty();
        if !resource_free
            && !self.match_any(&policy.resources, policy.delimiters, &request.resource)?
        {
            debug!("Policy '{}' skipped: resource mismatch", policy.id);
            return Ok(false);
        }

        if !policy.conditions.fulfilled_by(request) {
            debug!("Policy '{}' skipped: conditions not fulfilled", policy.id);
            return Ok(false);
        }

        Ok(true)
    }

    fn match_any(&self, templates: &[String], delimiters: Delimiters, candidate: &str) -> Result<bool> {
        match &self.cache {
            Some(cache) => cache.match_any(templates, delimiters, candidate),
            None => pattern::match_any(templates, delimiters, candidate),
        }
    }
}

impl Warden for PolicyEngine {
    fn is_allowed(&self, request: &Request) -> Result<()> {
        match self.decide(request)? {
            Verdict::Allowed => Ok(()),
            Verdict::Denied(reason) => Err(WardenError::Forbidden { reason }),
        }
    }
}

impl fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
