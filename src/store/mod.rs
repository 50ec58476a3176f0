//! Policy storage
//!
//! The engine only needs [`PolicyStore::find_policies_for_subject`]; the rest
//! of the trait is the operator surface for managing policies. Every store
//! follows the same rules:
//! - `create` validates the policy and fails with `Conflict` on a duplicate id
//! - `get` fails with `NotFound` when the id is absent
//! - `delete` of an absent id is a no-op
//! - `find_policies_for_subject` may over-return; the engine re-filters

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::core::pattern;
use crate::core::policy::Policy;
use crate::error::Result;

/// Storage backend for policies
///
/// Implementations must be safe for concurrent use; the engine calls
/// `find_policies_for_subject` from many threads at once.
pub trait PolicyStore: Send + Sync {
    /// Store a new policy
    fn create(&self, policy: Policy) -> Result<()>;

    /// Retrieve a policy by id
    fn get(&self, id: &str) -> Result<Policy>;

    /// Remove a policy; succeeds when the id is absent
    fn delete(&self, id: &str) -> Result<()>;

    /// Policies relevant to `subject`, including those with no subjects
    fn find_policies_for_subject(&self, subject: &str) -> Result<Vec<Policy>>;

    /// Every stored policy, ordered by id
    fn list(&self) -> Result<Vec<Policy>>;
}

/// Subject filter shared by stores that match in process
///
/// A policy whose subject templates fail to compile is kept so the engine
/// reports the error instead of the policy silently disappearing.
pub(crate) fn concerns_subject(policy: &Policy, subject: &str) -> bool {
    policy.subjects.is_empty()
        || pattern::match_any(&policy.subjects, policy.delimiters, subject).unwrap_or(true)
}
