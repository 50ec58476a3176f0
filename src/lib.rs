//! # Warden - Policy-Based Authorization
//!
//! `warden-rs` decides whether a subject may perform an action on a resource
//! by evaluating stored policies:
//!
//! - **Templated patterns**: literals mixed with `<regex>` fragments, always
//!   matched against the whole string
//! - **Deny overrides allow**: one matching deny policy wins
//! - **Fail-closed**: no matching allow policy means denied
//! - **Pluggable conditions**: CIDR ranges, ownership, string and boolean
//!   checks, plus any kind registered by the application
//! - **Storage adapters**: in-memory and SQLite behind [`PolicyStore`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use warden::{
//!     CidrCondition, Conditions, MemoryStore, Policy, PolicyEngine, PolicyStore, Request,
//!     Result, Warden,
//! };
//!
//! # fn main() -> Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! store.create(
//!     Policy::allow("editors")
//!         .subjects(["<.+>@editors"])
//!         .actions(["<create|update>"])
//!         .resources(["articles:<[0-9]+>"])
//!         .conditions(Conditions::new().with("ip", CidrCondition::new("10.0.0.0/8"))),
//! )?;
//! store.create(
//!     Policy::deny("frozen")
//!         .actions(["<.*>"])
//!         .resources(["articles:1"]),
//! )?;
//!
//! let engine = PolicyEngine::new(store);
//!
//! let request = Request::new("ann@editors", "update", "articles:7").with_context("ip", "10.1.2.3");
//! assert!(engine.is_allowed(&request).is_ok());
//!
//! let request = Request::new("ann@editors", "update", "articles:1").with_context("ip", "10.1.2.3");
//! assert!(engine.is_allowed(&request).unwrap_err().is_forbidden());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod store;

pub use crate::core::{cache, condition, engine, pattern, policy, request};

pub use crate::config::{EngineConfig, PolicyEngineBuilder, StoreConfig};
pub use crate::core::{
    cache::PatternCache,
    condition::{
        BooleanCondition, CidrCondition, Condition, ConditionRegistry, Conditions,
        NamedCondition, ResourceContainsCondition, StringEqualCondition, StringMatchCondition,
        StringPairsEqualCondition, SubjectIsNotOwnerCondition, SubjectIsOwnerCondition,
    },
    engine::{DenyReason, PolicyEngine, Tally, Verdict, Warden},
    pattern::{CompiledPattern, Delimiters},
    policy::{Effect, Policy, PolicyRecord},
    request::{Context, Request},
};
pub use crate::error::{Result, WardenError};
pub use crate::store::{MemoryStore, PolicyStore, SqliteStore};
