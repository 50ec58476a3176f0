//! Decision core: patterns, conditions, policies and the evaluation engine

pub mod cache;
pub mod condition;
pub mod engine;
pub mod pattern;
pub mod policy;
pub mod request;
