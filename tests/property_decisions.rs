//! Property-based tests for pattern matching and decision aggregation
//!
//! Uses proptest to check that decisions do not depend on policy order and
//! that literal templates behave like plain string equality

use proptest::prelude::*;
use std::sync::Arc;
use warden::pattern::{self, Delimiters};
use warden::{
    ConditionRegistry, Effect, MemoryStore, Policy, PolicyEngine, Request, Verdict,
};

fn literal() -> impl Strategy<Value = String> {
    // Includes regex metacharacters, excludes the delimiters
    "[a-z0-9.*+?()|\\[\\]{}^$\\\\:/ -]{0,16}"
}

fn arb_policy() -> impl Strategy<Value = (bool, String, String)> {
    (any::<bool>(), "[ab]", "[xy]")
}

proptest! {
    #[test]
    fn prop_literal_template_is_string_equality(template in literal(), candidate in literal()) {
        let compiled = pattern::compile(&template, Delimiters::default()).unwrap();

        prop_assert!(compiled.is_match(&template));
        prop_assert_eq!(compiled.is_match(&candidate), template == candidate);
    }

    #[test]
    fn prop_compilation_is_deterministic(
        prefix in literal(),
        fragment in "[a-z]{1,4}|[0-9]\\+|\\.\\*",
        suffix in literal(),
    ) {
        let template = format!("{prefix}<{fragment}>{suffix}");
        let first = pattern::compile(&template, Delimiters::default()).unwrap();
        let second = pattern::compile(&template, Delimiters::default()).unwrap();

        prop_assert_eq!(first.as_str(), second.as_str());
        prop_assert!(first.as_str().starts_with('^'));
        prop_assert!(first.as_str().ends_with('$'));
    }

    #[test]
    fn prop_verdict_independent_of_policy_order(
        rules in prop::collection::vec(arb_policy(), 0..8),
        action in "[ab]",
        resource in "[xy]",
        seed in any::<u64>(),
    ) {
        let policies: Vec<Policy> = rules
            .iter()
            .enumerate()
            .map(|(i, (allow, action, resource))| {
                let effect = if *allow { Effect::Allow } else { Effect::Deny };
                Policy::new(format!("p{i}"), effect)
                    .actions([action.as_str()])
                    .resources([resource.as_str()])
            })
            .collect();

        let mut reordered = policies.clone();
        let len = reordered.len().max(1);
        reordered.rotate_left((seed as usize) % len);
        reordered.reverse();

        let engine = PolicyEngine::new(Arc::new(MemoryStore::new()));
        let request = Request::new("peter", action.as_str(), resource.as_str());

        let forward = engine.decide_among(&request, &policies).unwrap();
        let backward = engine.decide_among(&request, &reordered).unwrap();
        prop_assert_eq!(forward.is_allowed(), backward.is_allowed());

        // Allowed iff some allow applies and no deny applies
        let applies = |allow: bool| {
            rules.iter().any(|(a, act, res)| *a == allow && *act == action && *res == resource)
        };
        prop_assert_eq!(forward.is_allowed(), applies(true) && !applies(false));
        if applies(false) {
            prop_assert!(
                matches!(forward, Verdict::Denied(warden::DenyReason::ExplicitDeny { .. })),
                "explicit deny expected"
            );
        }
    }

    #[test]
    fn prop_policy_json_round_trip(
        id in "[a-z][a-z0-9-]{0,12}",
        allow in any::<bool>(),
        subjects in prop::collection::vec("[a-z]{1,6}|<[a-z]+>", 0..3),
        actions in prop::collection::vec("[a-z]{1,6}", 1..3),
        resources in prop::collection::vec("[a-z]{1,6}:<[0-9]+>", 0..3),
    ) {
        let effect = if allow { Effect::Allow } else { Effect::Deny };
        let policy = Policy::new(id, effect)
            .subjects(subjects)
            .actions(actions)
            .resources(resources);

        let json = policy.to_json().unwrap();
        let restored = Policy::from_json(&json, &ConditionRegistry::builtin()).unwrap();
        prop_assert_eq!(restored, policy);
    }
}
