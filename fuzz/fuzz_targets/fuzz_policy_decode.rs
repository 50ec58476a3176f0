#![no_main]
use libfuzzer_sys::fuzz_target;
use warden::{ConditionRegistry, Policy, Request};

// Arbitrary JSON is rejected cleanly or yields a policy that round-trips
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let registry = ConditionRegistry::builtin();
    let Ok(policy) = Policy::from_json(text, &registry) else {
        return;
    };

    let json = policy.to_json().unwrap();
    let restored = Policy::from_json(&json, &registry).unwrap();
    assert_eq!(restored, policy);

    let _ = policy
        .conditions
        .fulfilled_by(&Request::new("peter", "read", "articles:1"));
});
