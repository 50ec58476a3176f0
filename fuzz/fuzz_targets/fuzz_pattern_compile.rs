#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use warden::pattern::{compile, Delimiters};

#[derive(Debug, Arbitrary)]
struct Input {
    template: String,
    candidate: String,
    start: char,
    end: char,
}

fuzz_target!(|input: Input| {
    // Any template either compiles or errors, never panics
    if let Ok(pattern) = compile(&input.template, Delimiters::default()) {
        let _ = pattern.is_match(&input.candidate);
        assert!(pattern.as_str().starts_with('^'));
    }

    // Templates without delimiters are exact matches
    if !input.template.contains(['<', '>']) {
        let pattern = compile(&input.template, Delimiters::default()).unwrap();
        assert!(pattern.is_match(&input.template));
        assert_eq!(
            pattern.is_match(&input.candidate),
            input.template == input.candidate
        );
    }

    let result = compile(&input.template, Delimiters::new(input.start, input.end));
    if input.start == input.end {
        assert!(result.is_err());
    }
});
