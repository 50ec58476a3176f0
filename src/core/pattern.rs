//! Templated pattern matching for policy subjects, actions and resources
//!
//! A template mixes literal text with regular expression fragments enclosed
//! in a delimiter pair (`<` and `>` by default):
//! - `peter` - matches exactly `peter`
//! - `article:<[0-9]+>` - matches `article:12`, not `article:12a`
//! - `resource:<.+>:articles` - matches `resource:anything:articles`
//!
//! The compiled expression is always anchored at both ends.

use crate::error::{Result, WardenError};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Delimiter pair marking the start and end of a regex fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Delimiters {
    pub start: char,
    pub end: char,
}

impl Delimiters {
    pub fn new(start: char, end: char) -> Self {
        Delimiters { start, end }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            start: '<',
            end: '>',
        }
    }
}

/// A template compiled into an anchored regular expression
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Check if the whole candidate matches
    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// The template this pattern was compiled from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The compiled regular expression source, including anchors
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Compile a template into a matcher
///
/// # Examples
/// ```
/// use warden::pattern::{compile, Delimiters};
///
/// let pattern = compile("article:<[0-9]+>", Delimiters::default()).unwrap();
/// assert!(pattern.is_match("article:12"));
/// assert!(!pattern.is_match("article:12a"));
/// ```
pub fn compile(template: &str, delimiters: Delimiters) -> Result<CompiledPattern> {
    let source = to_regex_source(template, delimiters)?;
    let regex = Regex::new(&source).map_err(|e| compile_error(template, e.to_string()))?;

    Ok(CompiledPattern {
        template: template.to_string(),
        regex,
    })
}

/// Check a candidate against a list of templates
///
/// Returns `true` on the first template that matches and stops there.
/// A template that fails to compile before a match is found is an error,
/// never a silent skip.
pub fn match_any(templates: &[String], delimiters: Delimiters, candidate: &str) -> Result<bool> {
    for template in templates {
        if compile(template, delimiters)?.is_match(candidate) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Translate a template into anchored regex source
fn to_regex_source(template: &str, delimiters: Delimiters) -> Result<String> {
    if delimiters.start == delimiters.end {
        return Err(compile_error(
            template,
            format!("start and end delimiter are both '{}'", delimiters.start),
        ));
    }

    let mut source = String::with_capacity(template.len() + 8);
    source.push('^');

    let mut depth = 0usize;
    let mut literal_start = 0usize;
    let mut fragment_start = 0usize;

    for (idx, ch) in template.char_indices() {
        if ch == delimiters.start {
            depth += 1;
            if depth == 1 {
                source.push_str(&regex::escape(&template[literal_start..idx]));
                fragment_start = idx + ch.len_utf8();
            }
        } else if ch == delimiters.end {
            if depth == 0 {
                return Err(compile_error(
                    template,
                    format!("unbalanced '{}' at byte {}", ch, idx),
                ));
            }
            depth -= 1;
            if depth == 0 {
                source.push('(');
                source.push_str(&template[fragment_start..idx]);
                source.push(')');
                literal_start = idx + ch.len_utf8();
            }
        }
    }

    if depth != 0 {
        return Err(compile_error(
            template,
            format!("unterminated '{}'", delimiters.start),
        ));
    }

    source.push_str(&regex::escape(&template[literal_start..]));
    source.push('$');
    Ok(source)
}

fn compile_error(template: &str, reason: String) -> WardenError {
    WardenError::Compile {
        pattern: template.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(template: &str, candidate: &str) -> bool {
        compile(template, Delimiters::default())
            .unwrap()
            .is_match(candidate)
    }

    #[test]
    fn test_literal_match() {
        assert!(matches("peter", "peter"));
        assert!(!matches("peter", "Peter"));
        assert!(!matches("peter", "peter2"));
        assert!(!matches("peter", "xpeter"));
    }

    #[test]
    fn test_literal_metacharacters_escaped() {
        assert!(matches("files/a.txt", "files/a.txt"));
        assert!(!matches("files/a.txt", "files/aXtxt"));
        assert!(matches("cost(1+1)*", "cost(1+1)*"));
    }

    #[test]
    fn test_fragment_match() {
        assert!(matches("article:<[0-9]+>", "article:12"));
        assert!(!matches("article:<[0-9]+>", "article:12a"));
        assert!(!matches("article:<[0-9]+>", "article:"));
        assert!(matches("resource:<.+>:articles", "resource:blog:articles"));
        assert!(!matches("resource:<.+>:articles", "resource:blog:articles:1"));
    }

    #[test]
    fn test_alternation_stays_inside_fragment() {
        assert!(matches("users:<alice|bob>", "users:alice"));
        assert!(matches("users:<alice|bob>", "users:bob"));
        assert!(!matches("users:<alice|bob>", "alice"));
        assert!(!matches("users:<alice|bob>", "users:alice:x"));
    }

    #[test]
    fn test_multiple_fragments() {
        let template = "<[a-z]+>/<[0-9]+>";
        assert!(matches(template, "articles/12"));
        assert!(!matches(template, "articles/x"));
        assert!(!matches(template, "Articles/12"));
    }

    #[test]
    fn test_nested_delimiters_kept_in_fragment() {
        // Inner pair is regex text, here a named group
        assert!(matches("id:<(?P<num>[0-9]+)>", "id:42"));
        assert!(!matches("id:<(?P<num>[0-9]+)>", "id:x"));
    }

    #[test]
    fn test_custom_delimiters() {
        let pattern = compile("article:{[0-9]+}", Delimiters::new('{', '}')).unwrap();
        assert!(pattern.is_match("article:7"));
        assert!(!pattern.is_match("article:{[0-9]+}"));

        // Default delimiters are plain literals under a custom pair
        let pattern = compile("a<b>", Delimiters::new('{', '}')).unwrap();
        assert!(pattern.is_match("a<b>"));
    }

    #[test]
    fn test_unbalanced_delimiters() {
        assert!(compile("article:<[0-9]+", Delimiters::default()).is_err());
        assert!(compile("article:[0-9]+>", Delimiters::default()).is_err());
        assert!(compile("<<a>", Delimiters::default()).is_err());
    }

    #[test]
    fn test_invalid_fragment_regex() {
        let err = compile("article:<[0-9+>", Delimiters::default()).unwrap_err();
        match err {
            WardenError::Compile { pattern, .. } => assert_eq!(pattern, "article:<[0-9+>"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_identical_delimiters_rejected() {
        assert!(compile("a|b|", Delimiters::new('|', '|')).is_err());
    }

    #[test]
    fn test_compiled_source_is_anchored() {
        let pattern = compile("a.<b+>", Delimiters::default()).unwrap();
        assert_eq!(pattern.as_str(), r"^a\.(b+)$");
        assert_eq!(pattern.template(), "a.<b+>");
    }

    #[test]
    fn test_match_any_short_circuits() {
        // The malformed template after the match is never compiled
        let templates = vec!["view".to_string(), "<[".to_string()];
        assert!(match_any(&templates, Delimiters::default(), "view").unwrap());
    }

    #[test]
    fn test_match_any_surfaces_compile_error() {
        let templates = vec!["<[".to_string(), "view".to_string()];
        assert!(match_any(&templates, Delimiters::default(), "view").is_err());

        let templates = vec!["edit".to_string(), "<[".to_string()];
        assert!(match_any(&templates, Delimiters::default(), "view").is_err());
    }

    #[test]
    fn test_match_any_empty_list() {
        assert!(!match_any(&[], Delimiters::default(), "anything").unwrap());
    }

    #[test]
    fn test_unicode_literals() {
        assert!(matches("café:<[0-9]+>", "café:1"));
        assert!(!matches("café:<[0-9]+>", "cafe:1"));
    }
}
