//! Shell-glob matching over full object keys.

use globset::{Glob, GlobMatcher};

/// Wraps `globset::GlobMatcher` so call sites never touch `globset` types.
#[derive(Debug, Clone)]
pub struct Matcher(GlobMatcher);

/// Compiles an optional shell-glob pattern. `None` in, `None` out.
pub fn compile(pattern: Option<&str>) -> anyhow::Result<Option<Matcher>> {
    match pattern {
        None => Ok(None),
        Some(pattern) => Ok(Some(Matcher(Glob::new(pattern)?.compile_matcher()))),
    }
}

/// True when `matcher` is absent, else true iff `matcher` matches `key`.
pub fn is_match(key: &str, matcher: Option<&Matcher>) -> bool {
    match matcher {
        None => true,
        Some(m) => m.0.is_match(key),
    }
}

/// False if `key` starts with `/`, ends with `/`, or contains `//`.
pub fn is_valid_key(key: &str) -> bool {
    !(key.starts_with('/') || key.ends_with('/') || key.contains("//"))
}

/// `_should_read(entry, matcher) == is_valid_key(entry.key) ∧ is_match(entry.key, matcher)`
pub fn should_read(key: &str, matcher: Option<&Matcher>) -> bool {
    is_valid_key(key) && is_match(key, matcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pattern_matches_everything_valid() {
        assert!(should_read("a/b.txt", None));
        assert!(!should_read("/a/b.txt", None));
        assert!(!should_read("a/b.txt/", None));
        assert!(!should_read("a//b.txt", None));
    }

    #[test]
    fn glob_is_case_sensitive_and_matches_across_slashes() {
        let m = compile(Some("*.jpg")).unwrap();
        assert!(should_read("pref/x.jpg", m.as_ref()));
        assert!(!should_read("pref/x.png", m.as_ref()));
        assert!(!should_read("pref/y.JPG", m.as_ref()));
    }

    #[test]
    fn question_mark_and_set_classes() {
        let m = compile(Some("a?c")).unwrap();
        assert!(should_read("abc", m.as_ref()));
        assert!(!should_read("ac", m.as_ref()));

        let m = compile(Some("[ab]x")).unwrap();
        assert!(should_read("ax", m.as_ref()));
        assert!(should_read("bx", m.as_ref()));
        assert!(!should_read("cx", m.as_ref()));
    }
}
