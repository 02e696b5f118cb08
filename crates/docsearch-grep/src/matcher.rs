use regex::{Regex, RegexBuilder};
use std::ops::Range;

use docsearch_core::error::{Error, Result};

/// A compiled pattern. Construction validates it, so scanning never fails.
#[derive(Debug, Clone)]
pub enum Matcher {
    Literal(String),
    Regex(Regex),
}

impl Matcher {
    pub fn new(pattern: &str, regex: bool, case_insensitive: bool) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::InvalidQuery("pattern must not be empty".to_string()));
        }
        if regex {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| {
                    Error::InvalidQuery(format!("invalid regular expression '{pattern}': {e}"))
                })?;
            return Ok(Self::Regex(re));
        }
        if case_insensitive {
            let re = RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::InvalidQuery(e.to_string()))?;
            return Ok(Self::Regex(re));
        }
        Ok(Self::Literal(pattern.to_string()))
    }

    /// Non-overlapping byte spans, left to right. Zero-width regex matches
    /// are dropped.
    pub fn find_spans(&self, line: &str) -> Vec<Range<usize>> {
        match self {
            Self::Literal(needle) => line
                .match_indices(needle.as_str())
                .map(|(i, m)| i..i + m.len())
                .collect(),
            Self::Regex(re) => re
                .find_iter(line)
                .filter(|m| !m.is_empty())
                .map(|m| m.range())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_spans_do_not_overlap() {
        let m = Matcher::new("aa", false, false).unwrap();
        assert_eq!(m.find_spans("aaaa"), vec![0..2, 2..4]);
    }

    #[test]
    fn case_insensitive_literal_escapes_metacharacters() {
        let m = Matcher::new("A.B", false, true).unwrap();
        assert_eq!(m.find_spans("a.b axb"), vec![0..3]);
    }

    #[test]
    fn zero_width_regex_matches_are_skipped() {
        let m = Matcher::new("x*", true, false).unwrap();
        assert_eq!(m.find_spans("abxxc"), vec![2..4]);
    }

    #[test]
    fn bad_regex_and_empty_pattern_are_invalid_queries() {
        assert!(matches!(Matcher::new("(unclosed", true, false), Err(Error::InvalidQuery(_))));
        assert!(matches!(Matcher::new("", false, false), Err(Error::InvalidQuery(_))));
    }
}
