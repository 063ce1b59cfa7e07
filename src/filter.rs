//! The filter engine: decides whether a raw token is worth indexing.
//!
//! Loaded once at startup from a shared stopword list, a per-language
//! keyword list, an optional regex blacklist, and caps on how large
//! those lists may be (§4.2). `should_index` composes the four-step
//! contract; `sanitize_comment_word` is the separate helper used for
//! words pulled out of comments and strings.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::error::ConfigError;

const MAX_WORDS: usize = 200_000;
const MAX_LINE_LEN: usize = 4096;
const MAX_REGEX_PATTERNS: usize = 256;

/// A small fixed set of punctuation-only tokens that are never symbols.
const PUNCTUATION_REJECTS: &[&str] = &[
    "(", ")", "{", "}", "[", "]", "<", ">", "=", "==", "!=", "&&", "||", "->", "::", "+",
    "-", "*", "/", "%", "&", "|", "^", "~", "!", ";", ",", ".",
];

#[derive(Debug, Default)]
pub struct FilterEngine {
    stopwords: HashSet<String>,
    language_keywords: HashSet<String>,
    blacklist: Vec<Regex>,
}

impl FilterEngine {
    /// Build a filter engine from in-memory word lists (used directly by
    /// tests and by callers that already validated their config).
    pub fn new(stopwords: HashSet<String>, language_keywords: HashSet<String>) -> Self {
        Self {
            stopwords,
            language_keywords,
            blacklist: Vec::new(),
        }
    }

    pub fn with_blacklist(mut self, patterns: &[String]) -> Result<Self> {
        if patterns.len() > MAX_REGEX_PATTERNS {
            anyhow::bail!(ConfigError::new(format!(
                "regex blacklist has {} patterns, exceeding cap of {}",
                patterns.len(),
                MAX_REGEX_PATTERNS
            )));
        }
        for pattern in patterns {
            let compiled = Regex::new(pattern)
                .with_context(|| format!("invalid blacklist regex: {pattern}"))?;
            self.blacklist.push(compiled);
        }
        Ok(self)
    }

    /// Load a newline-delimited word list from disk, enforcing the
    /// preflight caps (§4.2): file must exist and be non-empty, word
    /// count capped, line length capped.
    pub fn load_word_list(path: &Path) -> Result<HashSet<String>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read word list {}", path.display()))?;
        if contents.trim().is_empty() {
            anyhow::bail!(ConfigError::new(format!(
                "word list {} is empty",
                path.display()
            )));
        }

        let mut words = HashSet::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.len() > MAX_LINE_LEN {
                anyhow::bail!(ConfigError::new(format!(
                    "line in {} exceeds max length {}",
                    path.display(),
                    MAX_LINE_LEN
                )));
            }
            words.insert(line.to_lowercase());
            if words.len() > MAX_WORDS {
                anyhow::bail!(ConfigError::new(format!(
                    "word list {} exceeds max word count {}",
                    path.display(),
                    MAX_WORDS
                )));
            }
        }
        Ok(words)
    }

    /// `should_index(symbol) -> bool`, applying the four rejection
    /// steps in order.
    pub fn should_index(&self, symbol: &str) -> bool {
        if symbol.len() < 2 {
            return false;
        }
        if symbol.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        if PUNCTUATION_REJECTS.contains(&symbol) {
            return false;
        }

        let lower = symbol.to_lowercase();
        if self.stopwords.contains(&lower) || self.language_keywords.contains(&lower) {
            return false;
        }

        if self.blacklist.iter().any(|re| re.is_match(symbol)) {
            return false;
        }

        true
    }
}

/// Sanitize a word extracted from a comment or string literal: keep
/// alphanumerics, underscore, and the path-like character set, drop
/// everything else.
pub fn sanitize_comment_word(word: &str) -> String {
    const PATH_LIKE: &str = "./-:@#?&=+^$!~<>[]%";
    word.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || PATH_LIKE.contains(*c))
        .collect()
}

/// Split comment/string source text into sanitized candidate words,
/// dropping empties, ready to be fed through `should_index`.
pub fn tokenize_comment_or_string(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || (!c.is_alphanumeric() && c != '_' && c != '$'))
        .map(sanitize_comment_word)
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> FilterEngine {
        let mut stopwords = HashSet::new();
        stopwords.insert("the".to_string());
        let mut keywords = HashSet::new();
        keywords.insert("return".to_string());
        keywords.insert("int".to_string());
        FilterEngine::new(stopwords, keywords)
    }

    #[test]
    fn rejects_short_and_numeric_symbols() {
        let e = engine();
        assert!(!e.should_index("x"));
        assert!(!e.should_index("42"));
        assert!(e.should_index("argc"));
    }

    #[test]
    fn rejects_keywords_and_stopwords_case_insensitively() {
        let e = engine();
        assert!(!e.should_index("Return"));
        assert!(!e.should_index("THE"));
    }

    #[test]
    fn rejects_punctuation_tokens() {
        let e = engine();
        assert!(!e.should_index("->"));
        assert!(!e.should_index("=="));
    }

    #[test]
    fn blacklist_regex_rejects_matches() {
        let e = engine()
            .with_blacklist(&["^tmp_".to_string()])
            .expect("valid regex");
        assert!(!e.should_index("tmp_foo"));
        assert!(e.should_index("foo_tmp"));
    }

    #[test]
    fn sanitizes_comment_words_keeping_path_like_chars() {
        assert_eq!(sanitize_comment_word("hello,"), "hello");
        assert_eq!(sanitize_comment_word("foo/bar.rs"), "foo/bar.rs");
        assert_eq!(tokenize_comment_or_string("see foo.rs, also bar"), vec!["see", "foo.rs", "also", "bar"]);
    }
}
