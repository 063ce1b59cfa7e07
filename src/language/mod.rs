//! Language visitor contract and the small set of helpers shared by
//! every per-language implementation (§4.4).
//!
//! Each backend is a singleton `&'static dyn LanguageBackend` exposed
//! through [`backend_for_path`]; the indexer driver looks one up per
//! file by extension and hands it a byte slice plus the reusable
//! [`ParseResultBuffer`].

use std::fmt;
use std::path::Path;

use tree_sitter::{Node, Tree};

use crate::filter::FilterEngine;
use crate::record::{ParseResultBuffer, SourceLocation};

mod cpp;
mod javascript;
mod rust;

/// Error returned when the external grammar fails to produce a tree.
#[derive(Debug)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

pub type BackendResult<T> = Result<T, BackendError>;

/// Convert a tree-sitter node's 0-based row/col span into the 1-based
/// `SourceLocation` this crate stores.
pub fn node_text_range(node: &Node) -> SourceLocation {
    let start = node.start_position();
    let end = node.end_position();
    SourceLocation {
        start_row: start.row as u32 + 1,
        start_col: start.column as u32 + 1,
        end_row: end.row as u32 + 1,
        end_col: end.column as u32 + 1,
    }
}

pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// A per-language visitor. Backends extract occurrences directly into
/// the shared [`ParseResultBuffer`] rather than returning a value,
/// matching §4.4's `parse_file(...) -> ok|err` contract: a non-empty
/// buffer on return is the success signal the driver acts on.
pub trait LanguageBackend: Sync {
    fn id(&self) -> &'static str;
    fn file_extensions(&self) -> &'static [&'static str];
    /// Language keywords rejected by the filter engine even when not
    /// present in the shared stopword list.
    fn keywords(&self) -> &'static [&'static str];

    fn parse(&self, source: &[u8]) -> BackendResult<Tree>;

    /// Traverse `tree` and append every occurrence the visitor finds to
    /// `buf`, after checking each candidate symbol with `filter`
    /// (§4.2's `should_index` contract runs inline as each symbol is
    /// discovered, so that rejected symbols never allocate a record).
    fn visit(
        &self,
        source: &str,
        tree: &Tree,
        directory: &str,
        filename: &str,
        filter: &FilterEngine,
        buf: &mut ParseResultBuffer,
    );
}

static BACKENDS: &[&dyn LanguageBackend] = &[
    &rust::BACKEND,
    &cpp::BACKEND,
    &javascript::JS_BACKEND,
    &javascript::TS_BACKEND,
];

/// Resolve a backend from a file's extension (case-insensitive).
pub fn backend_for_path(path: &Path) -> Option<&'static dyn LanguageBackend> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    BACKENDS
        .iter()
        .find(|b| b.file_extensions().contains(&ext.as_str()))
        .copied()
}

/// All configured extensions across every registered backend, used by
/// the file walker to build its default include set (§4.6).
pub fn all_extensions() -> Vec<&'static str> {
    BACKENDS
        .iter()
        .flat_map(|b| b.file_extensions().iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_for_path_resolves_known_extensions() {
        assert_eq!(backend_for_path(Path::new("a.rs")).unwrap().id(), "rust");
        assert_eq!(backend_for_path(Path::new("a.cpp")).unwrap().id(), "cpp");
        assert_eq!(backend_for_path(Path::new("a.ts")).unwrap().id(), "typescript");
        assert_eq!(backend_for_path(Path::new("a.js")).unwrap().id(), "javascript");
        assert!(backend_for_path(Path::new("a.unknown")).is_none());
    }
}
