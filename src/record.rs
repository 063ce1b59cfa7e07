//! The extracted-occurrence record and the grow-on-demand buffer that
//! owns them for the lifetime of one file's parse.

use std::fmt;

/// The closed set of syntactic roles an occurrence can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextTag {
    Class,
    Interface,
    Function,
    Argument,
    Variable,
    Exception,
    Type,
    Property,
    Comment,
    String,
    Filename,
    Import,
    Export,
    Call,
    Namespace,
    Enum,
    EnumCase,
    Trait,
    Lambda,
    Label,
    Goto,
}

impl ContextTag {
    /// Stable lowercase wire/storage form, also accepted back by `parse`.
    pub fn as_str(self) -> &'static str {
        match self {
            ContextTag::Class => "class",
            ContextTag::Interface => "interface",
            ContextTag::Function => "function",
            ContextTag::Argument => "argument",
            ContextTag::Variable => "variable",
            ContextTag::Exception => "exception",
            ContextTag::Type => "type",
            ContextTag::Property => "property",
            ContextTag::Comment => "comment",
            ContextTag::String => "string",
            ContextTag::Filename => "filename",
            ContextTag::Import => "import",
            ContextTag::Export => "export",
            ContextTag::Call => "call",
            ContextTag::Namespace => "namespace",
            ContextTag::Enum => "enum",
            ContextTag::EnumCase => "enum_case",
            ContextTag::Trait => "trait",
            ContextTag::Lambda => "lambda",
            ContextTag::Label => "label",
            ContextTag::Goto => "goto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "class" => ContextTag::Class,
            "interface" => ContextTag::Interface,
            "function" | "func" => ContextTag::Function,
            "argument" | "arg" => ContextTag::Argument,
            "variable" | "var" => ContextTag::Variable,
            "exception" => ContextTag::Exception,
            "type" => ContextTag::Type,
            "property" | "prop" => ContextTag::Property,
            "comment" => ContextTag::Comment,
            "string" => ContextTag::String,
            "filename" | "file" => ContextTag::Filename,
            "import" => ContextTag::Import,
            "export" => ContextTag::Export,
            "call" => ContextTag::Call,
            "namespace" => ContextTag::Namespace,
            "enum" => ContextTag::Enum,
            "enum_case" => ContextTag::EnumCase,
            "trait" => ContextTag::Trait,
            "lambda" => ContextTag::Lambda,
            "label" => ContextTag::Label,
            "goto" => ContextTag::Goto,
            _ => return None,
        })
    }

    /// Tags accepted by `--toc`, per spec.md's explicitly closed list.
    pub const TOC_TAGS: &'static [ContextTag] = &[
        ContextTag::Filename,
        ContextTag::Class,
        ContextTag::Function,
        ContextTag::Enum,
        ContextTag::Type,
        ContextTag::Import,
    ];
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start/end position pair retained on definition sites to support
/// `-e` code expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}:{}",
            self.start_row, self.start_col, self.end_row, self.end_col
        )
    }
}

/// Extensible per-record attributes, one slot per `schema::COLUMNS` entry
/// (minus `is_definition`, which gets its own field since it is an
/// integer flag rather than a filter list value).
#[derive(Debug, Clone, Default)]
pub struct ExtColumns {
    pub parent_symbol: Option<String>,
    pub scope: Option<String>,
    pub namespace: Option<String>,
    pub modifier: Option<String>,
    pub type_: Option<String>,
    pub clue: Option<String>,
}

impl ExtColumns {
    /// Look up a field by its `schema::Column::name` (the SQL column
    /// name, e.g. `"type"` for the `type_` field), so callers can bind
    /// extensible columns by iterating `schema::COLUMNS` rather than
    /// naming each field.
    pub fn get(&self, column_name: &str) -> Option<&str> {
        match column_name {
            "parent_symbol" => self.parent_symbol.as_deref(),
            "scope" => self.scope.as_deref(),
            "namespace" => self.namespace.as_deref(),
            "modifier" => self.modifier.as_deref(),
            "type" => self.type_.as_deref(),
            "clue" => self.clue.as_deref(),
            _ => None,
        }
    }
}

/// One extracted occurrence.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub symbol: String,
    pub full_symbol: String,
    pub directory: String,
    pub filename: String,
    pub line: u32,
    pub context: ContextTag,
    pub source_location: Option<SourceLocation>,
    pub is_definition: bool,
    pub ext: ExtColumns,
}

/// Sigil-stripping is applied only for `variable` and `property`
/// contexts (spec.md §9 Open Questions: other contexts are left as
/// observed, not inferred — this repository does not extend stripping
/// to `argument` or any other tag).
fn strip_sigil_if_applicable(raw: &str, context: ContextTag) -> String {
    let strips = matches!(context, ContextTag::Variable | ContextTag::Property);
    if strips {
        let mut chars = raw.chars();
        match chars.next() {
            Some(c) if "$@%&*".contains(c) => chars.as_str().to_string(),
            _ => raw.to_string(),
        }
    } else {
        raw.to_string()
    }
}

fn strip_trailing_punctuation(raw: &str) -> &str {
    raw.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_')
}

/// Grow-on-demand sequence of records for one file's parse. Doubles in
/// capacity when full; reused across files by the driver (capacity
/// retained, `clear()` resets only the length).
#[derive(Debug, Default)]
pub struct ParseResultBuffer {
    records: Vec<IndexRecord>,
}

impl ParseResultBuffer {
    pub fn new() -> Self {
        Self {
            records: Vec::with_capacity(64),
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexRecord> {
        self.records.iter()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, IndexRecord> {
        self.records.drain(..)
    }

    /// Normalize and append one record. `raw_symbol` is the symbol as it
    /// appears in source (sigil/case intact); normalization here
    /// produces `symbol` (lowercased, sigil-stripped per context,
    /// trailing punctuation stripped for comment/string words) while
    /// `full_symbol` keeps the original.
    #[allow(clippy::too_many_arguments)]
    pub fn add_entry(
        &mut self,
        raw_symbol: &str,
        line: u32,
        context: ContextTag,
        directory: &str,
        filename: &str,
        source_location: Option<SourceLocation>,
        is_definition: bool,
        ext: ExtColumns,
    ) {
        let trimmed = match context {
            ContextTag::Comment | ContextTag::String => strip_trailing_punctuation(raw_symbol),
            _ => raw_symbol,
        };
        let stripped = strip_sigil_if_applicable(trimmed, context);
        let symbol = stripped.to_lowercase();

        self.records.push(IndexRecord {
            symbol,
            full_symbol: raw_symbol.to_string(),
            directory: directory.to_string(),
            filename: filename.to_string(),
            line,
            context,
            source_location,
            is_definition,
            ext,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigil_is_stripped_for_variable_and_property_only() {
        let mut buf = ParseResultBuffer::new();
        buf.add_entry("$Foo", 1, ContextTag::Variable, "d", "f.php", None, false, ExtColumns::default());
        buf.add_entry("$Bar", 1, ContextTag::Argument, "d", "f.php", None, false, ExtColumns::default());

        let records: Vec<_> = buf.iter().collect();
        assert_eq!(records[0].symbol, "foo");
        assert_eq!(records[0].full_symbol, "$Foo");
        // argument context is left as observed: sigil not stripped here.
        assert_eq!(records[1].symbol, "$bar");
    }

    #[test]
    fn comment_words_lose_trailing_punctuation() {
        let mut buf = ParseResultBuffer::new();
        buf.add_entry("hello,", 1, ContextTag::Comment, "d", "f.c", None, false, ExtColumns::default());
        assert_eq!(buf.iter().next().unwrap().symbol, "hello");
    }

    #[test]
    fn buffer_clear_retains_capacity() {
        let mut buf = ParseResultBuffer::new();
        buf.add_entry("x", 1, ContextTag::Variable, "d", "f.c", None, false, ExtColumns::default());
        let cap_before = buf.records.capacity();
        buf.clear();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.records.capacity(), cap_before);
    }
}
