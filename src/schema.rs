//! The schema registry: the single source of truth for every
//! extensible column on `IndexRecord`.
//!
//! Downstream code (the store's DDL, the prepared insert, the query
//! planner's per-column filters, the CLI's per-column flags, and the
//! printer's display layout) all iterate [`COLUMNS`] rather than
//! naming extensible columns individually. Adding a column here is
//! sufficient to make it filterable, insertable, and displayable.

/// SQL storage type for an extensible column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    pub fn ddl(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }
}

/// One extensible column, described once.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    /// Internal/SQL column name.
    pub name: &'static str,
    pub sql_type: SqlType,
    /// Long CLI flag, e.g. `"parent"` for `--parent`.
    pub flag_long: &'static str,
    /// Short CLI flag, e.g. `"p"` for `-p`.
    pub flag_short: &'static str,
    /// Full display label used in `--full` mode.
    pub display_label: &'static str,
    /// Compact display label used by default.
    pub compact_label: &'static str,
    /// Default column width for the printer's layout pass.
    pub width: usize,
    /// Whether this column accepts a multi-value `IN (...)` CLI filter.
    /// `is_definition` is declared here for DDL purposes but is filtered
    /// through the dedicated `--def`/`--usage` flags instead.
    pub filterable: bool,
}

/// The extensible columns, in declaration and DDL order.
pub const COLUMNS: &[Column] = &[
    Column {
        name: "parent_symbol",
        sql_type: SqlType::Text,
        flag_long: "parent",
        flag_short: "p",
        display_label: "PARENT",
        compact_label: "par",
        width: 16,
        filterable: true,
    },
    Column {
        name: "scope",
        sql_type: SqlType::Text,
        flag_long: "scope",
        flag_short: "s",
        display_label: "SCOPE",
        compact_label: "scp",
        width: 10,
        filterable: true,
    },
    Column {
        name: "namespace",
        sql_type: SqlType::Text,
        flag_long: "namespace",
        flag_short: "ns",
        display_label: "NAMESPACE",
        compact_label: "ns",
        width: 20,
        filterable: true,
    },
    Column {
        name: "modifier",
        sql_type: SqlType::Text,
        flag_long: "modifier",
        flag_short: "m",
        display_label: "MODIFIER",
        compact_label: "mod",
        width: 16,
        filterable: true,
    },
    Column {
        name: "type",
        sql_type: SqlType::Text,
        flag_long: "type",
        flag_short: "t",
        display_label: "TYPE",
        compact_label: "typ",
        width: 16,
        filterable: true,
    },
    Column {
        name: "clue",
        sql_type: SqlType::Text,
        flag_long: "clue",
        flag_short: "c",
        display_label: "CLUE",
        compact_label: "clu",
        width: 10,
        filterable: true,
    },
    Column {
        name: "is_definition",
        sql_type: SqlType::Integer,
        flag_long: "def-flag",
        flag_short: "d",
        display_label: "DEF",
        compact_label: "d",
        width: 3,
        filterable: false,
    },
];

/// Look up a column descriptor by its short CLI flag (without the leading `-`).
pub fn by_short_flag(flag: &str) -> Option<&'static Column> {
    COLUMNS.iter().find(|c| c.flag_short == flag)
}

/// Look up a column descriptor by its SQL column name.
pub fn by_name(name: &str) -> Option<&'static Column> {
    COLUMNS.iter().find(|c| c.name == name)
}

/// Emit the `CREATE TABLE records (...)` body for the extensible columns,
/// to be appended after the fixed infrastructure columns by the store.
pub fn extensible_ddl_fragment() -> String {
    let mut out = String::new();
    for column in COLUMNS {
        out.push_str(&format!(", {} {}", column.name, column.sql_type.ddl()));
    }
    out
}

/// Column names in insert-binding order, matching `extensible_ddl_fragment`.
pub fn extensible_names() -> Vec<&'static str> {
    COLUMNS.iter().map(|c| c.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_definition_is_declared_but_not_filterable() {
        let col = by_name("is_definition").expect("column present");
        assert!(!col.filterable);
        assert_eq!(col.sql_type, SqlType::Integer);
    }

    #[test]
    fn every_filterable_column_has_distinct_short_flag() {
        let mut seen = std::collections::HashSet::new();
        for column in COLUMNS {
            assert!(seen.insert(column.flag_short), "duplicate flag {}", column.flag_short);
        }
    }

    #[test]
    fn ddl_fragment_lists_every_column_once() {
        let fragment = extensible_ddl_fragment();
        for column in COLUMNS {
            assert!(fragment.contains(column.name));
        }
        assert_eq!(fragment.matches(',').count(), COLUMNS.len());
    }
}
