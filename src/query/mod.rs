//! The query planner (§4.9): composes a SQL query from positional
//! patterns, context include/exclude, per-column filters, file filters,
//! and an optional proximity range.

pub mod printer;

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;

use crate::error::QueryPlanError;
use crate::record::{ContextTag, IndexRecord};
use crate::schema;
use crate::store::row_to_record;

const MAX_SQL_LEN: usize = 100 * 1024 * 1024;

#[derive(Debug, Default, Clone)]
pub struct QueryRequest {
    /// SQL-LIKE patterns (`%`/`_` wildcards), in positional order.
    /// `patterns[0]` is the anchor for proximity queries.
    pub patterns: Vec<String>,
    pub include_context: Vec<ContextTag>,
    pub exclude_context: Vec<ContextTag>,
    /// Per-column `IN (...)` filters, keyed by schema column name.
    pub column_filters: HashMap<&'static str, Vec<String>>,
    /// File filter fragments (`-f`); directory/filename composition and
    /// trailing-`/`-as-wildcard handling applied per fragment.
    pub file_filters: Vec<String>,
    /// `None` = no co-occurrence constraint (only meaningful with one
    /// pattern). `Some(0)` = same line via INTERSECT. `Some(r) if r > 0`
    /// = proximity within `±r` lines.
    pub proximity: Option<u32>,
    pub def_filter: Option<bool>,
    pub limit: Option<usize>,
    pub limit_per_file: Option<usize>,
}

impl QueryRequest {
    fn validate(&self) -> Result<()> {
        if self.patterns.is_empty() {
            anyhow::bail!(QueryPlanError::new("at least one pattern is required"));
        }
        if !self.include_context.is_empty() && !self.exclude_context.is_empty() {
            // §4.9: mutually exclusive per flag; include wins rather
            // than erroring, matching the donor's precedent of CLI
            // values overriding config rather than conflicting loudly.
        }
        if self.proximity.is_some_and(|r| r > 0) && self.patterns.len() < 2 {
            anyhow::bail!(QueryPlanError::new(
                "proximity search requires at least two patterns"
            ));
        }
        Ok(())
    }
}

/// Named groups of context tags a `-i`/`-x` value can expand to, e.g.
/// `noise` for "the tags nobody wants when hunting definitions"
/// (spec.md §8 scenario 6).
const CONTEXT_GROUPS: &[(&str, &[ContextTag])] = &[("noise", &[ContextTag::Comment, ContextTag::String])];

/// Resolve `-i`/`-x` values into context tags, expanding any named
/// group before falling back to a single tag lookup.
pub fn expand_context_tags(names: &[String]) -> Result<Vec<ContextTag>> {
    let mut out = Vec::new();
    for name in names {
        if let Some((_, tags)) = CONTEXT_GROUPS.iter().find(|(group, _)| *group == name) {
            out.extend(tags.iter().copied());
            continue;
        }
        match ContextTag::parse(name) {
            Some(tag) => out.push(tag),
            None => anyhow::bail!(QueryPlanError::new(format!("unknown context tag '{name}'"))),
        }
    }
    Ok(out)
}

fn file_filter_fragment(pattern: &str) -> (String, String) {
    if let Some((dir, file)) = pattern.rsplit_once('/') {
        let dir = if dir.is_empty() { "%".to_string() } else { format!("{dir}%") };
        let file = if file.is_empty() { "%".to_string() } else { file.to_string() };
        (dir, file)
    } else {
        (pattern.to_string(), pattern.to_string())
    }
}

struct SqlBuilder {
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlBuilder {
    fn new() -> Self {
        Self {
            sql: String::with_capacity(8 * 1024),
            params: Vec::new(),
        }
    }

    fn push(&mut self, fragment: &str) -> Result<()> {
        self.sql.push_str(fragment);
        if self.sql.len() > MAX_SQL_LEN {
            anyhow::bail!(QueryPlanError::new("generated SQL exceeded maximum size"));
        }
        Ok(())
    }

    fn push_param(&mut self, value: impl Into<SqlValue>) {
        self.params.push(value.into());
    }
}

/// Append the `WHERE`-body filters common to every pattern branch:
/// context include/exclude, per-column filters, file filters, and the
/// definition flag. Does not include the leading `WHERE` or `AND`.
fn push_common_filters(builder: &mut SqlBuilder, request: &QueryRequest) -> Result<()> {
    if !request.include_context.is_empty() {
        push_in_list(
            builder,
            "context",
            request.include_context.iter().map(|c| c.as_str().to_string()),
        )?;
    } else if !request.exclude_context.is_empty() {
        builder.push(" AND context NOT IN (")?;
        push_placeholders_for(builder, request.exclude_context.iter().map(|c| c.as_str().to_string()))?;
        builder.push(")")?;
    }

    for column in schema::COLUMNS.iter().filter(|c| c.filterable) {
        if let Some(values) = request.column_filters.get(column.name) {
            if !values.is_empty() {
                push_in_list(builder, column.name, values.iter().cloned())?;
            }
        }
    }

    for fragment in &request.file_filters {
        let (dir_pattern, file_pattern) = file_filter_fragment(fragment);
        builder.push(" AND directory LIKE ?")?;
        builder.push_param(dir_pattern);
        builder.push(" AND filename LIKE ?")?;
        builder.push_param(file_pattern);
    }

    if let Some(is_def) = request.def_filter {
        builder.push(" AND is_definition = ?")?;
        builder.push_param(is_def as i64);
    }

    Ok(())
}

fn push_in_list(builder: &mut SqlBuilder, column: &str, values: impl Iterator<Item = String>) -> Result<()> {
    builder.push(&format!(" AND {column} IN ("))?;
    push_placeholders_for(builder, values)?;
    builder.push(")")?;
    Ok(())
}

fn push_placeholders_for(builder: &mut SqlBuilder, values: impl Iterator<Item = String>) -> Result<()> {
    let mut first = true;
    for value in values {
        if !first {
            builder.push(",")?;
        }
        first = false;
        builder.push("?")?;
        builder.push_param(value);
    }
    Ok(())
}

/// Execute the planned query and return matching records. Mirrors
/// §4.9's three branches: single pattern, same-line INTERSECT, and
/// proximity join.
pub fn execute(conn: &Connection, request: &QueryRequest) -> Result<Vec<IndexRecord>> {
    request.validate()?;

    let records = match (request.patterns.len(), request.proximity) {
        (1, _) => execute_single(conn, request)?,
        (_, None) | (_, Some(0)) => execute_intersect(conn, request)?,
        (_, Some(r)) => execute_proximity(conn, request, r)?,
    };

    Ok(apply_limit_per_file(records, request.limit_per_file, request.limit))
}

/// The full `SELECT` projection: `id` plus the fixed columns plus every
/// registry column, in the same order `store::insert_all` binds them in
/// (§4.1's single-point-change invariant).
fn select_columns() -> String {
    let mut columns: Vec<&str> = vec!["id"];
    columns.extend_from_slice(crate::store::FIXED_COLUMNS);
    let extensible = schema::extensible_names();
    columns.extend(extensible.iter().copied());
    columns.join(", ")
}

fn execute_single(conn: &Connection, request: &QueryRequest) -> Result<Vec<IndexRecord>> {
    let mut builder = SqlBuilder::new();
    builder.push(&format!("SELECT {} FROM records WHERE symbol LIKE ?", select_columns()))?;
    builder.push_param(request.patterns[0].clone());
    push_common_filters(&mut builder, request)?;
    builder.push(" ORDER BY directory, filename, line")?;
    if let Some(limit) = request.limit {
        builder.push(&format!(" LIMIT {limit}"))?;
    }

    run_query(conn, &builder)
}

fn execute_intersect(conn: &Connection, request: &QueryRequest) -> Result<Vec<IndexRecord>> {
    // Each pattern's matching (directory, filename, line) triples are
    // intersected; the outer query re-selects full rows for any pattern
    // whose match lands on an intersected key, matching §4.9's
    // "returns all matching columns of the intersected rows".
    let mut key_builder = SqlBuilder::new();
    for (i, pattern) in request.patterns.iter().enumerate() {
        if i > 0 {
            key_builder.push(" INTERSECT ")?;
        }
        key_builder.push("SELECT directory, filename, line FROM records WHERE symbol LIKE ?")?;
        key_builder.push_param(pattern.clone());
        push_common_filters(&mut key_builder, request)?;
    }

    let mut builder = SqlBuilder::new();
    builder.push(&format!(
        "SELECT {} FROM records WHERE (directory, filename, line) IN ({})",
        select_columns(),
        key_builder.sql
    ))?;
    builder.params.extend(key_builder.params);
    builder.push(" ORDER BY directory, filename, line")?;
    if let Some(limit) = request.limit {
        builder.push(&format!(" LIMIT {limit}"))?;
    }

    run_query(conn, &builder)
}

fn execute_proximity(conn: &Connection, request: &QueryRequest, r: u32) -> Result<Vec<IndexRecord>> {
    // Step 1: populate a temp table with anchor matches.
    conn.execute_batch(
        "CREATE TEMP TABLE IF NOT EXISTS proximity_anchor (directory TEXT, filename TEXT, line INTEGER);
         DELETE FROM proximity_anchor;",
    )?;

    let mut anchor_builder = SqlBuilder::new();
    anchor_builder.push("INSERT INTO proximity_anchor SELECT directory, filename, line FROM records WHERE symbol LIKE ?")?;
    anchor_builder.push_param(request.patterns[0].clone());
    push_common_filters(&mut anchor_builder, request)?;
    conn.execute(&anchor_builder.sql, rusqlite::params_from_iter(anchor_builder.params.iter()))?;

    // Step 2: every secondary pattern must match at least once in the
    // same file within [line - r, line + r] (clamped to 1).
    let mut builder = SqlBuilder::new();
    builder.push(&format!(
        "SELECT DISTINCT {} FROM records r JOIN proximity_anchor a \
         ON r.directory = a.directory AND r.filename = a.filename AND r.line = a.line",
        select_columns_prefixed("r")
    ))?;
    builder.push(" WHERE 1 = 1")?;

    for pattern in &request.patterns[1..] {
        builder.push(
            " AND EXISTS (SELECT 1 FROM records s WHERE s.directory = a.directory \
              AND s.filename = a.filename AND s.symbol LIKE ? \
              AND s.line >= MAX(1, a.line - ?) AND s.line <= a.line + ?)",
        )?;
        builder.push_param(pattern.clone());
        builder.push_param(r as i64);
        builder.push_param(r as i64);
    }

    builder.push(" ORDER BY a.directory, a.filename, a.line")?;
    if let Some(limit) = request.limit {
        builder.push(&format!(" LIMIT {limit}"))?;
    }

    run_query(conn, &builder)
}

fn select_columns_prefixed(alias: &str) -> String {
    select_columns()
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn run_query(conn: &Connection, builder: &SqlBuilder) -> Result<Vec<IndexRecord>> {
    tracing::debug!(sql = %builder.sql, param_count = builder.params.len(), "planned query");
    let mut stmt = conn.prepare(&builder.sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(builder.params.iter()), row_to_record)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// `--limit-per-file` can't be expressed purely in SQL without a
/// window-function-style rewrite, so it is enforced row-by-row here
/// after the global `--limit` has already bounded the result set
/// (§4.9's documented caveat).
fn apply_limit_per_file(
    records: Vec<IndexRecord>,
    limit_per_file: Option<usize>,
    _global_limit: Option<usize>,
) -> Vec<IndexRecord> {
    let Some(cap) = limit_per_file else {
        return records;
    };

    let mut per_file_count: HashMap<(String, String), usize> = HashMap::new();
    records
        .into_iter()
        .filter(|record| {
            let key = (record.directory.clone(), record.filename.clone());
            let count = per_file_count.entry(key).or_insert(0);
            *count += 1;
            *count <= cap
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_group_expands_to_comment_and_string() {
        let tags = expand_context_tags(&["noise".to_string()]).expect("expand");
        assert_eq!(tags, vec![ContextTag::Comment, ContextTag::String]);
    }

    #[test]
    fn unknown_context_tag_is_rejected() {
        assert!(expand_context_tags(&["bogus".to_string()]).is_err());
    }

    #[test]
    fn file_filter_fragment_splits_directory_and_filename() {
        assert_eq!(file_filter_fragment("src/foo.c"), ("src%".to_string(), "foo.c".to_string()));
        assert_eq!(file_filter_fragment("foo.c"), ("foo.c".to_string(), "foo.c".to_string()));
        assert_eq!(file_filter_fragment("src/"), ("src%".to_string(), "%".to_string()));
    }

    #[test]
    fn proximity_without_second_pattern_is_rejected() {
        let request = QueryRequest {
            patterns: vec!["only".to_string()],
            proximity: Some(5),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn limit_per_file_caps_rows_per_directory_filename_pair() {
        let make = |line: u32| IndexRecord {
            symbol: "x".to_string(),
            full_symbol: "x".to_string(),
            directory: "d".to_string(),
            filename: "f.c".to_string(),
            line,
            context: ContextTag::Variable,
            source_location: None,
            is_definition: false,
            ext: Default::default(),
        };
        let records = vec![make(1), make(2), make(3)];
        let capped = apply_limit_per_file(records, Some(2), None);
        assert_eq!(capped.len(), 2);
    }
}
