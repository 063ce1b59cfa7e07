//! The symbol store: a SQLite-backed, schema-registry-driven table of
//! `IndexRecord`s (§4.5).
//!
//! DDL, the prepared insert's parameter order, and delete-by-file all
//! derive from [`crate::schema::COLUMNS`] plus the fixed infrastructure
//! columns, matching §4.1's "adding a column is a single-point change"
//! invariant.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};

use crate::record::{ContextTag, ExtColumns, IndexRecord, SourceLocation};
use crate::schema;

const SCHEMA_VERSION: &str = "1";

/// Fixed (non-registry) `records` columns, in DDL/insert-binding order.
/// `id` is excluded since it's never bound on insert; the query planner
/// prepends it separately when building a `SELECT` projection.
pub(crate) const FIXED_COLUMNS: &[&str] = &[
    "symbol",
    "full_symbol",
    "directory",
    "filename",
    "line",
    "context",
    "source_location",
    "is_definition",
];

pub struct SymbolStore {
    path: PathBuf,
    conn: Connection,
}

impl SymbolStore {
    /// `open(path)`: open or create the store file, set the
    /// concurrent-writer pragmas and busy timeout, create schema
    /// idempotently (§4.5).
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let store = Self {
            path: path.to_path_buf(),
            conn,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize_schema(&self) -> Result<()> {
        let extensible = schema::extensible_ddl_fragment();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);

             CREATE TABLE IF NOT EXISTS records (
                 id INTEGER PRIMARY KEY,
                 symbol TEXT NOT NULL,
                 full_symbol TEXT NOT NULL,
                 directory TEXT NOT NULL,
                 filename TEXT NOT NULL,
                 line INTEGER NOT NULL,
                 context TEXT NOT NULL,
                 source_location TEXT
                 {extensible}
             );

             CREATE INDEX IF NOT EXISTS idx_records_symbol ON records(symbol);
             CREATE INDEX IF NOT EXISTS idx_records_context_def ON records(context, is_definition);
             CREATE INDEX IF NOT EXISTS idx_records_dir_file ON records(directory, filename);
             CREATE INDEX IF NOT EXISTS idx_records_parent_context ON records(parent_symbol, context);
             CREATE INDEX IF NOT EXISTS idx_records_scope ON records(scope);
             CREATE INDEX IF NOT EXISTS idx_records_namespace ON records(namespace);
             CREATE INDEX IF NOT EXISTS idx_records_modifier ON records(modifier);
             CREATE INDEX IF NOT EXISTS idx_records_type ON records(type);
             CREATE INDEX IF NOT EXISTS idx_records_clue ON records(clue);"
        );
        self.conn.execute_batch(&ddl)?;

        let existing: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| row.get(0))
            .optional()?;
        match existing {
            None => {
                self.conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                    [SCHEMA_VERSION],
                )?;
            }
            Some(found) if found != SCHEMA_VERSION => {
                anyhow::bail!(crate::error::SchemaError {
                    found,
                    expected: SCHEMA_VERSION.to_string(),
                });
            }
            Some(_) => {}
        }
        Ok(())
    }

    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    pub fn commit_transaction(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback_transaction(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// `delete_by_file(directory, filename)`: removes every row for
    /// that file, run before inserts on re-index (§4.5, §8 idempotence).
    pub fn delete_by_file(&self, directory: &str, filename: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM records WHERE directory = ?1 AND filename = ?2",
            rusqlite::params![directory, filename],
        )?;
        Ok(())
    }

    /// Insert every record currently in the parse-result buffer. Binds
    /// deep copies of every string (the buffer's backing storage may be
    /// reused by the driver immediately after this call). Column list
    /// and placeholders are derived from `FIXED_COLUMNS` plus
    /// `schema::extensible_names()` so adding a registry column needs no
    /// change here (§4.1's single-point-change invariant).
    pub fn insert_all<'a>(&self, records: impl Iterator<Item = &'a IndexRecord>) -> Result<()> {
        let extensible = schema::extensible_names();
        let mut columns: Vec<&str> = FIXED_COLUMNS.to_vec();
        columns.extend(extensible.iter().copied());

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO records ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(",")
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;

        for record in records {
            let source_location = record.source_location.map(|loc| loc.to_string());
            let mut params: Vec<SqlValue> = vec![
                SqlValue::from(record.symbol.clone()),
                SqlValue::from(record.full_symbol.clone()),
                SqlValue::from(record.directory.clone()),
                SqlValue::from(record.filename.clone()),
                SqlValue::from(record.line as i64),
                SqlValue::from(record.context.as_str().to_string()),
                source_location.map(SqlValue::from).unwrap_or(SqlValue::Null),
                SqlValue::from(record.is_definition as i64),
            ];
            for name in &extensible {
                params.push(
                    record
                        .ext
                        .get(name)
                        .map(|s| SqlValue::from(s.to_string()))
                        .unwrap_or(SqlValue::Null),
                );
            }
            stmt.execute(rusqlite::params_from_iter(params.iter()))?;
        }
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| anyhow::anyhow!("failed to close store: {e}"))
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Re-hydrate a result row into an `IndexRecord`, used by the query
/// planner's row mapper.
pub fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<IndexRecord> {
    let context_str: String = row.get("context")?;
    let context = ContextTag::parse(&context_str).unwrap_or(ContextTag::Variable);
    let source_location: Option<String> = row.get("source_location")?;
    let is_definition: i64 = row.get("is_definition")?;

    Ok(IndexRecord {
        symbol: row.get("symbol")?,
        full_symbol: row.get("full_symbol")?,
        directory: row.get("directory")?,
        filename: row.get("filename")?,
        line: row.get("line")?,
        context,
        source_location: source_location.and_then(|s| parse_source_location(&s)),
        is_definition: is_definition != 0,
        ext: ExtColumns {
            parent_symbol: row.get("parent_symbol")?,
            scope: row.get("scope")?,
            namespace: row.get("namespace")?,
            modifier: row.get("modifier")?,
            type_: row.get("type")?,
            clue: row.get("clue")?,
        },
    })
}

fn parse_source_location(s: &str) -> Option<SourceLocation> {
    let (start, end) = s.split_once(" - ")?;
    let (sr, sc) = start.split_once(':')?;
    let (er, ec) = end.split_once(':')?;
    Some(SourceLocation {
        start_row: sr.parse().ok()?,
        start_col: sc.parse().ok()?,
        end_row: er.parse().ok()?,
        end_col: ec.parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record() -> IndexRecord {
        IndexRecord {
            symbol: "main".to_string(),
            full_symbol: "main".to_string(),
            directory: ".".to_string(),
            filename: "foo.c".to_string(),
            line: 1,
            context: ContextTag::Function,
            source_location: Some(SourceLocation { start_row: 1, start_col: 1, end_row: 1, end_col: 40 }),
            is_definition: true,
            ext: ExtColumns::default(),
        }
    }

    #[test]
    fn insert_and_delete_by_file_round_trip() {
        let dir = tempdir().expect("tempdir");
        let store = SymbolStore::open(&dir.path().join("code-index.db")).expect("open");

        let record = sample_record();
        store.begin_transaction().expect("begin");
        store.delete_by_file(&record.directory, &record.filename).expect("delete");
        store.insert_all(std::iter::once(&record)).expect("insert");
        store.commit_transaction().expect("commit");

        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 1);

        store.delete_by_file("pkg", "foo.c").expect("delete missing is a no-op");
        store.delete_by_file(".", "foo.c").expect("delete existing");
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn reopening_an_existing_store_reuses_schema_version() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("code-index.db");
        {
            let store = SymbolStore::open(&path).expect("first open");
            store.close().expect("close");
        }
        let store = SymbolStore::open(&path).expect("second open");
        drop(store);
    }
}
