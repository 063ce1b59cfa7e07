//! `qi`'s command-line surface (§6 Query CLI) plus the schema-registry-
//! driven per-column flags (`-p`, `-s`, `-ns`, `-m`, `-t`, `-c`): since
//! several of the registry's short flags are multi-character (`-ns`),
//! they are pulled out of argv by iterating [`schema::COLUMNS`] before
//! the remainder is handed to `clap`, rather than hand-declaring one
//! struct field per column.

use std::collections::HashMap;

use clap::Parser;

use crate::schema;

#[derive(Debug, Parser)]
#[command(name = "qi", about = "Query the symbol store")]
pub struct QiArgs {
    #[arg(required = true)]
    pub patterns: Vec<String>,

    #[arg(short = 'i', num_args = 1..)]
    pub include_context: Vec<String>,

    #[arg(short = 'x', num_args = 1..)]
    pub exclude_context: Vec<String>,

    #[arg(short = 'f', num_args = 1..)]
    pub file_filters: Vec<String>,

    /// `--and [N]` / `--same-line [N]`: `N = 0` same line, `N > 0`
    /// proximity within `±N` lines.
    #[arg(long = "and", alias = "same-line", num_args = 0..=1, default_missing_value = "0")]
    pub and: Option<u32>,

    #[arg(long)]
    pub def: bool,

    #[arg(long)]
    pub usage: bool,

    #[arg(short = 'd')]
    pub def_flag: Option<u8>,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long = "limit-per-file")]
    pub limit_per_file: Option<usize>,

    #[arg(short = 'A', default_value_t = 0)]
    pub after: usize,
    #[arg(short = 'B', default_value_t = 0)]
    pub before: usize,
    #[arg(short = 'C', default_value_t = 0)]
    pub context_lines: usize,

    #[arg(short = 'e')]
    pub expand: bool,

    #[arg(long, num_args = 1..)]
    pub columns: Option<Vec<String>>,

    #[arg(short = 'v')]
    pub verbose: bool,

    #[arg(long)]
    pub full: bool,

    #[arg(long)]
    pub compact: bool,

    #[arg(long)]
    pub toc: bool,

    #[arg(long)]
    pub files: bool,

    #[arg(long)]
    pub debug: bool,

    #[arg(long = "db-file", default_value = "code-index.db")]
    pub db_file: std::path::PathBuf,
}

/// Pull every `-<short>` flag registered in the schema registry out of
/// `argv`, collecting its values (every token until the next one
/// starting with `-`) into the returned map, keyed by column name. The
/// remaining tokens are returned untouched for `clap` to parse.
pub fn extract_column_filters(argv: Vec<String>) -> (HashMap<&'static str, Vec<String>>, Vec<String>) {
    let mut filters: HashMap<&'static str, Vec<String>> = HashMap::new();
    let mut remaining = Vec::with_capacity(argv.len());
    let mut iter = argv.into_iter().peekable();

    while let Some(token) = iter.next() {
        let flag = token.strip_prefix('-');
        let column = flag.and_then(schema::by_short_flag);

        if let Some(column) = column {
            let values = filters.entry(column.name).or_default();
            while let Some(next) = iter.peek() {
                if next.starts_with('-') {
                    break;
                }
                values.push(iter.next().unwrap());
            }
        } else {
            remaining.push(token);
        }
    }

    (filters, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulls_registered_short_flags_and_their_values() {
        let argv = vec![
            "qi".to_string(),
            "-p".to_string(),
            "Handler".to_string(),
            "Worker".to_string(),
            "foo".to_string(),
            "-t".to_string(),
            "int".to_string(),
        ];
        let (filters, remaining) = extract_column_filters(argv);
        assert_eq!(filters["parent_symbol"], vec!["Handler", "Worker"]);
        assert_eq!(filters["type"], vec!["int"]);
        assert_eq!(remaining, vec!["qi", "foo"]);
    }

    #[test]
    fn leaves_unrelated_flags_untouched() {
        let argv = vec!["qi".to_string(), "-v".to_string(), "pattern".to_string()];
        let (filters, remaining) = extract_column_filters(argv);
        assert!(filters.is_empty());
        assert_eq!(remaining, vec!["qi", "-v", "pattern"]);
    }
}
