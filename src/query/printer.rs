//! Result printer (§4.10): groups matches by file, computes column
//! widths in a first pass, supports `-A/-B/-C` context lines, `-e`
//! definition expansion, a `--toc` view, and the zero-result
//! diagnostic/retry path.

use std::fmt::Write as _;
use std::fs;

use crate::record::{ContextTag, IndexRecord};
use crate::schema;

pub struct PrintOptions {
    pub full: bool,
    pub compact: bool,
    pub columns: Option<Vec<String>>,
    pub before: usize,
    pub after: usize,
    pub expand_definitions: bool,
    pub files_only: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            full: false,
            compact: false,
            columns: None,
            before: 0,
            after: 0,
            expand_definitions: false,
            files_only: false,
        }
    }
}

/// Two-pass layout: compute column widths over the result set, then
/// render grouped by file.
pub fn render(records: &[IndexRecord], options: &PrintOptions) -> String {
    if options.files_only {
        return render_files_only(records);
    }

    let widths = compute_widths(records, options);
    let mut out = String::new();
    let mut current_file: Option<(&str, &str)> = None;

    for record in records {
        let file_key = (record.directory.as_str(), record.filename.as_str());
        if current_file != Some(file_key) {
            let _ = writeln!(out, "== {}/{} ==", record.directory, record.filename);
            current_file = Some(file_key);
        }

        render_row(&mut out, record, &widths, options);

        if options.before > 0 || options.after > 0 {
            render_context_lines(&mut out, record, options.before, options.after);
        }
        if options.expand_definitions && record.is_definition {
            render_expansion(&mut out, record);
        }
    }

    out
}

fn render_files_only(records: &[IndexRecord]) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut out = String::new();
    for record in records {
        let key = format!("{}/{}", record.directory, record.filename);
        if seen.insert(key.clone()) {
            let _ = writeln!(out, "{key}");
        }
    }
    out
}

struct Widths {
    symbol: usize,
    context: usize,
    line: usize,
}

fn compute_widths(records: &[IndexRecord], _options: &PrintOptions) -> Widths {
    let mut symbol = 6;
    let mut context = 7;
    let mut line = 4;
    for record in records {
        symbol = symbol.max(record.full_symbol.len());
        context = context.max(record.context.as_str().len());
        line = line.max(record.line.to_string().len());
    }
    Widths { symbol, context, line }
}

fn render_row(out: &mut String, record: &IndexRecord, widths: &Widths, options: &PrintOptions) {
    let _ = write!(
        out,
        "{:line_w$}  {:sym_w$}  {:ctx_w$}",
        record.line,
        record.full_symbol,
        record.context,
        line_w = widths.line,
        sym_w = widths.symbol,
        ctx_w = widths.context,
    );

    let active_columns: Vec<&schema::Column> = match &options.columns {
        Some(names) => names.iter().filter_map(|n| schema::by_name(n)).collect(),
        None if options.full => schema::COLUMNS.iter().filter(|c| c.filterable).collect(),
        None => Vec::new(),
    };

    for column in active_columns {
        let value = column_value(record, column.name).unwrap_or_default();
        let label = if options.compact { column.compact_label } else { column.display_label };
        let _ = write!(out, "  {label}={value}");
    }
    out.push('\n');
}

fn column_value(record: &IndexRecord, name: &str) -> Option<String> {
    match name {
        "parent_symbol" => record.ext.parent_symbol.clone(),
        "scope" => record.ext.scope.clone(),
        "namespace" => record.ext.namespace.clone(),
        "modifier" => record.ext.modifier.clone(),
        "type" => record.ext.type_.clone(),
        "clue" => record.ext.clue.clone(),
        _ => None,
    }
}

fn render_context_lines(out: &mut String, record: &IndexRecord, before: usize, after: usize) {
    let path = std::path::Path::new(&record.directory).join(&record.filename);
    let Ok(contents) = fs::read_to_string(&path) else {
        // I/O errors while expanding context degrade the row rather
        // than abort (§4.10 failure semantics): print without context.
        return;
    };
    let lines: Vec<&str> = contents.lines().collect();
    let center = record.line.saturating_sub(1) as usize;
    let start = center.saturating_sub(before);
    let end = (center + after + 1).min(lines.len());

    for (i, line) in lines[start..end].iter().enumerate() {
        let lineno = start + i + 1;
        let marker = if lineno == record.line as usize { ">" } else { " " };
        let _ = writeln!(out, "{marker}{lineno:>6} | {line}");
    }
}

fn render_expansion(out: &mut String, record: &IndexRecord) {
    let Some(loc) = record.source_location else {
        return;
    };
    let path = std::path::Path::new(&record.directory).join(&record.filename);
    let Ok(contents) = fs::read_to_string(&path) else {
        return;
    };
    let lines: Vec<&str> = contents.lines().collect();
    let start = (loc.start_row.saturating_sub(1)) as usize;
    let end = (loc.end_row as usize).min(lines.len());

    for (i, line) in lines.iter().enumerate().take(end).skip(start) {
        let lineno = start + (i - start) + 1;
        let text = if lineno as u32 == loc.start_row {
            line.get((loc.start_col.saturating_sub(1) as usize)..).unwrap_or(line)
        } else if lineno as u32 == loc.end_row {
            line.get(..(loc.end_col.saturating_sub(1) as usize).min(line.len())).unwrap_or(line)
        } else {
            line
        };
        let _ = writeln!(out, "{lineno:>6} | {text}");
    }
}

/// TOC view (§4.10): restricted to `{filename, class, function, enum,
/// type, import}`; groups by file, section headers sorted by start
/// line, imports collapse onto one deduplicated line.
pub fn render_toc(records: &[IndexRecord]) -> Result<String, String> {
    for record in records {
        if !ContextTag::TOC_TAGS.contains(&record.context) {
            return Err(format!(
                "context '{}' is not supported in --toc mode; allowed tags: {}",
                record.context,
                ContextTag::TOC_TAGS
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    }

    let mut out = String::new();
    let mut by_file: std::collections::BTreeMap<(String, String), Vec<&IndexRecord>> = Default::default();
    for record in records {
        by_file
            .entry((record.directory.clone(), record.filename.clone()))
            .or_default()
            .push(record);
    }

    for ((directory, filename), mut file_records) in by_file {
        let _ = writeln!(out, "== {directory}/{filename} ==");
        file_records.sort_by_key(|r| r.line);

        render_toc_section(&mut out, "CLASSES", &file_records, ContextTag::Class);
        render_toc_section(&mut out, "FUNCTIONS", &file_records, ContextTag::Function);
        render_toc_section(&mut out, "ENUMS", &file_records, ContextTag::Enum);
        render_toc_section(&mut out, "TYPES", &file_records, ContextTag::Type);

        let mut imports: Vec<&str> = file_records
            .iter()
            .filter(|r| r.context == ContextTag::Import)
            .map(|r| r.full_symbol.as_str())
            .collect();
        imports.sort_unstable();
        imports.dedup();
        if !imports.is_empty() {
            let _ = writeln!(out, "IMPORTS: {}", imports.join(", "));
        }
    }

    Ok(out)
}

fn render_toc_section(out: &mut String, label: &str, records: &[&IndexRecord], tag: ContextTag) {
    let matching: Vec<&&IndexRecord> = records.iter().filter(|r| r.context == tag).collect();
    if matching.is_empty() {
        return;
    }
    let _ = writeln!(out, "{label}");
    for record in matching {
        let _ = writeln!(out, "  {} ... {}", record.full_symbol, record.line);
    }
}

/// Zero-result diagnostic (§4.10 step 6): distinguishes "pattern
/// filtered by the filter engine" from "no rows matched", and retries
/// once with wrapping wildcards when a bare pattern produced nothing.
pub fn zero_result_diagnostic(pattern: &str, was_filtered: bool) -> String {
    if was_filtered {
        format!("pattern '{pattern}' was rejected by the filter engine and can never match")
    } else if !pattern.contains('%') {
        format!(
            "no rows matched '{pattern}'; retrying with '%{pattern}%'",
        )
    } else {
        format!("no rows matched '{pattern}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ExtColumns;

    fn record(line: u32, context: ContextTag, symbol: &str) -> IndexRecord {
        IndexRecord {
            symbol: symbol.to_lowercase(),
            full_symbol: symbol.to_string(),
            directory: ".".to_string(),
            filename: "foo.c".to_string(),
            line,
            context,
            source_location: None,
            is_definition: matches!(context, ContextTag::Function | ContextTag::Class),
            ext: ExtColumns::default(),
        }
    }

    #[test]
    fn toc_rejects_unsupported_context_tags() {
        let records = vec![record(1, ContextTag::Variable, "x")];
        assert!(render_toc(&records).is_err());
    }

    #[test]
    fn toc_groups_sections_sorted_by_line_and_dedupes_imports() {
        let mut records = vec![
            record(3, ContextTag::Function, "helper"),
            record(1, ContextTag::Function, "main"),
            record(2, ContextTag::Import, "stdio.h"),
        ];
        records.push(record(2, ContextTag::Import, "stdio.h"));
        let text = render_toc(&records).expect("toc");
        let main_pos = text.find("main").unwrap();
        let helper_pos = text.find("helper").unwrap();
        assert!(main_pos < helper_pos);
        assert_eq!(text.matches("stdio.h").count(), 1);
    }

    #[test]
    fn files_only_mode_deduplicates_file_paths() {
        let records = vec![record(1, ContextTag::Function, "a"), record(2, ContextTag::Variable, "b")];
        let text = render_files_only(&records);
        assert_eq!(text.trim(), "./foo.c");
    }
}
