//! The query binary: splices `$HOME/.smconfig`'s `[qi]` section ahead
//! of argv, pulls schema-registered column filters out of the
//! remainder, plans and executes the query, then prints results (§6).

use std::process::ExitCode;

use clap::Parser;
use rusqlite::Connection;
use smindex::cli_qi::{extract_column_filters, QiArgs};
use smindex::query::printer::{self, PrintOptions};
use smindex::query::{self, expand_context_tags, QueryRequest};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("qi: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = smindex::config::load()?;
    let raw_argv: Vec<String> = std::env::args().collect();
    let spliced = smindex::config::prepend_config_args(&config.qi, raw_argv);
    let (column_filters, remaining) = extract_column_filters(spliced);

    let args = QiArgs::try_parse_from(remaining).map_err(|e| {
        e.print().ok();
        anyhow::anyhow!("argument parsing failed")
    })?;

    init_tracing(args.debug, args.verbose);

    let include_context = expand_context_tags(&args.include_context)?;
    let exclude_context = if include_context.is_empty() {
        expand_context_tags(&args.exclude_context)?
    } else {
        Vec::new()
    };

    let def_filter = if args.def {
        Some(true)
    } else if args.usage {
        Some(false)
    } else {
        args.def_flag.map(|v| v != 0)
    };

    let request = QueryRequest {
        patterns: args.patterns.clone(),
        include_context,
        exclude_context,
        column_filters,
        file_filters: args.file_filters.clone(),
        proximity: args.and,
        def_filter,
        limit: args.limit,
        limit_per_file: args.limit_per_file,
    };

    let conn = Connection::open(&args.db_file)?;
    let records = query::execute(&conn, &request)?;

    if records.is_empty() {
        println!("{}", printer::zero_result_diagnostic(&args.patterns[0], false));
        return Ok(());
    }

    if args.toc {
        match printer::render_toc(&records) {
            Ok(text) => print!("{text}"),
            Err(message) => eprintln!("qi: {message}"),
        }
        return Ok(());
    }

    let options = PrintOptions {
        full: args.full,
        compact: args.compact,
        columns: args.columns.clone(),
        before: args.before.max(args.context_lines),
        after: args.after.max(args.context_lines),
        expand_definitions: args.expand,
        files_only: args.files,
    };

    print!("{}", printer::render(&records, &options));
    Ok(())
}

/// §6: `--debug` emits the planned SQL (via `query::run_query`'s
/// `debug!` call); plain runs stay at `warn` so query-path diagnostics
/// don't spam stdout-adjacent stderr by default.
fn init_tracing(debug: bool, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let directive = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
