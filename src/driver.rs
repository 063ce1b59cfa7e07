//! The indexer driver (§4.8): orchestrates config/preflight, the
//! initial pass over targets, and the daemon watch loop.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::error::ConfigError;
use crate::filter::FilterEngine;
use crate::language;
use crate::record::ParseResultBuffer;
use crate::store::SymbolStore;
use crate::walker::{self, WalkerConfig};
use crate::watcher::{EventKind, FileWatcher};

pub enum Targets {
    Directories(Vec<PathBuf>),
    Files(Vec<PathBuf>),
}

pub struct DriverConfig {
    pub targets: Targets,
    pub db_file: PathBuf,
    pub exclude_dirs: Vec<String>,
    pub once: bool,
    pub echo: Option<String>,
    pub quiet: bool,
}

/// Install SIGINT/SIGTERM handlers that flip a shared flag (§5
/// cancellation: "a single shutdown flag set by signal handlers").
pub fn install_signal_handlers() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("failed to register SIGTERM handler")?;
    Ok(shutdown)
}

/// Run the full driver sequence (§4.8 steps 2-6). Config loading and
/// argv splicing (step 1) happen in the `ic` binary before `DriverConfig`
/// is constructed, since they must be visible to `clap` itself.
pub fn run(config: DriverConfig) -> Result<()> {
    if let Some(msg) = &config.echo {
        println!("{msg}");
    }

    preflight(&config)?;

    // No shared stopword list is configured by default (§4.2 treats it
    // as an optional, separately loaded source); every language's own
    // keyword list is still applied per file below.
    let stopwords: HashSet<String> = HashSet::new();
    let store = SymbolStore::open(&config.db_file)
        .with_context(|| format!("failed to open store at {}", config.db_file.display()))?;

    let mut buf = ParseResultBuffer::new();
    let mut files_indexed = 0usize;
    let mut records_written = 0usize;

    match &config.targets {
        Targets::Files(files) => {
            for file in files {
                records_written += index_one_file(&store, &stopwords, &mut buf, file)?;
                files_indexed += 1;
            }
        }
        Targets::Directories(roots) => {
            let walk_config = WalkerConfig {
                extensions: language::all_extensions().iter().map(|s| s.to_string()).collect(),
                exclude_dirs: config.exclude_dirs.clone(),
            };
            let files = walker::walk(roots, &walk_config)?;
            for file in &files {
                records_written += index_one_file(&store, &stopwords, &mut buf, file)?;
                files_indexed += 1;
            }
        }
    }

    if config.once {
        if !config.quiet {
            println!(
                "Indexed {files_indexed} file(s) and {records_written} record(s) into {}",
                config.db_file.display()
            );
        }
        store.close()?;
        return Ok(());
    }

    run_daemon(&config, &store, &stopwords, &mut buf)?;
    store.close()?;
    Ok(())
}

fn preflight(config: &DriverConfig) -> Result<()> {
    match &config.targets {
        Targets::Files(files) => {
            if files.is_empty() {
                anyhow::bail!(ConfigError::new("no target files given"));
            }
            for file in files {
                if !file.is_file() {
                    anyhow::bail!(ConfigError::new(format!(
                        "target {} is not a regular file",
                        file.display()
                    )));
                }
                let has_backend = language::backend_for_path(file).is_some();
                if !has_backend {
                    anyhow::bail!(ConfigError::new(format!(
                        "target {} has no registered language backend",
                        file.display()
                    )));
                }
            }
        }
        Targets::Directories(dirs) => {
            if dirs.is_empty() {
                anyhow::bail!(ConfigError::new("no target directories given"));
            }
            for dir in dirs {
                if !dir.is_dir() {
                    anyhow::bail!(ConfigError::new(format!(
                        "target {} is not a directory",
                        dir.display()
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Parse one file into the reused buffer and, if non-empty, replace its
/// rows atomically (§4.8 step 5, §5 ordering: delete precedes insert,
/// both inside one transaction).
fn index_one_file(store: &SymbolStore, stopwords: &HashSet<String>, buf: &mut ParseResultBuffer, path: &Path) -> Result<usize> {
    buf.clear();

    let Some(backend) = language::backend_for_path(path) else {
        return Ok(0);
    };

    // Each language rejects its own keyword set in addition to the
    // shared stopwords (§4.2): built fresh per file since backends
    // differ by extension within one walk.
    let keywords: HashSet<String> = backend.keywords().iter().map(|k| k.to_string()).collect();
    let filter = FilterEngine::new(stopwords.clone(), keywords);

    let source = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
            return Ok(0);
        }
    };

    let source_text = String::from_utf8_lossy(&source);
    let directory = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();

    let tree = match backend.parse(&source) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "parser produced no tree, skipping");
            return Ok(0);
        }
    };

    // The mandatory filename record still goes through the same filter
    // contract as every other emission (§4.3's "non-empty symbol of
    // length >= 2 after filtering" has no filename exemption): a stem
    // too short to pass `should_index` is simply not emitted, rather
    // than violating the invariant.
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    if filter.should_index(&stem) {
        buf.add_entry(
            &stem,
            1,
            crate::record::ContextTag::Filename,
            &directory,
            &filename,
            None,
            false,
            Default::default(),
        );
    }

    backend.visit(&source_text, &tree, &directory, &filename, &filter, buf);

    if buf.is_empty() {
        return Ok(0);
    }

    let record_count = buf.len();
    store.begin_transaction()?;
    match store.delete_by_file(&directory, &filename).and_then(|_| store.insert_all(buf.iter())) {
        Ok(()) => store.commit_transaction()?,
        Err(e) => {
            store.rollback_transaction()?;
            return Err(e);
        }
    }
    tracing::info!(path = %path.display(), records = record_count, "indexed file");
    Ok(record_count)
}

/// Daemon watch loop (§4.8 step 6, §5 cancellation): subscribe the
/// watcher over every target directory, then `wait -> reindex-each ->
/// commit` until a signal flips the shutdown flag.
fn run_daemon(config: &DriverConfig, store: &SymbolStore, stopwords: &HashSet<String>, buf: &mut ParseResultBuffer) -> Result<()> {
    let Targets::Directories(roots) = &config.targets else {
        // Daemon mode only applies to directory targets (§4.8 step 6).
        return Ok(());
    };

    let shutdown = install_signal_handlers()?;
    let mut watcher = FileWatcher::new(Arc::clone(&shutdown))?;
    let extensions: Vec<String> = language::all_extensions().iter().map(|s| s.to_string()).collect();
    for root in roots {
        watcher.add_directory(root, &extensions)?;
    }

    while !shutdown.load(Ordering::SeqCst) {
        let events = watcher.wait(256)?;
        if events.is_empty() {
            continue;
        }
        for event in events {
            match event.kind {
                EventKind::Deleted => {
                    let directory = event.path.parent().map(|p| p.display().to_string()).unwrap_or_default();
                    let filename = event.path.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default();
                    store.begin_transaction()?;
                    store.delete_by_file(&directory, &filename)?;
                    store.commit_transaction()?;
                }
                EventKind::Created | EventKind::Modified => {
                    index_one_file(store, stopwords, buf, &event.path)?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn single_character_stem_yields_no_filename_record() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("a.c");
        std::fs::write(&file, "int main(int argc, char **argv){ return 0; }\n").expect("write source");

        let store = SymbolStore::open(&dir.path().join("code-index.db")).expect("open store");
        let stopwords: HashSet<String> = HashSet::new();
        let mut buf = ParseResultBuffer::new();

        index_one_file(&store, &stopwords, &mut buf, &file).expect("index file");

        assert!(
            !buf.iter().any(|r| matches!(r.context, crate::record::ContextTag::Filename)),
            "a one-character stem fails should_index and must not produce a filename record"
        );
        assert!(buf.iter().any(|r| r.symbol == "main"), "real definitions still get indexed");
    }
}
