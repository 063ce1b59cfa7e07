//! `$HOME/.smconfig` loading and argv-splicing (§6, §4.8 step 1).
//!
//! The file is INI-like: `[ic]` holds indexer defaults, `[qi]` holds
//! query defaults. Each non-empty, non-comment line inside a section is
//! tokenized on whitespace and prepended to argv ahead of `clap`
//! parsing, unless the same flag already appears on the real
//! command line.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::error::ConfigError;

#[derive(Debug, Default, Clone)]
pub struct SmConfig {
    pub ic: Vec<String>,
    pub qi: Vec<String>,
}

/// Search order per §6: `$INDEXER_DATA_DIR/.smconfig` first, then
/// `$HOME/.smconfig`.
pub fn config_search_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("INDEXER_DATA_DIR") {
        let candidate = PathBuf::from(dir).join(".smconfig");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        let candidate = PathBuf::from(home).join(".smconfig");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

pub fn load() -> Result<SmConfig> {
    let Some(path) = config_search_path() else {
        return Ok(SmConfig::default());
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    parse(&contents).map_err(|message| anyhow::anyhow!(ConfigError::new(message)))
}

fn parse(contents: &str) -> Result<SmConfig, String> {
    let mut config = SmConfig::default();
    let mut current: Option<&mut Vec<String>> = None;

    for (lineno, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            current = match section {
                "ic" => Some(&mut config.ic),
                "qi" => Some(&mut config.qi),
                other => {
                    return Err(format!(
                        "{}:{}: unknown config section [{}]",
                        "$HOME/.smconfig",
                        lineno + 1,
                        other
                    ))
                }
            };
            continue;
        }

        let Some(section) = current.as_deref_mut() else {
            return Err(format!(
                "line {} appears before any [section] header",
                lineno + 1
            ));
        };
        section.extend(line.split_whitespace().map(str::to_string));
    }

    Ok(config)
}

/// Prepend `section_tokens` to `argv` unless a flag they set already
/// appears in `argv`. `argv[0]` (the program name) is preserved at the
/// front.
pub fn prepend_config_args(section_tokens: &[String], argv: Vec<String>) -> Vec<String> {
    if section_tokens.is_empty() || argv.is_empty() {
        return argv;
    }

    let present_flags: std::collections::HashSet<&str> = argv
        .iter()
        .skip(1)
        .filter(|a| a.starts_with('-'))
        .map(|a| a.as_str())
        .collect();

    let mut to_prepend = Vec::new();
    let mut tokens = section_tokens.iter().peekable();
    while let Some(token) = tokens.next() {
        if token.starts_with('-') {
            if present_flags.contains(token.as_str()) {
                // Skip this flag and its value tokens until the next flag.
                while let Some(next) = tokens.peek() {
                    if next.starts_with('-') {
                        break;
                    }
                    tokens.next();
                }
                continue;
            }
        }
        to_prepend.push(token.clone());
    }

    let mut result = Vec::with_capacity(argv.len() + to_prepend.len());
    result.push(argv[0].clone());
    result.extend(to_prepend);
    result.extend(argv.into_iter().skip(1));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_into_token_lists() {
        let contents = "[ic]\n--once\n--exclude-dir vendor node_modules\n\n[qi]\n--limit 20\n";
        let config = parse(contents).expect("parse");
        assert_eq!(config.ic, vec!["--once", "--exclude-dir", "vendor", "node_modules"]);
        assert_eq!(config.qi, vec!["--limit", "20"]);
    }

    #[test]
    fn rejects_unknown_sections() {
        let contents = "[bogus]\nfoo\n";
        assert!(parse(contents).is_err());
    }

    #[test]
    fn cli_flag_suppresses_matching_config_line() {
        let section = vec!["--limit".to_string(), "20".to_string(), "--once".to_string()];
        let argv = vec!["qi".to_string(), "--limit".to_string(), "5".to_string(), "pattern".to_string()];
        let spliced = prepend_config_args(&section, argv);
        // --limit from config is suppressed (CLI already has it); --once survives.
        assert_eq!(spliced, vec!["qi", "--once", "--limit", "5", "pattern"]);
    }
}
