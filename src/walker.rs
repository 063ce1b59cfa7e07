//! File walker: recursively enumerate files matching configured
//! extensions, honoring ignore patterns (§4.6).

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

pub struct WalkerConfig {
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
}

fn build_exclude_set(exclude_dirs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in exclude_dirs {
        let trimmed = pattern.trim_end_matches('/');
        if trimmed.contains('/') {
            builder.add(Glob::new(trimmed)?);
        } else if trimmed.contains('*') || trimmed.contains('?') || trimmed.contains('[') {
            builder.add(Glob::new(trimmed)?);
        } else {
            // plain basename: match anywhere in the tree, at any depth.
            builder.add(Glob::new(&format!("**/{trimmed}"))?);
            builder.add(Glob::new(&format!("**/{trimmed}/**"))?);
        }
    }
    Ok(builder.build()?)
}

/// Recursively enumerate files under `roots` whose basename ends in one
/// of `config.extensions`, skipping anything matched by
/// `config.exclude_dirs` (plain names, globs, or path-shaped
/// fragments).
pub fn walk(roots: &[PathBuf], config: &WalkerConfig) -> Result<Vec<PathBuf>> {
    let exclude_set = build_exclude_set(&config.exclude_dirs)?;
    let mut out = Vec::new();

    for root in roots {
        let mut builder = WalkBuilder::new(root);
        builder.hidden(false);
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            if is_excluded(path, root, &exclude_set) {
                continue;
            }
            if has_allowed_extension(path, &config.extensions) {
                out.push(path.to_path_buf());
            }
        }
    }

    Ok(out)
}

fn is_excluded(path: &Path, root: &Path, exclude_set: &GlobSet) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    exclude_set.is_match(relative) || exclude_set.is_match(path)
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walk_finds_files_by_extension_and_skips_excluded_dirs() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("src/a.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("vendor/b.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("src/c.txt"), "not code").unwrap();

        let config = WalkerConfig {
            extensions: vec!["rs".to_string()],
            exclude_dirs: vec!["vendor".to_string()],
        };
        let files = walk(&[dir.path().to_path_buf()], &config).expect("walk");

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/a.rs"));
    }
}
