//! `ic`'s command-line surface (§6 Indexer CLI).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "ic", about = "Index source files into the symbol store")]
pub struct IcArgs {
    /// One or more directories, or one or more regular files (not mixed).
    #[arg(required = true)]
    pub targets: Vec<PathBuf>,

    /// Run a single pass and exit; default is daemon mode.
    #[arg(long)]
    pub once: bool,

    #[arg(long)]
    pub quiet_init: bool,

    #[arg(long)]
    pub silent: bool,

    #[arg(long)]
    pub verbose: bool,

    #[arg(long)]
    pub debug: bool,

    #[arg(long = "exclude-dir", num_args = 1..)]
    pub exclude_dir: Vec<String>,

    #[arg(short = 'f', long = "db-file", default_value = "code-index.db")]
    pub db_file: PathBuf,

    #[arg(long)]
    pub echo: Option<String>,
}

impl IcArgs {
    /// Split `self.targets` into the directories-xor-files contract
    /// §6 requires, rejecting a mixed set as a config error.
    pub fn resolve_targets(&self) -> anyhow::Result<crate::driver::Targets> {
        let all_dirs = self.targets.iter().all(|t| t.is_dir());
        let all_files = self.targets.iter().all(|t| t.is_file());

        if all_dirs {
            Ok(crate::driver::Targets::Directories(self.targets.clone()))
        } else if all_files {
            Ok(crate::driver::Targets::Files(self.targets.clone()))
        } else {
            anyhow::bail!(crate::error::ConfigError::new(
                "targets must be either all directories or all regular files, not mixed"
            ));
        }
    }
}
