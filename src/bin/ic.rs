//! The indexer binary: splices `$HOME/.smconfig`'s `[ic]` section ahead
//! of the real argv, then runs the driver (§4.8, §6).

use std::process::ExitCode;

use clap::Parser;
use smindex::cli_ic::IcArgs;
use smindex::driver::{self, DriverConfig};

fn main() -> ExitCode {
    let config = match smindex::config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ic: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let raw_argv: Vec<String> = std::env::args().collect();
    let spliced = smindex::config::prepend_config_args(&config.ic, raw_argv);

    let args = match IcArgs::try_parse_from(spliced) {
        Ok(a) => a,
        Err(e) => {
            e.print().ok();
            return ExitCode::FAILURE;
        }
    };

    init_tracing(args.silent, args.quiet_init, args.verbose, args.debug);

    let targets = match args.resolve_targets() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("ic: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let driver_config = DriverConfig {
        targets,
        db_file: args.db_file,
        exclude_dirs: args.exclude_dir,
        once: args.once,
        echo: args.echo,
        quiet: args.silent,
    };

    match driver::run(driver_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ic: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(silent: bool, quiet_init: bool, verbose: bool, debug: bool) {
    use tracing_subscriber::EnvFilter;

    // Logging: `--silent` -> error, `--debug`/`--verbose` -> debug,
    // `--quiet-init` -> warn (suppresses the per-file `info!` lines but
    // keeps warn/error visible), plain runs default to info.
    let directive = if silent {
        "error"
    } else if debug || verbose {
        "debug"
    } else if quiet_init {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
