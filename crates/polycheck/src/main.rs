use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use polycheck_core::prelude::*;
use polycheck_utils::{info, init_logging, LogLevel, LoggingConfig};

/// Inspect the allocation-site metadata used by the type confusion checker.
#[derive(Parser, Debug)]
#[command(name = "polycheck")]
#[command(version)]
#[command(about = "Inspect allocation-site type metadata", long_about = None)]
struct Cli
{
    /// Log level (overrides POLYCHECK_LOG / RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct MetaArgs
{
    /// Metadata base path (reads `<base>.allocs` and `<base>-meta.so`)
    #[arg(long)]
    meta_base: PathBuf,
    /// Directory relative site files are resolved against (default: cwd)
    #[arg(long)]
    source_root: Option<PathBuf>,
}

impl MetaArgs
{
    fn config(&self) -> CheckerConfig
    {
        let config = CheckerConfig::new(&self.meta_base);
        match &self.source_root {
            Some(root) => config.with_source_root(Some(root.clone())),
            None => config,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Load the allocation table and print every location key
    Dump
    {
        #[command(flatten)]
        meta: MetaArgs,
    },
    /// Print the candidate types recorded for an allocation site
    Resolve
    {
        #[command(flatten)]
        meta: MetaArgs,
        /// Source file of the allocation site
        file: String,
        /// Line reported for the allocation site
        line: u32,
    },
}

fn main()
{
    let cli = Cli::parse();

    let logging = match LoggingConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };
    let logging = match cli.log_level {
        Some(level) => logging.with_level(level),
        None => logging,
    };
    let _guard = match init_logging(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    match run_command(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Returns `false` when the command ran but found nothing.
fn run_command(cli: Cli) -> PolycheckResult<bool>
{
    match cli.command {
        Commands::Dump { meta } => {
            let session = open_session(&meta)?;
            let map = session.type_map().get()?;
            println!("{} keys from {} records", map.len(), map.record_count());
            for (key, candidates) in map.dump() {
                println!("{key}");
                for site in candidates {
                    println!("    {site}");
                }
            }
            Ok(true)
        }
        Commands::Resolve { meta, file, line } => {
            let session = open_session(&meta)?;
            let mut checker = session.context();
            let site = AllocSite::new(file, line);
            info!(%site, "Resolving allocation site");

            match checker.register_alloc(Address::ZERO, &site)? {
                Registration::Registered { info, corrected } => {
                    if corrected {
                        println!("{site} (resolved with {} line correction)", checker.oracle().mode());
                    } else {
                        println!("{site}");
                    }
                    for candidate in info.candidates() {
                        println!("    {candidate} [{}]", candidate.type_handle);
                    }
                    Ok(true)
                }
                Registration::Unresolved { key } => {
                    println!("{site}: no allocation metadata for {key}");
                    Ok(false)
                }
            }
        }
    }
}

fn open_session(meta: &MetaArgs) -> PolycheckResult<Arc<Session>>
{
    let session = Session::open(meta.config(), Arc::new(LayoutCatalog::new()))?;
    Ok(Arc::new(session))
}

#[cfg(test)]
mod tests
{
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition()
    {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve()
    {
        let cli = Cli::parse_from([
            "polycheck",
            "--log-level",
            "debug",
            "resolve",
            "--meta-base",
            "/build/app",
            "src/foo.c",
            "11",
        ]);
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        let Commands::Resolve { meta, file, line } = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(meta.meta_base, PathBuf::from("/build/app"));
        assert_eq!(file, "src/foo.c");
        assert_eq!(line, 11);
        assert_eq!(meta.config().allocs_path(), PathBuf::from("/build/app.allocs"));
    }

    #[test]
    fn test_source_root_overrides_cwd()
    {
        let cli = Cli::parse_from(["polycheck", "dump", "--meta-base", "/build/app", "--source-root", "/src"]);
        let Commands::Dump { meta } = cli.command else {
            panic!("expected dump");
        };
        assert_eq!(meta.config().qualify("foo.c"), "/src/foo.c");
    }
}
