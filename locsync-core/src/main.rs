use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fern::Dispatch;
use log::{error, info, Level, LevelFilter};

use locsync_core::services::fetch::refresh_cache;
use locsync_core::{run, SyncConfig};

#[derive(Debug, Parser)]
#[command(name = "locsync", version, about = "Daggerheart translation sync")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (defaults to ./locsync.json when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "DIR")]
    translations_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "DIR")]
    original_dir: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Merge the cached API data into the translation files (default)
    Update,
    /// Download the API data into the cache
    Fetch,
}

fn init_logger(level: LevelFilter) {
    let stdout = Dispatch::new()
        .filter(|meta| meta.level() > Level::Warn)
        .format(|out, message, _| out.finish(format_args!("{message}")))
        .chain(std::io::stdout());
    let stderr = Dispatch::new()
        .filter(|meta| meta.level() <= Level::Warn)
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .chain(std::io::stderr());

    if let Err(e) = Dispatch::new().level(level).chain(stdout).chain(stderr).apply() {
        eprintln!("Failed to apply logger: {e:?}");
    }
}

fn load_config(cli: &Cli) -> locsync_core::Result<SyncConfig> {
    let mut config = SyncConfig::load(cli.config.as_deref())?;
    config.apply_env();
    if let Some(dir) = &cli.translations_dir {
        config.translations_dir = dir.clone();
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(dir) = &cli.original_dir {
        config.original_dir = dir.clone();
    }
    if cli.quiet {
        config.quiet = true;
    }
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_logger(LevelFilter::Warn);
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let level = if config.quiet {
        LevelFilter::Warn
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    init_logger(level);

    match cli.command.unwrap_or(Command::Update) {
        Command::Fetch => match refresh_cache(&config) {
            Ok(written) => {
                info!("Wrote {written} cache files to {}", config.cache_dir.display());
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("{err}");
                ExitCode::FAILURE
            }
        },
        Command::Update => match run(&config) {
            Ok(report) if report.has_failures() => ExitCode::FAILURE,
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                error!("{err}");
                ExitCode::FAILURE
            }
        },
    }
}
