//! Proverbs CLI - import and query tagged proverbs over a pluggable store

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use proverbs::BackendKind;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "proverbs")]
#[command(version)]
#[command(about = "Load tagged proverbs into a relational, document or key-value store and query them")]
#[command(long_about = r#"
Proverbs loads a comma-separated file of tagged sayings into one of three
stores and answers list, substring and tag queries against it.

Example usage:
  proverbs init
  proverbs import go-proverbs.csv
  proverbs contains "interface"
  proverbs --backend kv tagged error
"#)]
struct Cli {
    /// Path to the config file (default: ./proverbs.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend; overrides PROVERBS_BACKEND and the config file
    #[arg(short, long, global = true, value_parser = parse_backend)]
    backend: Option<BackendKind>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputMode::Text)]
    format: OutputMode,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a source file atomically
    Import {
        /// Comma-separated file with `tags` and `proverb` columns
        path: PathBuf,
    },

    /// List every stored proverb
    All,

    /// Proverbs whose text contains TEXT, ignoring case
    Contains {
        text: String,
    },

    /// Proverbs carrying exactly TAG
    Tagged {
        tag: String,
    },

    /// List tags with the number of proverbs carrying each
    Tags,

    /// Show statistics about the store
    Stats,

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Text
    }
}

/// Print `data` as pretty JSON on stdout
pub fn emit_json<T: serde::Serialize>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn parse_backend(raw: &str) -> Result<BackendKind, String> {
    raw.parse::<BackendKind>().map_err(|e| e.to_string())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = commands::Context {
        config_path: cli.config,
        backend: cli.backend,
        output: cli.format,
    };

    match cli.command {
        Commands::Import { path } => commands::run_import(&ctx, &path),
        Commands::All => commands::run_all(&ctx),
        Commands::Contains { text } => commands::run_contains(&ctx, &text),
        Commands::Tagged { tag } => commands::run_tagged(&ctx, &tag),
        Commands::Tags => commands::run_tags(&ctx),
        Commands::Stats => commands::run_stats(&ctx),
        Commands::Init { force } => commands::run_init(&ctx, force),
    }
}

/// Exit code for a failed run: the taxonomy code when the failure came from
/// the library, otherwise a usage/configuration failure.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<proverbs::Error>()
        .map(proverbs::Error::exit_code)
        .unwrap_or(1)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("{:?}", err);
            proverbs::ui::error(&format!("{:#}", err));
            ExitCode::from(exit_code(&err))
        }
    }
}
