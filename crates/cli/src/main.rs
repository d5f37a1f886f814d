// pudl CLI - load the curated utility/plant cross-reference into the store

mod exit_codes;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pudl_config::Settings;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "pudl")]
#[command(about = "Resolve utility and plant identities across public datasets and load a normalized store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the cross-reference and replace the store content
    #[command(after_help = "\
Examples:
  pudl load --input mapping_eia923_ferc1.xlsx
  pudl load --input crossref/ --store pudl.sqlite
  pudl load --input mapping_eia923_ferc1.xlsx --replace
  pudl load --mapping my.mapping.toml --input crossref.xlsx --json
  pudl load --input crossref.xlsx --output load.json")]
    Load {
        /// Mapping config (default: settings `input.mapping`, else built-in EIA-923/FERC1)
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Cross-reference workbook or directory of <sheet>.csv files
        #[arg(long)]
        input: Option<PathBuf>,

        /// SQLite store (default: $PUDL_STORE, settings `store.path`, else the user data dir)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Drop and reload a store that already holds pipeline tables
        #[arg(long)]
        replace: bool,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Reconcile the cross-reference without writing anything
    #[command(after_help = "\
Examples:
  pudl check mapping_eia923_ferc1.xlsx
  pudl check crossref/ --mapping my.mapping.toml --json")]
    Check {
        /// Cross-reference workbook or directory of <sheet>.csv files
        input: PathBuf,

        /// Mapping config
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,
    },

    /// Validate a mapping config without reading any data
    #[command(after_help = "\
Examples:
  pudl validate mappings/eia923_ferc1.mapping.toml")]
    Validate {
        /// Path to the .mapping.toml file
        mapping: PathBuf,
    },

    /// Show what the store currently holds
    #[command(after_help = "\
Examples:
  pudl status
  pudl status --store pudl.sqlite --json")]
    Status {
        /// SQLite store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Mapping config the store was loaded with
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,
    },

    /// Print the DDL of the normalized schema
    #[command(after_help = "\
Examples:
  pudl schema
  pudl schema --mapping my.mapping.toml > schema.sql")]
    Schema {
        /// Mapping config
        #[arg(long)]
        mapping: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("hint:  fix or remove {}", Settings::config_path_display());
            return ExitCode::from(EXIT_ERROR);
        }
    };
    init_logging(&settings.log.level);

    let result = match cli.command {
        Commands::Load { mapping, input, store, replace, json, output } => {
            pipeline::cmd_load(&settings, mapping, input, store, replace, json, output)
        }
        Commands::Check { input, mapping, json } => pipeline::cmd_check(&settings, input, mapping, json),
        Commands::Validate { mapping } => pipeline::cmd_validate(mapping),
        Commands::Status { store, mapping, json } => pipeline::cmd_status(&settings, store, mapping, json),
        Commands::Schema { mapping } => pipeline::cmd_schema(&settings, mapping),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Diagnostics go to stderr so `--json` stdout stays a single value.
/// `RUST_LOG` wins over the settings file.
fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
