//! Tanglit CLI - extract code from literate documents.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use tanglit::{Scanner, TangleError};

#[derive(Parser)]
#[command(name = "tanglit")]
#[command(author, version, about = "A very simple literate programming tool", long_about = None)]
struct Cli {
    /// Literate source document to tangle
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// String preceding tanglit commands
    #[arg(short = 'c', long = "command-string", value_name = "STRING")]
    command_string: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory destination paths are resolved against
    #[arg(short = 'C', long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Maps fatal failures to distinct exit codes.
fn exit_code(error: &TangleError) -> u8 {
    match error {
        TangleError::RecursionLimitExceeded { .. } => 2,
        TangleError::BlockNotFound { .. } => 3,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Running without a document prints usage and succeeds.
    let Some(file) = cli.file else {
        eprintln!("{}", Cli::command().render_help());
        return ExitCode::SUCCESS;
    };

    // Determine the base directory for destination files
    let base_dir = cli
        .directory
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    // Read configuration from file or use defaults
    let mut config = match cli.config {
        Some(ref path) => match tanglit::config::read_config_file(path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Error: {}", error);
                return ExitCode::FAILURE;
            }
        },
        None => match tanglit::config::read_config(&base_dir) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Error: {}", error);
                return ExitCode::FAILURE;
            }
        },
    };

    // Override the marker if specified on the command line
    if let Some(marker) = cli.command_string {
        config.marker = marker;
    }

    match Scanner::new(config, base_dir).tangle_file(&file) {
        Ok(summary) => {
            tracing::info!(
                "tangled {} into {} file(s)",
                file.display(),
                summary.files.len()
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::from(exit_code(&error))
        }
    }
}
