//! limpiar CLI - data quality pipeline over CSV datasets.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![allow(clippy::uninlined_format_args)]

use std::process::ExitCode;

use clap::Parser;

use limpiar::cli::{cmd_clean, cmd_info, cmd_report, cmd_score, Commands};

/// limpiar - Data Quality Pipeline and Versioned Tabular Editing
#[derive(Parser)]
#[command(name = "limpiar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Info { path } => cmd_info(path),
        Commands::Clean {
            path,
            output,
            factors,
            target,
            report,
        } => cmd_clean(
            path,
            output.as_deref(),
            factors.as_ref(),
            target.as_deref(),
            report.as_deref(),
        ),
        Commands::Score { path, json } => cmd_score(path, *json),
        Commands::Report { path, output } => cmd_report(path, output.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
