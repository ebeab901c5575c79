//! dualpack - Build dual ESM/CJS packages from a single source tree
//!
//! This is the main entry point for the dualpack binary.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dualpack::build::{run_build, BuildSummary};
use dualpack::cli::Cli;
use dualpack::config::BuildConfig;
use dualpack::transform::PassthroughTransform;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing; --verbose raises the default filter to the
    // driver's per-file debug events unless RUST_LOG overrides it.
    let default_filter = if cli.verbose { "dualpack=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = match BuildConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            return ExitCode::FAILURE;
        }
    };

    let summary = match run_build(config, Arc::new(PassthroughTransform)).await {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            return ExitCode::FAILURE;
        }
    };

    for failure in &summary.failures {
        eprintln!("{}", failure.error.to_string().red());
    }

    if !cli.quiet {
        print_summary(&summary);
    }

    if summary.failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(summary: &BuildSummary) {
    let files = plural(summary.files_compiled, "file");
    println!(
        "Successfully compiled {} {} as ESM and CJS in {}ms.",
        summary.files_compiled,
        files,
        summary.compile_time.as_millis()
    );

    if summary.dts_files_updated > 0 {
        let files = plural(summary.dts_files_updated, "typescript declaration file");
        println!(
            "Successfully copied and updated {} {} in {}ms.",
            summary.dts_files_updated,
            files,
            summary.dts_time.as_millis()
        );
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}
