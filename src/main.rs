//! latido CLI entry point

use clap::Parser;
use latido::analysis::load_classifier;
use latido::config::{Cli, Settings};
use latido::pipeline;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    // Validate inputs
    if let Err(e) = validate_inputs(&cli) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    // Build settings from CLI
    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if settings.dry_run {
        return match pipeline::dry_run(&settings) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    // The model is loaded once, before any clip is read
    let classifier = match load_classifier(&settings) {
        Ok(classifier) => classifier,
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Run the pipeline
    match pipeline::run(&settings, classifier) {
        Ok(result) => {
            if let Some(path) = &result.report_path {
                eprintln!();
                eprintln!(
                    "Summary: {} successful, {} failed (of {} total) -> {}",
                    result.successful,
                    result.failed,
                    result.total_clips,
                    path.display()
                );
            }

            if result.failed > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = cli.log_level().to_string().to_lowercase();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn validate_inputs(cli: &Cli) -> Result<(), String> {
    if !cli.input.exists() {
        return Err(format!(
            "Input path does not exist: {}\n\n  Tip: Check the path is correct and accessible.\n  Examples:\n    latido -i ./grabacion.3gp --glucose 98\n    latido -i ./grabaciones -o ./informes --glucose 5.4 --unit mmol/l",
            cli.input.display()
        ));
    }

    // Check output parent directory exists (we'll create the output dir itself)
    if cli.input.is_dir() {
        if let Some(parent) = cli.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(format!(
                    "Output parent directory does not exist: {}\n\n  Tip: The output directory will be created automatically,\n  but its parent directory must exist.\n  Example: mkdir -p {}",
                    parent.display(),
                    parent.display()
                ));
            }
        }
    }

    Ok(())
}
