//! brisque-score CLI - Assess image quality with BRISQUE.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brisque_score::{report, Config, QualityScorer};

/// Compute a no-reference BRISQUE quality score for an image (lower is better).
#[derive(Parser, Debug)]
#[command(name = "brisque-score")]
#[command(version, about, long_about = None)]
struct Args {
    /// Image to assess.
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// BRISQUE SVR model in OpenCV YAML format. Downloaded when omitted.
    #[arg(long, value_name = "FILE")]
    model_file: Option<PathBuf>,

    /// BRISQUE feature range file in OpenCV YAML format. Downloaded when omitted.
    #[arg(long, value_name = "FILE")]
    range_file: Option<PathBuf>,

    /// Never download model files; fail if they are not cached.
    #[arg(long)]
    offline: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("brisque_score={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    let config = Config {
        model_file: args.model_file.clone(),
        range_file: args.range_file.clone(),
        offline: args.offline,
        ..Config::default()
    };

    let scorer = QualityScorer::with_brisque(config).context("Failed to initialize scorer")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Invalid spinner template")?,
    );
    spinner.set_message("Calculating result...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let score = match scorer.score_path(&args.image) {
        Ok(score) => score,
        Err(err) => {
            spinner.abandon_with_message("Calculation failed");
            return Err(err)
                .with_context(|| format!("Failed to assess {}", args.image.display()));
        }
    };

    spinner.finish_with_message("Calculation completed!");

    println!("\n Image Quality Assessment Results:");
    println!(" {}\n", report::score_line(score));
    print!("{}", report::interpretation_guide());

    Ok(())
}
