mod pipeline;
mod segment;

use clap::Parser;
use cutout_common::config::Config;
use pipeline::CutoutError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;

/// Remove the uniform background from a stack of raw RGBA frames.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input container: i32 n, h, w followed by n*h*w RGBA records.
    input: PathBuf,

    /// Where to write the processed container.
    output: PathBuf,

    /// Per-channel color tolerance against the detected background color.
    #[arg(allow_negative_numbers = true)]
    tolerance: i32,

    /// Optional TOML config file.
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[cutout] {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    match pipeline::run(&args.input, &args.output, args.tolerance, &config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "cutout failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, CutoutError> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}
