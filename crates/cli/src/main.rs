//! charrec - character recognition from the command line
//!
//! Wires the Haar cascade detector and the ONNX classifier into the
//! recognition pipeline and prints one JSON report per image.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rayon::ThreadPoolBuilder;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::labels::LabelsCommand;
use commands::recognize::RecognizeCommand;

#[derive(Parser)]
#[command(
    name = "charrec",
    version,
    about = "Recognize roster characters in images",
    long_about = "Find character regions with a Haar cascade, classify each padded region with an \
                  ONNX model, and rank the detections by fused confidence.",
    after_help = "EXAMPLES:\n  \
                  # Recognize characters in one image\n  \
                  charrec recognize --cascade models/haarcascade_frontalface_default.xml \\\n    \
                  --model models/classifier.onnx --labels models/class_names.json shot.png\n\n  \
                  # Many images in parallel, custom tuning\n  \
                  charrec recognize --cascade c.xml --model m.onnx --labels l.json \\\n    \
                  --config recognition.yaml *.png\n\n  \
                  # Whole-image classification without region proposal\n  \
                  charrec recognize --cascade c.xml --model m.onnx --labels l.json --whole-image shot.png\n\n  \
                  # List labels and display names\n  \
                  charrec labels --model-info models/model_info.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize characters in one or more images
    Recognize(RecognizeCommand),

    /// List the classifier's labels with display names
    Labels(LabelsCommand),
}

fn main() -> Result<()> {
    // Cap the rayon pool, mainly for tests running several binaries at once
    if let Ok(threads_str) = std::env::var("CHARREC_THREADS") {
        if let Ok(num_threads) = threads_str.parse::<usize>() {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .ok();
        }
    }

    let cli = Cli::parse();

    let log_level = match &cli.command {
        Commands::Labels(_) => Level::WARN,
        Commands::Recognize(_) => {
            if cli.verbose {
                Level::DEBUG
            } else {
                Level::INFO
            }
        }
    };

    // Reports go to stdout, logs to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Recognize(cmd) => cmd.execute(),
        Commands::Labels(cmd) => cmd.execute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_recognize() {
        let cli = Cli::try_parse_from([
            "charrec",
            "recognize",
            "--cascade",
            "c.xml",
            "--model",
            "m.onnx",
            "--labels",
            "l.json",
            "--pretty",
            "a.png",
            "b.png",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Recognize(_)));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_recognize_requires_images() {
        let result = Cli::try_parse_from([
            "charrec",
            "recognize",
            "--cascade",
            "c.xml",
            "--model",
            "m.onnx",
            "--labels",
            "l.json",
        ]);
        assert!(result.is_err());
    }
}
