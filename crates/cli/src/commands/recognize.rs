//! Recognize command - one JSON report per input image

use super::load_labels;
use anyhow::{Context as _, Result};
use character_recognition_classification::{ClassifierConfig, OnnxCharacterClassifier};
use character_recognition_pipeline::{
    CharacterRecognizer, ClassificationEntry, RecognitionConfig, RecognitionReport,
};
use character_recognition_region_detection::{CascadeConfig, CascadeDetector};
use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

#[derive(Args)]
pub struct RecognizeCommand {
    /// Input image paths
    #[arg(value_name = "IMAGES", required = true)]
    inputs: Vec<PathBuf>,

    /// OpenCV Haar cascade XML used for region proposal
    #[arg(long)]
    cascade: PathBuf,

    /// ONNX classifier model
    #[arg(long)]
    model: PathBuf,

    /// JSON array of class names in model output order
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Training metadata (model_info.json); supplies labels when --labels is absent
    #[arg(long)]
    model_info: Option<PathBuf>,

    /// Recognition config (YAML); defaults apply to missing keys
    #[arg(long)]
    config: Option<PathBuf>,

    /// Classify the whole image without region proposal
    #[arg(long, default_value = "false")]
    whole_image: bool,

    /// Pretty-print JSON output
    #[arg(long, default_value = "false")]
    pretty: bool,
}

/// Output record for one image
#[derive(Serialize)]
struct ImageOutput<'a> {
    file: String,
    #[serde(flatten)]
    result: ImageResult<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ImageResult<'a> {
    Report(&'a RecognitionReport),
    Predictions { predictions: &'a [ClassificationEntry] },
}

enum Outcome {
    Report(RecognitionReport),
    Predictions(Vec<ClassificationEntry>),
}

impl RecognizeCommand {
    pub fn execute(self) -> Result<()> {
        let start = Instant::now();

        let config = match &self.config {
            Some(path) => RecognitionConfig::from_yaml(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RecognitionConfig::default(),
        };

        let detector = CascadeDetector::from_file(&self.cascade, CascadeConfig::default())
            .with_context(|| format!("Failed to load cascade {}", self.cascade.display()))?;

        let classifier_config = ClassifierConfig::default();
        let labels = load_labels(
            self.labels.as_deref(),
            self.model_info.as_deref(),
            classifier_config.input_size,
        )?;
        let classifier = OnnxCharacterClassifier::new(&self.model, labels, classifier_config)
            .with_context(|| format!("Failed to load model {}", self.model.display()))?;

        let recognizer = CharacterRecognizer::new(detector, classifier, config)?;

        info!(
            "Processing {} image(s) ({} mode)",
            self.inputs.len(),
            if self.whole_image { "whole-image" } else { "region" }
        );

        // Independent invocations per image; output keeps input order
        let outcomes: Vec<(&PathBuf, Result<Outcome>)> = self
            .inputs
            .par_iter()
            .map(|path| (path, self.process(&recognizer, path)))
            .collect();

        let mut failed = 0usize;
        for (path, outcome) in outcomes {
            match outcome {
                Ok(outcome) => self.print(path, &outcome)?,
                Err(e) => {
                    failed += 1;
                    error!("{}: {:#}", path.display(), e);
                }
            }
        }

        info!(
            "Done: {} succeeded, {} failed in {:.2?}",
            self.inputs.len() - failed,
            failed,
            start.elapsed()
        );

        if failed > 0 {
            anyhow::bail!("{failed} of {} image(s) failed", self.inputs.len());
        }
        Ok(())
    }

    fn process(
        &self,
        recognizer: &CharacterRecognizer<CascadeDetector, OnnxCharacterClassifier>,
        path: &Path,
    ) -> Result<Outcome> {
        let image = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?
            .to_rgb8();

        if self.whole_image {
            Ok(Outcome::Predictions(recognizer.classify_whole_image(&image)?))
        } else {
            Ok(Outcome::Report(recognizer.recognize(&image)?))
        }
    }

    fn print(&self, path: &Path, outcome: &Outcome) -> Result<()> {
        let output = ImageOutput {
            file: path.display().to_string(),
            result: match outcome {
                Outcome::Report(report) => ImageResult::Report(report),
                Outcome::Predictions(predictions) => ImageResult::Predictions { predictions },
            },
        };

        let json = if self.pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };
        println!("{json}");
        Ok(())
    }
}
