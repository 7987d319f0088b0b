//! Labels listing command

use super::load_labels;
use anyhow::Result;
use character_recognition_classification::{display_name, ClassifierConfig};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct LabelsCommand {
    /// JSON array of class names in model output order
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Training metadata (model_info.json)
    #[arg(long)]
    model_info: Option<PathBuf>,
}

impl LabelsCommand {
    pub fn execute(self) -> Result<()> {
        let labels = load_labels(
            self.labels.as_deref(),
            self.model_info.as_deref(),
            ClassifierConfig::default().input_size,
        )?;

        println!("{} labels:", labels.len());
        for (index, label) in labels.iter().enumerate() {
            println!("  {index:>3}  {label:<12} {}", display_name(label));
        }

        Ok(())
    }
}
