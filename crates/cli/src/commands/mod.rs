pub mod labels;
pub mod recognize;

use anyhow::{bail, Context as _, Result};
use character_recognition_classification::{LabelSet, ModelInfo};
use std::path::Path;
use tracing::info;

/// Label set from `--labels` or, failing that, from `--model-info`
pub(crate) fn load_labels(
    labels: Option<&Path>,
    model_info: Option<&Path>,
    input_size: u32,
) -> Result<LabelSet> {
    let info = model_info
        .map(|path| {
            ModelInfo::from_json(path)
                .with_context(|| format!("Failed to read model info {}", path.display()))
        })
        .transpose()?;

    if let Some(info) = &info {
        info!(
            "Model {} ({} classes, trained at {}px)",
            info.model_name, info.num_classes, info.input_size
        );
        info.check_input_size(input_size);
    }

    match (labels, info) {
        (Some(path), _) => LabelSet::from_json(path)
            .with_context(|| format!("Failed to read labels {}", path.display())),
        (None, Some(info)) => Ok(info.label_set()?),
        (None, None) => bail!("Either --labels or --model-info is required"),
    }
}
