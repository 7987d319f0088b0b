//! Label catalog: class order, display names and training metadata

use crate::ClassificationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Display names for the character roster (internal label, display name)
pub const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("21hao", "21号"),
    ("aerfa", "阿尔法"),
    ("aila", "艾拉"),
    ("bianka", "比安卡"),
    ("dubian", "渡边"),
    ("kaleinina", "卡列尼娜"),
    ("kuluomu", "库洛姆"),
    ("lee", "里"),
    ("lifu", "丽芙"),
    ("luna", "露娜"),
    ("luosaita", "罗塞塔"),
    ("luxiya", "露西亚"),
    ("nuoan", "诺安"),
    ("qishi", "七实"),
    ("qu", "曲"),
    ("sailinna", "赛琳娜"),
    ("shenwei", "神威"),
    ("wanshi", "万事"),
    ("weila", "薇拉"),
];

/// Human-readable name for a label; unknown labels pass through unchanged
#[must_use]
pub fn display_name(label: &str) -> &str {
    DISPLAY_NAMES
        .iter()
        .find(|(key, _)| *key == label)
        .map_or(label, |(_, name)| *name)
}

/// Ordered class names matching the classifier's output indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Result<Self, ClassificationError> {
        if labels.is_empty() {
            return Err(ClassificationError::EmptyLabelSet);
        }
        Ok(Self { labels })
    }

    /// Load a JSON array of class names (e.g. `class_names.json`)
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, ClassificationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let labels: Vec<String> = serde_json::from_str(&contents).map_err(|e| {
            ClassificationError::LabelFile(format!("{}: {e}", path.display()))
        })?;

        info!("Loaded {} class names from {:?}", labels.len(), path);
        Self::new(labels)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// `true` when the set holds no labels, which `new` never allows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for LabelSet {
    type Error = ClassificationError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<LabelSet> for Vec<String> {
    fn from(set: LabelSet) -> Self {
        set.labels
    }
}

/// Metadata written next to a trained model (`model_info.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub num_classes: usize,
    pub class_names: Vec<String>,
    pub input_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_epochs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
}

impl ModelInfo {
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, ClassificationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let info: ModelInfo = serde_json::from_str(&contents).map_err(|e| {
            ClassificationError::LabelFile(format!("{}: {e}", path.display()))
        })?;

        if info.num_classes != info.class_names.len() {
            return Err(ClassificationError::LabelFile(format!(
                "num_classes is {} but {} class names are listed",
                info.num_classes,
                info.class_names.len()
            )));
        }
        if let Some(acc) = info.best_accuracy {
            info!("Model {} (best accuracy {:.4})", info.model_name, acc);
        }

        Ok(info)
    }

    /// Label set in classifier output order
    pub fn label_set(&self) -> Result<LabelSet, ClassificationError> {
        LabelSet::new(self.class_names.clone())
    }

    /// Warn when the trained input size differs from what the classifier feeds
    pub fn check_input_size(&self, input_size: u32) -> bool {
        if self.input_size != input_size {
            warn!(
                "Model {} was trained at {}px but classifier input is {}px",
                self.model_name, self.input_size, input_size
            );
            return false;
        }
        true
    }
}
