use character_recognition_classification::ClassificationError;
use character_recognition_common::{ProcessingError, Rectangle};
use thiserror::Error;

/// Errors surfaced by one recognition call
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// Degenerate or otherwise unusable input image
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The classifier failed on one region; the whole image fails with it
    #[error("Failed to process region {region:?}: {source}")]
    RegionProcessing {
        region: Rectangle,
        #[source]
        source: ClassificationError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

impl From<RecognitionError> for ProcessingError {
    fn from(err: RecognitionError) -> Self {
        match err {
            RecognitionError::InvalidInput(msg) => ProcessingError::InvalidInput(msg),
            RecognitionError::Configuration(msg) => ProcessingError::Configuration(msg),
            RecognitionError::RegionProcessing { .. } => ProcessingError::Model(err.to_string()),
            RecognitionError::Processing(msg) => ProcessingError::Other(msg),
        }
    }
}
