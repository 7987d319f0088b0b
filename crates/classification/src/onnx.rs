//! ONNX Runtime character classifier (ResNet export)

use crate::labels::LabelSet;
use crate::{softmax, ClassificationError, RegionClassifier};
use character_recognition_common::LabelProbability;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Preprocessing configuration for the classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Shorter side after the initial resize
    pub resize_shorter: u32,
    /// Side of the square center crop fed to the model
    pub input_size: u32,
    /// Per-channel mean (RGB) after scaling to [0, 1]
    pub mean: [f32; 3],
    /// Per-channel standard deviation (RGB)
    pub std: [f32; 3],
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        // ImageNet statistics used during training
        Self {
            resize_shorter: 256,
            input_size: 224,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ClassificationError> {
        if self.input_size == 0 || self.input_size > self.resize_shorter {
            return Err(ClassificationError::Preprocessing(format!(
                "input_size {} must be in 1..={}",
                self.input_size, self.resize_shorter
            )));
        }
        if self.std.iter().any(|s| *s <= 0.0) {
            return Err(ClassificationError::Preprocessing(
                "std values must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Character classifier backed by an ONNX model
///
/// The session is created once and shared read-only; `Session::run` needs
/// `&mut`, so calls are serialized through a mutex.
pub struct OnnxCharacterClassifier {
    session: Mutex<Session>,
    labels: LabelSet,
    config: ClassifierConfig,
    input_name: String,
}

impl OnnxCharacterClassifier {
    /// Load the model at `model_path`; `labels` must follow the model's output order
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        labels: LabelSet,
        config: ClassifierConfig,
    ) -> Result<Self, ClassificationError> {
        config.validate()?;
        let model_path = model_path.as_ref();

        info!("Loading character classifier from {:?}", model_path);

        let session = Session::builder()
            .map_err(|e| ClassificationError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| ClassificationError::ModelLoad(e.to_string()))?;

        let input_name = session
            .inputs
            .first()
            .ok_or_else(|| ClassificationError::ModelLoad("Model has no inputs".into()))?
            .name
            .clone();

        info!(
            "Character classifier loaded ({} classes, input {}x{})",
            labels.len(),
            config.input_size,
            config.input_size
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            config,
            input_name,
        })
    }

    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Resize shorter side, center crop, normalize, NCHW
    pub(crate) fn preprocess(
        image: &RgbImage,
        config: &ClassifierConfig,
    ) -> Result<Array4<f32>, ClassificationError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ClassificationError::Preprocessing(format!(
                "empty region {width}x{height}"
            )));
        }

        let shorter = width.min(height);
        let scale = f64::from(config.resize_shorter) / f64::from(shorter);
        // Longer side truncates like torchvision; never below the shorter one
        let longer = |side: u32| ((f64::from(side) * scale) as u32).max(config.resize_shorter);
        let (resized_w, resized_h) = if width <= height {
            (config.resize_shorter, longer(height))
        } else {
            (longer(width), config.resize_shorter)
        };

        let resized = image::imageops::resize(
            image,
            resized_w,
            resized_h,
            image::imageops::FilterType::Triangle,
        );

        let size = config.input_size;
        let left = ((f64::from(resized_w - size)) / 2.0).round() as u32;
        let top = ((f64::from(resized_h - size)) / 2.0).round() as u32;
        let cropped = image::imageops::crop_imm(&resized, left, top, size, size).to_image();

        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in cropped.enumerate_pixels() {
            for c in 0..3 {
                let value = f32::from(pixel[c]) / 255.0;
                input[[0, c, y as usize, x as usize]] =
                    (value - config.mean[c]) / config.std[c];
            }
        }

        Ok(input)
    }

    /// Run inference and return one probability per label, in label order
    fn run_inference(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassificationError> {
        let mut session = self.session.lock().map_err(|e| {
            ClassificationError::Inference(format!("Failed to lock session mutex: {e}"))
        })?;

        let input_tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;
        let outputs = session
            .run(ort::inputs![&*self.input_name => input_tensor])
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;

        let (_shape, logits) = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            ClassificationError::Inference(format!("Failed to extract tensor: {e}"))
        })?;

        if logits.len() != self.labels.len() {
            return Err(ClassificationError::Inference(format!(
                "model produced {} logits for {} labels",
                logits.len(),
                self.labels.len()
            )));
        }

        Ok(softmax(logits))
    }
}

impl RegionClassifier for OnnxCharacterClassifier {
    fn classify(&self, region: &RgbImage) -> Result<Vec<LabelProbability>, ClassificationError> {
        debug!(
            "Classifying {}x{} region",
            region.width(),
            region.height()
        );

        let input = Self::preprocess(region, &self.config)?;
        let probabilities = self.run_inference(&input)?;

        Ok(self
            .labels
            .iter()
            .zip(probabilities)
            .map(|(label, probability)| LabelProbability::new(label, probability))
            .collect())
    }

    fn label_count(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClassifierConfig::default();
        assert_eq!(config.resize_shorter, 256);
        assert_eq!(config.input_size, 224);
        assert_eq!(config.mean, [0.485, 0.456, 0.406]);
        assert_eq!(config.std, [0.229, 0.224, 0.225]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_crop_larger_than_resize() {
        let config = ClassifierConfig {
            input_size: 300,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let config = ClassifierConfig::default();
        let image = RgbImage::from_pixel(400, 300, image::Rgb([255, 0, 128]));

        let input = OnnxCharacterClassifier::preprocess(&image, &config).unwrap();
        assert_eq!(input.shape(), &[1, 3, 224, 224]);

        let red = (1.0 - 0.485) / 0.229;
        let green = (0.0 - 0.456) / 0.224;
        assert!((input[[0, 0, 100, 100]] - red).abs() < 1e-4);
        assert!((input[[0, 1, 0, 0]] - green).abs() < 1e-4);
    }

    #[test]
    fn test_preprocess_small_region_is_upscaled() {
        let config = ClassifierConfig::default();
        let image = RgbImage::from_pixel(10, 40, image::Rgb([0, 0, 0]));
        let input = OnnxCharacterClassifier::preprocess(&image, &config).unwrap();
        assert_eq!(input.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_rejects_empty_region() {
        let config = ClassifierConfig::default();
        let image = RgbImage::new(0, 10);
        assert!(OnnxCharacterClassifier::preprocess(&image, &config).is_err());
    }
}
