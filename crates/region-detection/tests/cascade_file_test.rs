use character_recognition_region_detection::{
    CascadeConfig, CascadeDetector, DetectionError, DetectorParams, RegionDetector,
};
use image::{Rgb, RgbImage};
use std::io::Write;

const CASCADE_PATH: &str = "models/haarcascade_frontalface_default.xml";

/// Minimal cascade: one stump that fires on a dark-over-bright horizontal edge
const EDGE_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>4</height>
  <width>4</width>
  <featureParams><maxCatCount>0</maxCatCount></featureParams>
  <stages>
    <_>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>0 -1 0 1.</internalNodes>
          <leafValues>-1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>0 0 4 4 -1.</_>
        <_>0 2 4 2 2.</_></rects></_></features></cascade>
</opencv_storage>
"#;

fn edge_image(width: u32, height: u32, edge_row: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |_, y| {
        if y < edge_row {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

#[test]
fn test_load_cascade_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(EDGE_CASCADE.as_bytes()).unwrap();

    let detector = CascadeDetector::from_file(file.path(), CascadeConfig::default()).unwrap();
    assert_eq!(detector.cascade().window_size(), (4, 4));

    let regions = detector
        .detect(&edge_image(6, 8, 4), &DetectorParams::new(2.0, 0, (1, 1)))
        .unwrap();
    assert_eq!(regions.len(), 2);
    for region in &regions {
        assert!(region.fits_within(6, 8));
        assert!(!region.is_degenerate());
    }
}

#[test]
fn test_missing_cascade_file() {
    let result = CascadeDetector::from_file("does/not/exist.xml", CascadeConfig::default());
    assert!(matches!(result, Err(DetectionError::CascadeLoad(_))));
}

#[test]
fn test_boxed_detector_is_usable_as_trait_object() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(EDGE_CASCADE.as_bytes()).unwrap();

    let detector: Box<dyn RegionDetector> = Box::new(
        CascadeDetector::from_file(file.path(), CascadeConfig::default()).unwrap(),
    );
    let regions = detector
        .detect(&edge_image(6, 8, 4), &DetectorParams::new(2.0, 0, (1, 1)))
        .unwrap();
    assert_eq!(regions.len(), 2);
}

#[test]
#[ignore] // Requires the OpenCV frontal face cascade under models/
fn test_frontal_face_cascade_on_blank_image() {
    if !std::path::Path::new(CASCADE_PATH).exists() {
        eprintln!("Skipping test: {CASCADE_PATH} not found");
        return;
    }

    let detector = CascadeDetector::from_file(CASCADE_PATH, CascadeConfig::default()).unwrap();
    let blank = RgbImage::from_pixel(320, 240, Rgb([255, 255, 255]));

    let regions = detector.detect(&blank, &DetectorParams::default()).unwrap();
    assert!(
        regions.is_empty(),
        "Unexpected detections on blank image: {regions:?}"
    );
}
