//! Common types and utilities for character recognition
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::ImageError(err.to_string())
    }
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Axis-aligned rectangle in pixel coordinates (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    /// X coordinate of top-left corner
    pub x: u32,
    /// Y coordinate of top-left corner
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rectangle {
    /// Create a new rectangle
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` image
    #[must_use]
    pub fn full_image(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge
    #[must_use]
    #[inline]
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge
    #[must_use]
    #[inline]
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    /// Area in pixels
    #[must_use]
    #[inline]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// True when either side is zero
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the rectangle lies fully inside a `width` x `height` image
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= u64::from(width) && self.bottom() <= u64::from(height)
    }

    /// True when `other` lies fully inside this rectangle
    #[must_use]
    pub fn contains(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlapping area of two rectangles, `None` when they do not overlap
    #[must_use]
    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= u64::from(x1) || y2 <= u64::from(y1) {
            return None;
        }

        // Both extents are bounded by the narrower input, so they fit in u32
        Some(Rectangle::new(
            x1,
            y1,
            (x2 - u64::from(x1)) as u32,
            (y2 - u64::from(y1)) as u32,
        ))
    }

    /// Clip to a `width` x `height` image, `None` when nothing remains
    #[must_use]
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rectangle> {
        self.intersection(&Rectangle::full_image(width, height))
    }

    /// Calculate Intersection over Union (`IoU`) with another rectangle
    #[must_use]
    #[inline]
    pub fn iou(&self, other: &Rectangle) -> f32 {
        let intersection_area = self.intersection(other).map_or(0, |r| r.area());
        if intersection_area == 0 {
            return 0.0;
        }

        let union_area = self.area() + other.area() - intersection_area;

        intersection_area as f32 / union_area as f32
    }
}

/// Label/probability pair produced by a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelProbability {
    /// Internal class label
    pub label: String,
    /// Probability (0-1)
    pub probability: f32,
}

impl LabelProbability {
    #[must_use]
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_edges_and_area() {
        let rect = Rectangle::new(10, 20, 30, 40);
        assert_eq!(rect.right(), 40);
        assert_eq!(rect.bottom(), 60);
        assert_eq!(rect.area(), 1200);
        assert!(!rect.is_degenerate());
        assert!(Rectangle::new(0, 0, 0, 5).is_degenerate());
    }

    #[test]
    fn test_rectangle_iou() {
        let a = Rectangle::new(0, 0, 100, 100);
        let b = Rectangle::new(10, 10, 100, 100);
        // Intersection 90*90 = 8100, union 20000 - 8100 = 11900
        assert!((a.iou(&b) - 8100.0 / 11900.0).abs() < 1e-6);

        assert!((a.iou(&a) - 1.0).abs() < 1e-6);

        let disjoint = Rectangle::new(200, 200, 10, 10);
        assert_eq!(a.iou(&disjoint), 0.0);

        // Touching edges do not overlap
        let touching = Rectangle::new(100, 0, 50, 50);
        assert_eq!(a.iou(&touching), 0.0);
    }

    #[test]
    fn test_rectangle_clip_and_contains() {
        let rect = Rectangle::new(150, 150, 100, 100);
        let clipped = rect.clip_to(200, 200).unwrap();
        assert_eq!(clipped, Rectangle::new(150, 150, 50, 50));
        assert!(clipped.fits_within(200, 200));
        assert!(!rect.fits_within(200, 200));
        assert!(rect.contains(&clipped));
        assert!(!clipped.contains(&rect));

        assert!(Rectangle::new(300, 0, 10, 10).clip_to(200, 200).is_none());
    }
}
