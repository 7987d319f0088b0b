//! Summed-area tables for constant-time rectangle sums

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};

type Table = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Integral and squared integral of a grayscale image
///
/// Tables come from `imageproc` and carry a leading row and column of zeros,
/// so any rectangle sum (empty ones included) is four lookups.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    sum: Table,
    squared: Table,
}

impl IntegralImage {
    #[must_use]
    pub fn new(image: &GrayImage) -> Self {
        Self {
            sum: integral_image::<_, u64>(image),
            squared: integral_squared_image::<_, u64>(image),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        let (width, height) = self.sum.dimensions();
        (width - 1, height - 1)
    }

    /// Sum of pixel values inside the rectangle
    #[must_use]
    #[inline]
    pub fn sum(&self, x: u32, y: u32, width: u32, height: u32) -> u64 {
        rect_total(&self.sum, x, y, width, height)
    }

    /// Sum of squared pixel values inside the rectangle
    #[must_use]
    #[inline]
    pub fn squared_sum(&self, x: u32, y: u32, width: u32, height: u32) -> u64 {
        rect_total(&self.squared, x, y, width, height)
    }
}

#[inline]
fn rect_total(table: &Table, x: u32, y: u32, width: u32, height: u32) -> u64 {
    let at = |x: u32, y: u32| table.get_pixel(x, y)[0];
    let (x1, y1) = (x + width, y + height);
    // Add before subtracting to stay in unsigned range
    at(x1, y1) + at(x, y) - at(x1, y) - at(x, y1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_match_brute_force() {
        let image = GrayImage::from_fn(7, 5, |x, y| Luma([(x * 10 + y * 3) as u8]));
        let integral = IntegralImage::new(&image);
        assert_eq!(integral.dimensions(), (7, 5));

        let (x, y, w, h) = (2, 1, 4, 3);
        let mut expected = 0u64;
        let mut expected_sq = 0u64;
        for yy in y..y + h {
            for xx in x..x + w {
                let v = u64::from(image.get_pixel(xx, yy)[0]);
                expected += v;
                expected_sq += v * v;
            }
        }

        assert_eq!(integral.sum(x, y, w, h), expected);
        assert_eq!(integral.squared_sum(x, y, w, h), expected_sq);
    }

    #[test]
    fn test_full_and_empty_rects() {
        let image = GrayImage::from_pixel(4, 3, Luma([2]));
        let integral = IntegralImage::new(&image);
        assert_eq!(integral.sum(0, 0, 4, 3), 24);
        assert_eq!(integral.squared_sum(0, 0, 4, 3), 48);
        assert_eq!(integral.sum(1, 1, 0, 2), 0);
    }

    #[test]
    fn test_bright_pixels_do_not_overflow() {
        let image = GrayImage::from_pixel(300, 200, Luma([255]));
        let integral = IntegralImage::new(&image);
        assert_eq!(integral.squared_sum(0, 0, 300, 200), 300 * 200 * 255 * 255);
        assert_eq!(integral.sum(299, 199, 1, 1), 255);
    }
}
