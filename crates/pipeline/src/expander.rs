//! Context padding around merged regions

use character_recognition_common::Rectangle;

/// Pad `rect` by `floor(side * ratio)` on every side, clipped to the image
///
/// Each axis clips on its own: padding lost at one edge is not moved to the
/// opposite edge. For an in-bounds, non-degenerate `rect` and `ratio >= 0`
/// the result is in bounds, non-degenerate and contains `rect`.
#[must_use]
pub fn expand(rect: &Rectangle, image_width: u32, image_height: u32, ratio: f64) -> Rectangle {
    let (x, width) = expand_axis(rect.x, rect.width, image_width, ratio);
    let (y, height) = expand_axis(rect.y, rect.height, image_height, ratio);
    Rectangle::new(x, y, width, height)
}

fn expand_axis(start: u32, length: u32, limit: u32, ratio: f64) -> (u32, u32) {
    let pad = (f64::from(length) * ratio).floor() as u32;
    let new_start = start.saturating_sub(pad);
    let wanted = u64::from(length) + 2 * u64::from(pad);
    let available = u64::from(limit.saturating_sub(new_start));
    // min() is bounded by `available`, which came from a u32
    (new_start, wanted.min(available) as u32)
}
