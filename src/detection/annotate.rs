use image::RgbImage;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::error::DetectError;
use crate::models::{BoundingBox, Color};

/// Stroke width used for every pipeline annotation
pub const DEFAULT_THICKNESS: u32 = 2;

/// Draw an unfilled rectangle outline onto `image` in place.
///
/// Boxes hanging over the image edge are clamped to the visible part; boxes
/// with no visible part are rejected with [`DetectError::OutOfBounds`].
/// The stroke grows inward so the outline never leaves the box.
/// Returns the box actually drawn.
pub fn annotate(
    image: &mut RgbImage,
    bbox: BoundingBox,
    color: Color,
    thickness: u32,
) -> Result<BoundingBox, DetectError> {
    let (width, height) = image.dimensions();
    let visible = bbox
        .clamp_to(width, height)
        .ok_or(DetectError::OutOfBounds(bbox, width, height))?;

    let pixel = color.to_rgb();
    for inset in 0..thickness.max(1) {
        if visible.width <= 2 * inset || visible.height <= 2 * inset {
            break;
        }
        let rect = Rect::at((visible.x + inset) as i32, (visible.y + inset) as i32)
            .of_size(visible.width - 2 * inset, visible.height - 2 * inset);
        draw_hollow_rect_mut(image, rect, pixel);
    }

    Ok(visible)
}
