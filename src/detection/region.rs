//! Borrowed sub-regions of a grayscale image.
//!
//! A [`RegionView`] never copies pixels: it pairs the parent image with the
//! offset and extent of the area a detector should look at. Detectors report
//! boxes relative to the view's origin and [`RegionView::to_global`] is the one
//! place those local boxes are mapped back to the parent's coordinate space.

use image::GrayImage;

use crate::models::BoundingBox;

/// Read-only window into a grayscale image
#[derive(Debug, Clone, Copy)]
pub struct RegionView<'a> {
    image: &'a GrayImage,
    origin: BoundingBox,
}

impl<'a> RegionView<'a> {
    /// View covering the whole image
    pub fn full(image: &'a GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            image,
            origin: BoundingBox::new(0, 0, width, height),
        }
    }

    /// View over `bbox`, clipped to the image. None if nothing remains.
    pub fn within(image: &'a GrayImage, bbox: BoundingBox) -> Option<Self> {
        let (width, height) = image.dimensions();
        let origin = bbox.clamp_to(width, height)?;
        Some(Self { image, origin })
    }

    pub fn width(&self) -> u32 {
        self.origin.width
    }

    pub fn height(&self) -> u32 {
        self.origin.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.origin.width, self.origin.height)
    }

    /// Area of the parent image covered by this view
    pub fn bounds(&self) -> BoundingBox {
        self.origin
    }

    /// Map a box reported in local coordinates into parent coordinates.
    /// None when the mapped box leaves the `u32` coordinate range.
    pub fn to_global(&self, local: BoundingBox) -> Option<BoundingBox> {
        local.offset(self.origin.x, self.origin.y)
    }

    /// Owned copy of the viewed pixels
    pub fn to_image(&self) -> GrayImage {
        image::imageops::crop_imm(
            self.image,
            self.origin.x,
            self.origin.y,
            self.origin.width,
            self.origin.height,
        )
        .to_image()
    }
}
