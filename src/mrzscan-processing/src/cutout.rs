//! Document cutout geometry
//!
//! Without any document detection, the crop is inferred from where a
//! passport data page sits when the user frames it in the viewfinder: a
//! centered rectangle with the ID-3 aspect ratio covering 90% of the width in
//! portrait or 75% of the height in landscape. The MRZ occupies the lower
//! part of that page, so the MRZ-only crop starts 60% of the way down.

use std::borrow::Cow;

use image::DynamicImage;
use tracing::{debug, warn};

/// Long edge over short edge of an ISO/IEC 7810 ID-3 page (125mm × 88mm)
pub const DOCUMENT_FRAME_RATIO: f64 = 1.42;

const PORTRAIT_WIDTH_FILL: f64 = 0.9;
const LANDSCAPE_HEIGHT_FILL: f64 = 0.75;
const MRZ_ZONE_OFFSET: f64 = 0.6;

/// Rectangle in bitmap pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoutRegion {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl CutoutRegion {
    /// True when the region is non-empty and lies inside a bitmap of the
    /// given size
    pub fn fits(&self, bitmap_width: u32, bitmap_height: u32) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.width > 0
            && self.height > 0
            && self.left + self.width <= bitmap_width as i64
            && self.top + self.height <= bitmap_height as i64
    }
}

/// Compute the cutout for a bitmap of `width × height`
///
/// Offsets are clamped at zero; the extents are not re-clamped afterwards,
/// so callers must check [`CutoutRegion::fits`] before cropping.
pub fn cutout_region(width: u32, height: u32, crop_to_mrz: bool) -> CutoutRegion {
    let (bitmap_w, bitmap_h) = (width as f64, height as f64);

    let (crop_w, crop_h) = if height > width {
        let crop_w = bitmap_w * PORTRAIT_WIDTH_FILL;
        (crop_w, crop_w / DOCUMENT_FRAME_RATIO)
    } else {
        let crop_h = bitmap_h * LANDSCAPE_HEIGHT_FILL;
        (crop_h * DOCUMENT_FRAME_RATIO, crop_h)
    };

    let mrz_zone_offset = if crop_to_mrz {
        crop_h * MRZ_ZONE_OFFSET
    } else {
        0.0
    };
    let top_offset = (bitmap_h - crop_h) / 2.0 + mrz_zone_offset;
    let left_offset = (bitmap_w - crop_w) / 2.0;

    // Truncation toward zero on every conversion is part of the geometry
    let left = left_offset as i64;
    let top = top_offset as i64;
    let final_w = (crop_w as i64).min(width as i64 - left);
    let final_h = ((crop_h - mrz_zone_offset) as i64).min(height as i64 - top);

    CutoutRegion {
        left: left.max(0),
        top: top.max(0),
        width: final_w,
        height: final_h,
    }
}

/// Crop `image` to its cutout, or hand back the original when the region
/// does not fit
pub fn crop_to_cutout(image: &DynamicImage, crop_to_mrz: bool) -> Cow<'_, DynamicImage> {
    let (width, height) = (image.width(), image.height());
    let region = cutout_region(width, height, crop_to_mrz);

    if !region.fits(width, height) {
        warn!(
            "cutout {:?} does not fit {}x{} bitmap, using uncropped image",
            region, width, height
        );
        return Cow::Borrowed(image);
    }

    debug!("cropping {}x{} bitmap to {:?}", width, height, region);
    Cow::Owned(image.crop_imm(
        region.left as u32,
        region.top as u32,
        region.width as u32,
        region.height as u32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_portrait_mrz_geometry() {
        // cropWidth = 900, cropHeight = 633.8, mrz offset = 380.3
        let region = cutout_region(1000, 1600, true);
        assert_eq!(
            region,
            CutoutRegion {
                left: 50,
                top: 863,
                width: 900,
                height: 253,
            }
        );
        assert!(region.fits(1000, 1600));
    }

    #[test]
    fn test_portrait_full_document_geometry() {
        let region = cutout_region(1000, 1600, false);
        assert_eq!(
            region,
            CutoutRegion {
                left: 50,
                top: 483,
                width: 900,
                height: 633,
            }
        );
    }

    #[test]
    fn test_landscape_geometry() {
        // cropHeight = 810, cropWidth = 1150.2
        let region = cutout_region(1920, 1080, true);
        assert_eq!(region.left, 384);
        assert_eq!(region.top, 621);
        assert_eq!(region.width, 1150);
        assert_eq!(region.height, 324);
        assert!(region.fits(1920, 1080));
    }

    #[test]
    fn test_square_uses_landscape_branch() {
        let region = cutout_region(100, 100, false);
        // 75 * 1.42 = 106.5 is wider than the bitmap
        assert_eq!(region.left, 0);
        assert!(!region.fits(100, 100));
    }

    #[test]
    fn test_crop_applies_region() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(1000, 1600));
        let cropped = crop_to_cutout(&image, true);
        assert!(matches!(cropped, Cow::Owned(_)));
        assert_eq!((cropped.width(), cropped.height()), (900, 253));
    }

    #[test]
    fn test_tiny_bitmaps_fall_back_to_original() {
        for (w, h) in [(1, 1), (1, 2), (2, 1), (2, 2), (3, 1), (1, 5)] {
            let image = DynamicImage::ImageRgb8(RgbImage::new(w, h));
            let cropped = crop_to_cutout(&image, true);
            if let Cow::Owned(ref c) = cropped {
                assert!(c.width() > 0 && c.height() > 0);
            } else {
                assert_eq!((cropped.width(), cropped.height()), (w, h));
            }
        }
    }

    #[test]
    fn test_regions_never_escape_bounds() {
        for w in 1..60u32 {
            for h in 1..60u32 {
                for crop_to_mrz in [true, false] {
                    let region = cutout_region(w, h, crop_to_mrz);
                    assert!(region.left >= 0 && region.top >= 0);
                    if region.fits(w, h) {
                        let image = DynamicImage::ImageRgb8(RgbImage::new(w, h));
                        let cropped = crop_to_cutout(&image, crop_to_mrz);
                        assert_eq!(cropped.width() as i64, region.width);
                        assert_eq!(cropped.height() as i64, region.height);
                    }
                }
            }
        }
    }
}
