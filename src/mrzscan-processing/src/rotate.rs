//! Orientation correction

use std::borrow::Cow;

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use tracing::debug;

/// Rotate `image` clockwise by `degrees` around its center
///
/// A rotation of zero borrows the input untouched. Any other angle yields an
/// owned bitmap whose bounds grow to fit the rotated content; right angles
/// are exact pixel transposes.
pub fn rotate(image: &DynamicImage, degrees: i32) -> Cow<'_, DynamicImage> {
    let normalized = degrees.rem_euclid(360);
    if normalized != 0 {
        debug!(
            "rotating {}x{} bitmap by {} degrees",
            image.width(),
            image.height(),
            normalized
        );
    }

    match normalized {
        0 => Cow::Borrowed(image),
        90 => Cow::Owned(image.rotate90()),
        180 => Cow::Owned(image.rotate180()),
        270 => Cow::Owned(image.rotate270()),
        other => Cow::Owned(rotate_expanded(image, other as f32)),
    }
}

/// Free-angle rotation into an enlarged canvas, uncovered corners transparent
fn rotate_expanded(image: &DynamicImage, degrees: f32) -> DynamicImage {
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (image.width() as f32, image.height() as f32);

    let out_w = (w * cos.abs() + h * sin.abs()).round().max(1.0) as u32;
    let out_h = (w * sin.abs() + h * cos.abs()).round().max(1.0) as u32;

    let projection = Projection::translate(-w / 2.0, -h / 2.0)
        .and_then(Projection::rotate(theta))
        .and_then(Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0));

    let source = image.to_rgba8();
    let mut rotated = RgbaImage::new(out_w, out_h);
    warp_into(
        &source,
        &projection,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
        &mut rotated,
    );

    DynamicImage::ImageRgba8(rotated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pixel_strip() -> DynamicImage {
        let mut strip = RgbaImage::new(2, 1);
        strip.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        strip.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        DynamicImage::ImageRgba8(strip)
    }

    #[test]
    fn test_zero_rotation_borrows() {
        let image = two_pixel_strip();
        assert!(matches!(rotate(&image, 0), Cow::Borrowed(_)));
        assert!(matches!(rotate(&image, 360), Cow::Borrowed(_)));
    }

    #[test]
    fn test_quarter_turn_is_clockwise() {
        let rotated = rotate(&two_pixel_strip(), 90).into_owned().to_rgba8();
        assert_eq!(rotated.dimensions(), (1, 2));
        // Left end of the strip ends up on top
        assert_eq!(rotated.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(rotated.get_pixel(0, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_negative_angles_normalize() {
        let image = two_pixel_strip();
        let a = rotate(&image, -90).into_owned().to_rgba8();
        let b = rotate(&image, 270).into_owned().to_rgba8();
        assert_eq!(a, b);
    }

    #[test]
    fn test_half_turn_keeps_dimensions() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(40, 10));
        let rotated = rotate(&image, 180);
        assert_eq!((rotated.width(), rotated.height()), (40, 10));
    }

    #[test]
    fn test_free_angle_grows_bounds() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([9, 9, 9, 255])));
        let rotated = rotate(&image, 45);
        assert_eq!((rotated.width(), rotated.height()), (141, 141));

        let rgba = rotated.to_rgba8();
        // Center keeps content, corners are outside the source
        assert_eq!(rgba.get_pixel(70, 70).0[3], 255);
        assert_eq!(rgba.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_free_angle_is_clockwise() {
        // 60x10 strip, red left end, blue right end
        let strip = RgbaImage::from_fn(60, 10, |x, _| match x {
            0..=9 => Rgba([255, 0, 0, 255]),
            50..=59 => Rgba([0, 0, 255, 255]),
            _ => Rgba([255, 255, 255, 255]),
        });
        let rotated = rotate(&DynamicImage::ImageRgba8(strip), 30).to_rgba8();
        assert_eq!(rotated.dimensions(), (57, 39));

        // Clockwise lifts the left end and drops the right end
        let [r, g, b, a] = rotated.get_pixel(7, 7).0;
        assert!(r > 240 && g < 16 && b < 16 && a > 240, "{:?}", [r, g, b, a]);
        let [r, g, b, a] = rotated.get_pixel(50, 32).0;
        assert!(b > 240 && r < 16 && g < 16 && a > 240, "{:?}", [r, g, b, a]);
        assert_eq!(rotated.get_pixel(7, 32).0[3], 0);
        assert_eq!(rotated.get_pixel(50, 7).0[3], 0);
    }
}
