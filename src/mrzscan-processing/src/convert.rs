//! Sensor frame to bitmap conversion

use image::{DynamicImage, RgbImage, RgbaImage};
use mrzscan_capture::{Frame, FrameFormat, Plane};
use tracing::debug;

use crate::error::{ProcessingError, Result};

/// Decode a camera frame into a bitmap of the same logical size
///
/// YUV 4:2:0 frames are repacked into NV21 (V before U) and converted to RGB;
/// RGBA frames are copied as-is; anything else is treated as a compressed
/// image sitting in the first plane.
pub fn frame_to_image(frame: &Frame) -> Result<DynamicImage> {
    debug!(
        "converting {:?} frame {}x{}",
        frame.format, frame.width, frame.height
    );

    match frame.format {
        FrameFormat::Yuv420 => {
            let nv21 = yuv420_to_nv21(&frame.planes, frame.width, frame.height)?;
            Ok(DynamicImage::ImageRgb8(nv21_to_rgb(&nv21, frame.width, frame.height)?))
        }
        FrameFormat::Rgba8888 => rgba_to_image(frame),
        FrameFormat::Encoded | FrameFormat::Other(_) => decode_first_plane(frame),
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ProcessingError::InvalidFrame(format!(
            "empty frame {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn short_plane(name: &str, row: usize, col: usize) -> ProcessingError {
    ProcessingError::InvalidFrame(format!(
        "{} plane too short for sample at row {}, column {}",
        name, row, col
    ))
}

/// Repack Y, U, V planes into an NV21 buffer
///
/// Layout: `width × height` luma bytes followed by interleaved V,U pairs at
/// half resolution in both directions.
pub fn yuv420_to_nv21(planes: &[Plane], width: u32, height: u32) -> Result<Vec<u8>> {
    check_dimensions(width, height)?;
    let [y_plane, u_plane, v_plane] = match planes {
        [y, u, v, ..] => [y, u, v],
        _ => {
            return Err(ProcessingError::InvalidFrame(format!(
                "expected 3 planes, got {}",
                planes.len()
            )))
        }
    };

    let (w, h) = (width as usize, height as usize);
    let (chroma_w, chroma_h) = (w.div_ceil(2), h.div_ceil(2));
    let mut nv21 = Vec::with_capacity(w * h + 2 * chroma_w * chroma_h);

    for row in 0..h {
        if y_plane.pixel_stride == 1 {
            let start = row * y_plane.row_stride;
            let line = y_plane
                .data
                .get(start..start + w)
                .ok_or_else(|| short_plane("Y", row, w - 1))?;
            nv21.extend_from_slice(line);
        } else {
            for col in 0..w {
                nv21.push(y_plane.sample(row, col).ok_or_else(|| short_plane("Y", row, col))?);
            }
        }
    }

    for row in 0..chroma_h {
        for col in 0..chroma_w {
            let v = v_plane.sample(row, col).ok_or_else(|| short_plane("V", row, col))?;
            let u = u_plane.sample(row, col).ok_or_else(|| short_plane("U", row, col))?;
            nv21.push(v);
            nv21.push(u);
        }
    }

    Ok(nv21)
}

/// Convert an NV21 buffer to RGB using integer BT.601 coefficients
pub fn nv21_to_rgb(nv21: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    check_dimensions(width, height)?;
    let (w, h) = (width as usize, height as usize);
    let chroma_row = w.div_ceil(2) * 2;
    let expected = w * h + chroma_row * h.div_ceil(2);
    if nv21.len() < expected {
        return Err(ProcessingError::InvalidFrame(format!(
            "NV21 buffer has {} bytes, expected {}",
            nv21.len(),
            expected
        )));
    }

    let mut rgb = RgbImage::new(width, height);
    for (x, y, pixel) in rgb.enumerate_pixels_mut() {
        let (x, y) = (x as usize, y as usize);
        let luma = nv21[y * w + x] as i32;
        let uv = w * h + (y / 2) * chroma_row + (x / 2) * 2;
        let v = nv21[uv] as i32 - 128;
        let u = nv21[uv + 1] as i32 - 128;

        let c = 298 * (luma - 16);
        pixel.0 = [
            clamp_channel((c + 409 * v + 128) >> 8),
            clamp_channel((c - 100 * u - 208 * v + 128) >> 8),
            clamp_channel((c + 516 * u + 128) >> 8),
        ];
    }

    Ok(rgb)
}

fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

fn rgba_to_image(frame: &Frame) -> Result<DynamicImage> {
    check_dimensions(frame.width, frame.height)?;
    let plane = frame
        .planes
        .first()
        .ok_or_else(|| ProcessingError::InvalidFrame("RGBA frame without planes".into()))?;

    let row_bytes = frame.width as usize * 4;
    let h = frame.height as usize;
    let stride = plane.row_stride.max(row_bytes);
    let needed = (h - 1) * stride + row_bytes;
    if plane.data.len() < needed {
        return Err(ProcessingError::InvalidFrame(format!(
            "RGBA plane has {} bytes, expected at least {}",
            plane.data.len(),
            needed
        )));
    }

    let data = if stride == row_bytes {
        plane.data[..row_bytes * h].to_vec()
    } else {
        let mut packed = Vec::with_capacity(row_bytes * h);
        for row in 0..h {
            let start = row * stride;
            packed.extend_from_slice(&plane.data[start..start + row_bytes]);
        }
        packed
    };

    let image = RgbaImage::from_raw(frame.width, frame.height, data)
        .ok_or_else(|| ProcessingError::InvalidFrame("failed to create image buffer".into()))?;
    Ok(DynamicImage::ImageRgba8(image))
}

fn decode_first_plane(frame: &Frame) -> Result<DynamicImage> {
    let plane = frame
        .planes
        .first()
        .ok_or_else(|| ProcessingError::InvalidFrame("frame without planes".into()))?;

    image::load_from_memory(&plane.data).map_err(|e| ProcessingError::UnsupportedFormat {
        format: format!("{:?}", frame.format),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    fn yuv_frame(width: u32, height: u32, y: u8, u: u8, v: u8) -> Frame {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        Frame::new(
            FrameFormat::Yuv420,
            width,
            height,
            0,
            vec![
                Plane::packed(vec![y; w * h], w),
                Plane::packed(vec![u; cw * ch], cw),
                Plane::packed(vec![v; cw * ch], cw),
            ],
        )
    }

    #[test]
    fn test_nv21_places_v_before_u() {
        let frame = yuv_frame(4, 2, 50, 90, 240);
        let nv21 = yuv420_to_nv21(&frame.planes, 4, 2).unwrap();

        assert_eq!(nv21.len(), 8 + 4);
        assert!(nv21[..8].iter().all(|&b| b == 50));
        assert_eq!(&nv21[8..], &[240, 90, 240, 90]);
    }

    #[test]
    fn test_nv21_reads_interleaved_chroma_planes() {
        // Semi-planar camera buffers expose chroma with a pixel stride of 2
        let planes = vec![
            Plane::packed(vec![10; 4], 2),
            Plane::new(vec![1, 0], 2, 2),
            Plane::new(vec![2, 0], 2, 2),
        ];
        let nv21 = yuv420_to_nv21(&planes, 2, 2).unwrap();
        assert_eq!(nv21, vec![10, 10, 10, 10, 2, 1]);
    }

    #[test]
    fn test_yuv_luma_extremes() {
        let black = frame_to_image(&yuv_frame(2, 2, 16, 128, 128)).unwrap().to_rgb8();
        assert_eq!(black.get_pixel(0, 0).0, [0, 0, 0]);

        let white = frame_to_image(&yuv_frame(2, 2, 235, 128, 128)).unwrap().to_rgb8();
        assert_eq!(white.get_pixel(1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn test_saturated_chroma_decodes_to_primaries() {
        let red = frame_to_image(&yuv_frame(2, 2, 81, 90, 240)).unwrap().to_rgb8();
        assert_eq!(red.get_pixel(0, 0).0, [255, 0, 0]);

        let blue = frame_to_image(&yuv_frame(2, 2, 41, 240, 110)).unwrap().to_rgb8();
        assert_eq!(blue.get_pixel(1, 1).0, [0, 0, 255]);

        // Green pulls both chroma channels below neutral
        let green = frame_to_image(&yuv_frame(2, 2, 145, 54, 34)).unwrap().to_rgb8();
        let [r, g, b] = green.get_pixel(0, 1).0;
        assert!(g > 200 && r < 40 && b < 40, "{:?}", [r, g, b]);
    }

    #[test]
    fn test_yuv_odd_dimensions() {
        let image = frame_to_image(&yuv_frame(3, 5, 128, 128, 128)).unwrap();
        assert_eq!((image.width(), image.height()), (3, 5));
    }

    #[test]
    fn test_short_plane_is_an_error() {
        let mut frame = yuv_frame(4, 4, 0, 0, 0);
        frame.planes[2].data.truncate(1);
        assert!(matches!(
            frame_to_image(&frame),
            Err(ProcessingError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_rgba_passthrough() {
        let data: Vec<u8> = (0..2 * 2 * 4).map(|i| i as u8).collect();
        let image = frame_to_image(&Frame::rgba(data.clone(), 2, 2, 0)).unwrap();
        assert_eq!(image.to_rgba8().into_raw(), data);
    }

    #[test]
    fn test_rgba_with_row_padding() {
        let mut frame = Frame::rgba(vec![7; 12], 1, 2, 0);
        frame.planes[0].row_stride = 8;
        let image = frame_to_image(&frame).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (1, 2));
        assert_eq!(image.get_pixel(0, 1).0, [7, 7, 7, 7]);
    }

    #[test]
    fn test_rgba_size_mismatch() {
        let frame = Frame::rgba(vec![0; 10], 100, 100, 0);
        assert!(frame_to_image(&frame).is_err());
    }

    #[test]
    fn test_encoded_frame_is_decoded() {
        let mut png = Vec::new();
        RgbImage::new(6, 4)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let image = frame_to_image(&Frame::encoded(png, 6, 4, 0)).unwrap();
        assert_eq!((image.width(), image.height()), (6, 4));
    }

    #[test]
    fn test_unknown_format_garbage_is_unsupported() {
        let mut frame = Frame::encoded(vec![1, 2, 3, 4], 2, 2, 0);
        frame.format = FrameFormat::Other(0x23);
        assert!(matches!(
            frame_to_image(&frame),
            Err(ProcessingError::UnsupportedFormat { .. })
        ));
    }
}
