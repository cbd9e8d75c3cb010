//! Camera frame data

use chrono::{DateTime, Utc};

/// Pixel layout tag carried by a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Planar luma plus two quarter-resolution chroma planes (Y, U, V)
    Yuv420,
    /// Single interleaved RGBA plane
    Rgba8888,
    /// Plane 0 holds a compressed image (JPEG, PNG, ...)
    Encoded,
    /// Unrecognized sensor format code
    Other(u32),
}

/// One plane of a sensor buffer
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Vec<u8>,
    /// Bytes between the starts of two consecutive rows
    pub row_stride: usize,
    /// Bytes between two consecutive samples of a row
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// Tightly packed plane with one byte per sample
    pub fn packed(data: Vec<u8>, width: usize) -> Self {
        Self::new(data, width, 1)
    }

    /// Sample at (row, col), or None when the buffer is too short
    pub fn sample(&self, row: usize, col: usize) -> Option<u8> {
        self.data
            .get(row * self.row_stride + col * self.pixel_stride)
            .copied()
    }
}

/// A frame delivered by a frame source
///
/// Owned by the source until offered to the scanner, then by the analysis
/// worker until the run has read it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub format: FrameFormat,
    pub width: u32,
    pub height: u32,
    /// Clockwise rotation needed to display the frame upright
    pub rotation_degrees: i32,
    pub planes: Vec<Plane>,
    pub timestamp: DateTime<Utc>,
}

impl Frame {
    pub fn new(
        format: FrameFormat,
        width: u32,
        height: u32,
        rotation_degrees: i32,
        planes: Vec<Plane>,
    ) -> Self {
        Self {
            format,
            width,
            height,
            rotation_degrees,
            planes,
            timestamp: Utc::now(),
        }
    }

    /// Frame holding an already compressed image
    pub fn encoded(bytes: Vec<u8>, width: u32, height: u32, rotation_degrees: i32) -> Self {
        let len = bytes.len();
        Self::new(
            FrameFormat::Encoded,
            width,
            height,
            rotation_degrees,
            vec![Plane::new(bytes, len, 1)],
        )
    }

    /// Frame holding tightly packed RGBA pixels
    pub fn rgba(data: Vec<u8>, width: u32, height: u32, rotation_degrees: i32) -> Self {
        Self::new(
            FrameFormat::Rgba8888,
            width,
            height,
            rotation_degrees,
            vec![Plane::new(data, width as usize * 4, 4)],
        )
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total bytes held across all planes
    pub fn byte_len(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }
}
