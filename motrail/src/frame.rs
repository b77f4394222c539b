//! # Frame storage

use bytemuck::{Pod, Zeroable};

use crate::prelude::v1::*;

/// RGBA colour structure.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Convert from a slice containing `[r, g, b]` elements.
    pub fn from_rgb_slice(rgb: &[u8]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 255,
        }
    }

    /// Convert from a slice containing `[r, g, b, a]` elements.
    pub fn from_rgba_slice(rgba: &[u8]) -> Self {
        Self {
            r: rgba[0],
            g: rgba[1],
            b: rgba[2],
            a: rgba[3],
        }
    }

    /// Perceptual brightness of the pixel (Rec. 709 weights).
    pub fn luma(&self) -> f32 {
        0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32
    }
}

/// Owned rectangular grid of RGBA pixels.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<Rgba>,
    width: usize,
    height: usize,
}

impl Frame {
    /// Create a zeroed frame.
    ///
    /// # Arguments
    ///
    /// * `width` - width of the frame.
    /// * `height` - height of the frame.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![Rgba::default(); width * height],
            width,
            height,
        }
    }

    /// Create a frame from tightly packed RGBA bytes.
    ///
    /// The byte length must be an exact multiple of `4 * width`.
    ///
    /// # Arguments
    ///
    /// * `bytes` - packed `[r, g, b, a]` byte groups in row-major order.
    /// * `width` - width of the frame.
    pub fn from_rgba_bytes(bytes: &[u8], width: usize) -> Result<Self> {
        if width == 0 || bytes.len() % (4 * width) != 0 {
            return Err(anyhow!(
                "invalid frame buffer: {} bytes for width {}",
                bytes.len(),
                width
            ));
        }

        Ok(Self {
            pixels: bytes.chunks_exact(4).map(Rgba::from_rgba_slice).collect(),
            width,
            height: bytes.len() / (4 * width),
        })
    }

    /// Get width and height of the frame.
    pub fn dim(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the pixel at given coordinates.
    pub fn pixel(&self, x: usize, y: usize) -> Rgba {
        self.pixels[self.width * y + x]
    }

    /// Get the pixels in row-major order.
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Get the pixels in row-major order, mutably.
    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }

    /// View the frame as raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// View the frame as raw RGBA bytes, mutably.
    ///
    /// The length is fixed, so capture sources may read a full frame
    /// directly into this slice without resizing the grid.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.pixels)
    }
}

/// Previous/current frame pair retained across ticks.
///
/// A capture source only ever fills the current frame; `swap` promotes it
/// to the previous slot at the end of a tick without copying pixel data.
pub struct FrameBuffer {
    previous: Frame,
    current: Frame,
    seen: u32,
}

impl FrameBuffer {
    /// Create a frame buffer with both slots zeroed.
    ///
    /// # Arguments
    ///
    /// * `width` - width of the retained frames.
    /// * `height` - height of the retained frames.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            previous: Frame::new(width, height),
            current: Frame::new(width, height),
            seen: 0,
        }
    }

    /// Get width and height of the retained frames.
    pub fn dim(&self) -> (usize, usize) {
        self.current.dim()
    }

    /// Get the previous frame.
    pub fn previous(&self) -> &Frame {
        &self.previous
    }

    /// Get the current frame.
    pub fn current(&self) -> &Frame {
        &self.current
    }

    /// Get the current frame, mutably, for a capture source to fill.
    pub fn current_mut(&mut self) -> &mut Frame {
        &mut self.current
    }

    /// Record that a new frame has been written into the current slot.
    pub fn commit(&mut self) {
        self.seen = (self.seen + 1).min(2);
    }

    /// True once both slots hold captured frames and differencing is valid.
    pub fn primed(&self) -> bool {
        self.seen >= 2
    }

    /// Promote the current frame to the previous slot.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.previous, &mut self.current);
    }
}
