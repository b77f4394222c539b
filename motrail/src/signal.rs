//! # Motion intensity signal

use nalgebra as na;

/// Scalar grid of per-location motion intensity.
///
/// Values are change magnitudes in the `[0; 255]` range, produced fresh
/// each tick by a [`DifferenceEngine`](crate::difference::DifferenceEngine).
pub struct MotionSignal {
    data: na::DMatrix<f32>,
}

impl MotionSignal {
    /// Create a zeroed signal.
    ///
    /// # Arguments
    ///
    /// * `width` - width of the signal grid.
    /// * `height` - height of the signal grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: na::DMatrix::zeros(height, width),
        }
    }

    /// Get width and height of the signal grid.
    pub fn dim(&self) -> (usize, usize) {
        (self.data.ncols(), self.data.nrows())
    }

    /// Get size of the signal grid.
    ///
    /// This is the same as `width * height`.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Get intensity at given coordinates.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[(y, x)]
    }

    /// Set intensity at given coordinates.
    pub fn set(&mut self, x: usize, y: usize, intensity: f32) {
        self.data[(y, x)] = intensity;
    }

    /// Iterate every element of the signal in row-major order.
    ///
    /// The resulting iterator yields `(x, y, intensity)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        let (width, height) = self.dim();
        (0..height).flat_map(move |y| (0..width).map(move |x| (x, y, self.get(x, y))))
    }

    /// Largest intensity in the grid, or zero when the grid is empty.
    pub fn max_intensity(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }
}
