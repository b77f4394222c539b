//! # Frame differencing

use crate::frame::Frame;
use crate::signal::MotionSignal;

/// Blur window reaches one pixel in each direction (a 3x3 box). Frames are
/// always smoothed before differencing to suppress sensor noise.
const BLUR_RADIUS: isize = 1;

/// Difference signal flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum DiffMode {
    /// Mean absolute delta across the R, G and B channels.
    Rgb,
    /// Absolute delta of Rec. 709 perceptual brightness.
    Luma,
}

/// Difference engine tunables.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DifferenceSettings {
    pub mode: DiffMode,
}

impl Default for DifferenceSettings {
    fn default() -> Self {
        Self {
            mode: DiffMode::Rgb,
        }
    }
}

/// Computes a per-pixel motion intensity signal from two frames.
///
/// The engine is a pure function of the frame pair. Both frames are run
/// through a fixed-radius box blur before differencing.
pub struct DifferenceEngine {
    settings: DifferenceSettings,
}

impl DifferenceEngine {
    /// Create a difference engine.
    ///
    /// # Arguments
    ///
    /// * `settings` - difference mode selection.
    pub fn new(settings: DifferenceSettings) -> Self {
        Self { settings }
    }

    /// Compute the motion signal between two frames.
    ///
    /// Both frames must share dimensions. Output intensities stay within
    /// the `[0; 255]` range of the inputs.
    ///
    /// # Arguments
    ///
    /// * `previous` - frame retained from the previous tick.
    /// * `current` - frame captured this tick.
    pub fn compute(&self, previous: &Frame, current: &Frame) -> MotionSignal {
        assert_eq!(
            previous.dim(),
            current.dim(),
            "retained frame dimensions diverged"
        );

        let (width, height) = current.dim();
        let mut signal = MotionSignal::new(width, height);

        match self.settings.mode {
            DiffMode::Luma => {
                let prev = blurred(luma_plane(previous), width, height);
                let cur = blurred(luma_plane(current), width, height);

                for (i, (p, c)) in prev.iter().zip(cur.iter()).enumerate() {
                    signal.set(i % width, i / width, (c - p).abs());
                }
            }
            DiffMode::Rgb => {
                let prev = channel_planes(previous).map(|p| blurred(p, width, height));
                let cur = channel_planes(current).map(|p| blurred(p, width, height));

                for i in 0..width * height {
                    let delta = (0..3)
                        .map(|ch| (cur[ch][i] - prev[ch][i]).abs())
                        .sum::<f32>()
                        / 3.0;
                    signal.set(i % width, i / width, delta);
                }
            }
        }

        signal
    }
}

/// Extract the R, G and B planes of a frame.
fn channel_planes(frame: &Frame) -> [Vec<f32>; 3] {
    let channel = |select: fn(crate::frame::Rgba) -> u8| {
        frame
            .pixels()
            .iter()
            .map(|&px| select(px) as f32)
            .collect::<Vec<_>>()
    };

    [channel(|px| px.r), channel(|px| px.g), channel(|px| px.b)]
}

/// Extract the perceptual brightness plane of a frame.
fn luma_plane(frame: &Frame) -> Vec<f32> {
    frame.pixels().iter().map(|px| px.luma()).collect()
}

/// Separable box blur with edge windows clamped to the plane.
fn blurred(mut plane: Vec<f32>, width: usize, height: usize) -> Vec<f32> {
    blur_axis(&mut plane, width, height, true);
    blur_axis(&mut plane, width, height, false);
    plane
}

fn blur_axis(plane: &mut Vec<f32>, width: usize, height: usize, horizontal: bool) {
    let mut out = vec![0.0; plane.len()];

    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            let mut cnt = 0;

            for d in -BLUR_RADIUS..=BLUR_RADIUS {
                let (sx, sy) = if horizontal {
                    (x as isize + d, y as isize)
                } else {
                    (x as isize, y as isize + d)
                };

                if (0..width as isize).contains(&sx) && (0..height as isize).contains(&sy) {
                    sum += plane[sy as usize * width + sx as usize];
                    cnt += 1;
                }
            }

            out[y * width + x] = sum / cnt as f32;
        }
    }

    *plane = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgba;
    use assert_approx_eq::assert_approx_eq;

    fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Frame {
        let mut frame = Frame::new(width, height);
        for px in frame.pixels_mut() {
            *px = Rgba::from_rgb_slice(&rgb);
        }
        frame
    }

    #[test]
    fn identical_frames_zero_signal() {
        let a = solid(16, 12, [90, 40, 10]);
        let b = a.clone();

        for mode in [DiffMode::Rgb, DiffMode::Luma] {
            let engine = DifferenceEngine::new(DifferenceSettings { mode });
            let signal = engine.compute(&a, &b);
            assert_eq!(signal.dim(), (16, 12));
            assert_eq!(signal.max_intensity(), 0.0);
        }
    }

    #[test]
    fn rgb_delta_is_mean_of_channel_deltas() {
        // Uniform frames stay uniform under the blur, making the delta exact.
        let prev = solid(8, 8, [0, 0, 0]);
        let cur = solid(8, 8, [30, 60, 90]);

        let engine = DifferenceEngine::new(DifferenceSettings {
            mode: DiffMode::Rgb,
        });
        let signal = engine.compute(&prev, &cur);

        for (_, _, v) in signal.iter() {
            assert_approx_eq!(v, 60.0, 1e-3);
        }
    }

    #[test]
    fn luma_delta_uses_rec709_weights() {
        let prev = solid(8, 8, [0, 0, 0]);
        let cur = solid(8, 8, [0, 100, 0]);

        let engine = DifferenceEngine::new(DifferenceSettings {
            mode: DiffMode::Luma,
        });
        let signal = engine.compute(&prev, &cur);

        for (_, _, v) in signal.iter() {
            assert_approx_eq!(v, 71.52, 1e-2);
        }
    }

    #[test]
    fn blur_spreads_and_attenuates_point_change() {
        let prev = solid(9, 9, [0, 0, 0]);
        let mut cur = prev.clone();
        cur.pixels_mut()[4 * 9 + 4] = Rgba::from_rgb_slice(&[255, 255, 255]);

        let engine = DifferenceEngine::new(DifferenceSettings {
            mode: DiffMode::Rgb,
        });
        let signal = engine.compute(&prev, &cur);

        // The changed pixel registers at reduced strength and bleeds into
        // its neighborhood, but not past the blur window.
        assert_approx_eq!(signal.get(4, 4), 255.0 / 9.0, 1e-3);
        assert_approx_eq!(signal.get(5, 5), 255.0 / 9.0, 1e-3);
        assert_eq!(signal.get(8, 8), 0.0);
    }
}
