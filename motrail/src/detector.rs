//! # Motion blob detection

use crate::signal::MotionSignal;
use nalgebra as na;
use std::collections::VecDeque;

/// Connected region of above-threshold motion, reduced to a summary.
#[derive(Clone, Copy, Debug)]
pub struct Blob {
    /// Arithmetic mean of member coordinates, in frame space.
    pub centroid: na::Point2<f32>,
    /// Mean motion intensity across members.
    pub intensity: f32,
    /// Member count, in pixels or cells depending on granularity.
    pub size: usize,
}

/// Blob detector tunables.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorSettings {
    /// Intensity cutoff above which a location counts as motion.
    pub motion_threshold: f32,
    /// Minimum component size (pixels or cells) to keep.
    pub min_blob_size: usize,
    /// Cap on blobs returned per tick.
    pub max_blobs: usize,
    /// Cell edge length. 1 selects full-resolution pixel connectivity.
    pub grid_size: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            motion_threshold: 25.0,
            min_blob_size: 2,
            max_blobs: 16,
            grid_size: 8,
        }
    }
}

/// Boolean motion grid the flood fill runs over, at pixel or cell
/// granularity.
struct MotionGrid {
    width: usize,
    height: usize,
    cell: usize,
    active: Vec<bool>,
    intensity: Vec<f32>,
}

impl MotionGrid {
    fn build(signal: &MotionSignal, cell: usize, threshold: f32) -> Self {
        let (sw, sh) = signal.dim();

        if cell <= 1 {
            let mut active = vec![false; sw * sh];
            let mut intensity = vec![0.0; sw * sh];

            for (x, y, v) in signal.iter() {
                if v > threshold {
                    active[y * sw + x] = true;
                    intensity[y * sw + x] = v;
                }
            }

            Self {
                width: sw,
                height: sh,
                cell: 1,
                active,
                intensity,
            }
        } else {
            // Edge cells may cover a partial pixel area.
            let width = (sw + cell - 1) / cell;
            let height = (sh + cell - 1) / cell;
            let mut sum = vec![0.0; width * height];
            let mut contributing = vec![0usize; width * height];

            for (x, y, v) in signal.iter() {
                if v > threshold {
                    let idx = (y / cell) * width + x / cell;
                    sum[idx] += v;
                    contributing[idx] += 1;
                }
            }

            // A cell is motion if any contained pixel crossed the
            // threshold; its intensity is the mean of those pixels.
            let active = contributing.iter().map(|&c| c > 0).collect();
            let intensity = sum
                .iter()
                .zip(contributing.iter())
                .map(|(&s, &c)| if c > 0 { s / c as f32 } else { 0.0 })
                .collect();

            Self {
                width,
                height,
                cell,
                active,
                intensity,
            }
        }
    }

    /// Map grid-space coordinates back into frame space.
    fn to_frame(&self, x: f32, y: f32) -> na::Point2<f32> {
        if self.cell <= 1 {
            na::Point2::new(x, y)
        } else {
            let cell = self.cell as f32;
            na::Point2::new(x * cell + cell / 2.0, y * cell + cell / 2.0)
        }
    }
}

/// Finds connected regions of above-threshold motion in a signal.
pub struct BlobDetector {
    settings: DetectorSettings,
}

impl BlobDetector {
    /// Create a blob detector.
    ///
    /// # Arguments
    ///
    /// * `settings` - thresholds and granularity selection.
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    /// Detect motion blobs in a signal.
    ///
    /// Returns blobs ordered largest-first, ties broken by discovery
    /// order, truncated to the configured maximum count.
    pub fn detect(&self, signal: &MotionSignal) -> Vec<Blob> {
        let grid = MotionGrid::build(signal, self.settings.grid_size, self.settings.motion_threshold);

        let mut visited = vec![false; grid.active.len()];
        let mut queue = VecDeque::new();
        let mut blobs = Vec::new();

        // Single pass over the grid; every location enters the queue at
        // most once.
        for start in 0..grid.active.len() {
            if !grid.active[start] || visited[start] {
                continue;
            }

            visited[start] = true;
            queue.push_back(start);

            let mut size = 0usize;
            let (mut sum_x, mut sum_y, mut sum_intensity) = (0.0f32, 0.0f32, 0.0f32);

            // Breadth-first flood fill over the 4-connected neighborhood.
            while let Some(idx) = queue.pop_front() {
                size += 1;
                sum_x += (idx % grid.width) as f32;
                sum_y += (idx / grid.width) as f32;
                sum_intensity += grid.intensity[idx];

                let (x, y) = ((idx % grid.width) as isize, (idx / grid.width) as isize);

                for (ox, oy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let (nx, ny) = (x + ox, y + oy);

                    if (0..grid.width as isize).contains(&nx)
                        && (0..grid.height as isize).contains(&ny)
                    {
                        let nidx = ny as usize * grid.width + nx as usize;

                        if grid.active[nidx] && !visited[nidx] {
                            visited[nidx] = true;
                            queue.push_back(nidx);
                        }
                    }
                }
            }

            if size >= self.settings.min_blob_size {
                blobs.push(Blob {
                    centroid: grid.to_frame(sum_x / size as f32, sum_y / size as f32),
                    intensity: sum_intensity / size as f32,
                    size,
                });
            }
        }

        // Stable sort keeps discovery order between equal sizes.
        blobs.sort_by(|a, b| b.size.cmp(&a.size));
        blobs.truncate(self.settings.max_blobs);

        blobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn fill_rect(signal: &mut MotionSignal, x0: usize, y0: usize, w: usize, h: usize, v: f32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                signal.set(x, y, v);
            }
        }
    }

    fn pixel_detector(min_blob_size: usize, max_blobs: usize) -> BlobDetector {
        BlobDetector::new(DetectorSettings {
            motion_threshold: 25.0,
            min_blob_size,
            max_blobs,
            grid_size: 1,
        })
    }

    #[test]
    fn quiet_signal_no_blobs() {
        let signal = MotionSignal::new(32, 32);
        assert!(pixel_detector(1, 16).detect(&signal).is_empty());
    }

    #[test]
    fn single_region_exact_centroid() {
        let mut signal = MotionSignal::new(20, 20);
        fill_rect(&mut signal, 5, 5, 4, 3, 200.0);

        let blobs = pixel_detector(4, 16).detect(&signal);

        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size, 12);
        assert_approx_eq!(blobs[0].centroid.x, 6.5);
        assert_approx_eq!(blobs[0].centroid.y, 6.0);
        assert_approx_eq!(blobs[0].intensity, 200.0);
    }

    #[test]
    fn gap_separated_regions_stay_distinct() {
        let mut signal = MotionSignal::new(20, 10);
        fill_rect(&mut signal, 2, 2, 3, 3, 100.0);
        fill_rect(&mut signal, 6, 2, 3, 3, 100.0);

        let blobs = pixel_detector(1, 16).detect(&signal);
        assert_eq!(blobs.len(), 2);
    }

    #[test]
    fn corner_touching_regions_stay_distinct() {
        // Diagonal adjacency is not connectivity.
        let mut signal = MotionSignal::new(10, 10);
        fill_rect(&mut signal, 1, 1, 2, 2, 100.0);
        fill_rect(&mut signal, 3, 3, 2, 2, 100.0);

        let blobs = pixel_detector(1, 16).detect(&signal);
        assert_eq!(blobs.len(), 2);
    }

    #[test]
    fn sorted_by_size_and_capped() {
        let mut signal = MotionSignal::new(32, 32);
        fill_rect(&mut signal, 1, 1, 2, 2, 100.0);
        fill_rect(&mut signal, 10, 10, 3, 3, 100.0);
        fill_rect(&mut signal, 20, 20, 1, 1, 100.0);

        let blobs = pixel_detector(1, 2).detect(&signal);

        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].size, 9);
        assert_eq!(blobs[1].size, 4);
    }

    #[test]
    fn small_components_discarded() {
        let mut signal = MotionSignal::new(16, 16);
        fill_rect(&mut signal, 3, 3, 2, 1, 200.0);

        assert!(pixel_detector(4, 16).detect(&signal).is_empty());
    }

    #[test]
    fn cell_grid_maps_centroid_to_frame_space() {
        // Motion filling cells (2,2)-(3,3) of a 10-pixel grid.
        let mut signal = MotionSignal::new(100, 100);
        fill_rect(&mut signal, 20, 20, 20, 20, 200.0);

        let detector = BlobDetector::new(DetectorSettings {
            motion_threshold: 25.0,
            min_blob_size: 1,
            max_blobs: 16,
            grid_size: 10,
        });
        let blobs = detector.detect(&signal);

        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size, 4);
        assert_approx_eq!(blobs[0].centroid.x, 30.0);
        assert_approx_eq!(blobs[0].centroid.y, 30.0);
    }

    #[test]
    fn cell_intensity_averages_contributing_pixels() {
        let mut signal = MotionSignal::new(8, 8);
        signal.set(0, 0, 100.0);
        signal.set(1, 0, 200.0);
        // The rest of the cell stays below threshold and does not
        // contribute to the mean.
        signal.set(2, 0, 10.0);

        let detector = BlobDetector::new(DetectorSettings {
            motion_threshold: 50.0,
            min_blob_size: 1,
            max_blobs: 4,
            grid_size: 4,
        });
        let blobs = detector.detect(&signal);

        assert_eq!(blobs.len(), 1);
        assert_approx_eq!(blobs[0].intensity, 150.0);
        // One active cell at index (0,0) maps to its pixel-space center.
        assert_approx_eq!(blobs[0].centroid.x, 2.0);
        assert_approx_eq!(blobs[0].centroid.y, 2.0);
    }
}
