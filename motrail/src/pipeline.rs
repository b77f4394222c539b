//! # Per-tick processing pipeline
//!
//! Wires the capture boundary, frame differencing, blob detection and
//! trail tracking into a single synchronous tick. The tracked trail set
//! is exposed for an external renderer to consume.

use log::*;

use crate::capture::CaptureSource;
use crate::detector::{BlobDetector, DetectorSettings};
use crate::difference::{DifferenceEngine, DifferenceSettings};
use crate::frame::FrameBuffer;
use crate::prelude::v1::{anyhow, Result};
use crate::tracker::{Trail, TrailTracker, TrackerSettings};

/// Complete pipeline configuration.
///
/// Invalid values are rejected by [`validate`](Self::validate) when the
/// pipeline is built; nothing is silently clamped.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    pub difference: DifferenceSettings,
    pub detector: DetectorSettings,
    pub tracker: TrackerSettings,
}

impl PipelineConfig {
    /// Check every option for validity.
    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;

        if d.grid_size == 0 {
            return Err(anyhow!("grid size must be at least 1"));
        }

        if !(0.0..=255.0).contains(&d.motion_threshold) {
            return Err(anyhow!(
                "motion threshold {} outside [0; 255]",
                d.motion_threshold
            ));
        }

        if d.min_blob_size == 0 {
            return Err(anyhow!("minimum blob size must be at least 1"));
        }

        if d.max_blobs == 0 {
            return Err(anyhow!("maximum blob count must be at least 1"));
        }

        let t = &self.tracker;

        if !(0.0..=1.0).contains(&t.position_smoothing) {
            return Err(anyhow!(
                "position smoothing factor {} outside [0; 1]",
                t.position_smoothing
            ));
        }

        if !(0.0..=1.0).contains(&t.velocity_smoothing) {
            return Err(anyhow!(
                "velocity smoothing factor {} outside [0; 1]",
                t.velocity_smoothing
            ));
        }

        if t.max_trail_length == 0 {
            return Err(anyhow!("maximum trail length must be at least 1"));
        }

        if !(t.trail_decay > 0.0) {
            return Err(anyhow!("trail decay {} must be positive", t.trail_decay));
        }

        if !(t.max_match_distance >= 0.0) {
            return Err(anyhow!(
                "match distance {} must be non-negative",
                t.max_match_distance
            ));
        }

        Ok(())
    }
}

/// Synchronous per-tick motion analysis pipeline.
pub struct TrailPipeline {
    capture: Box<dyn CaptureSource>,
    frames: FrameBuffer,
    difference: DifferenceEngine,
    detector: BlobDetector,
    tracker: TrailTracker,
    ticks: usize,
}

impl TrailPipeline {
    /// Build a pipeline around a capture source.
    ///
    /// Fails when the configuration is invalid or the source cannot
    /// report its frame dimensions.
    ///
    /// # Arguments
    ///
    /// * `capture` - frame source driving the pipeline.
    /// * `config` - validated-on-entry configuration.
    pub fn new(capture: Box<dyn CaptureSource>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let (width, height) = capture
            .get_dimensions()
            .ok_or_else(|| anyhow!("capture source did not report frame dimensions"))?;

        info!(
            "trail pipeline: {}x{} frames, {:?} differencing, grid size {}",
            width, height, config.difference.mode, config.detector.grid_size
        );

        Ok(Self {
            capture,
            frames: FrameBuffer::new(width, height),
            difference: DifferenceEngine::new(config.difference),
            detector: BlobDetector::new(config.detector),
            tracker: TrailTracker::new(config.tracker),
            ticks: 0,
        })
    }

    /// Run a single tick.
    ///
    /// Returns `Ok(true)` when a frame pair was processed, `Ok(false)`
    /// when processing was skipped because the source has not yet
    /// delivered enough frames to difference. Capture errors propagate.
    pub fn tick(&mut self) -> Result<bool> {
        if !self.capture.grab_frame(self.frames.current_mut())? {
            return Ok(false);
        }

        self.frames.commit();

        if !self.frames.primed() {
            self.frames.swap();
            return Ok(false);
        }

        let signal = self
            .difference
            .compute(self.frames.previous(), self.frames.current());
        let blobs = self.detector.detect(&signal);
        self.tracker.update(&blobs);

        self.frames.swap();
        self.ticks += 1;

        debug!(
            "tick {}: {} blobs, {}/{} trails active",
            self.ticks,
            blobs.len(),
            self.tracker.active_count(),
            self.tracker.len()
        );

        Ok(true)
    }

    /// Iterate the live trails for rendering.
    pub fn trails(&self) -> impl Iterator<Item = &Trail> {
        self.tracker.trails()
    }

    /// Number of processed ticks.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Frame dimensions the pipeline was built for.
    pub fn dimensions(&self) -> (usize, usize) {
        self.frames.dim()
    }

    /// Framerate of the underlying capture source, if known.
    pub fn get_framerate(&self) -> Option<f64> {
        self.capture.get_framerate()
    }
}
