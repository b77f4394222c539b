//! # Motion Trail Processing Library
//!
//! This library detects and tracks moving regions in a video stream using
//! frame differencing. Consecutive frames are differenced into a motion
//! intensity signal, the signal is grouped into blobs through
//! connected-component search, and blobs are associated across frames into
//! persistent, decaying trails.
//!
//! The easiest way to use the library is to import its prelude:
//!
//! ```
//! use motrail::prelude::v1::*;
//! ```
//!
//! Frames are supplied through the [`CaptureSource`](capture::CaptureSource)
//! trait, and the tracked trail state is consumed by an external renderer
//! through [`TrailPipeline::trails`](pipeline::TrailPipeline::trails).

pub mod capture;
pub mod detector;
pub mod difference;
pub mod frame;
pub mod pipeline;
pub mod signal;
pub mod tracker;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            capture::CaptureSource,
            detector::{Blob, BlobDetector, DetectorSettings},
            difference::{DiffMode, DifferenceEngine, DifferenceSettings},
            frame::{Frame, FrameBuffer, Rgba},
            pipeline::{PipelineConfig, TrailPipeline},
            signal::MotionSignal,
            tracker::{Trail, TrailId, TrailPoint, TrailTracker, TrackerSettings},
        };
        pub use anyhow::{anyhow, Error, Result};
    }
}
