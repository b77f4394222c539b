//! End-to-end run of the synthetic source through the full pipeline.

use motrail::prelude::v1::*;

#[test]
fn synthetic_square_leaves_moving_trails() {
    let capture = frame_loader::create_capture("synth:96x48").unwrap();

    let config = PipelineConfig {
        detector: DetectorSettings {
            motion_threshold: 25.0,
            min_blob_size: 4,
            max_blobs: 4,
            grid_size: 1,
        },
        tracker: TrackerSettings {
            max_match_distance: 20.0,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut pipeline = TrailPipeline::new(capture, config).unwrap();

    // First frame only primes the buffer.
    assert!(!pipeline.tick().unwrap());

    for _ in 0..8 {
        assert!(pipeline.tick().unwrap());
    }

    // The drifting square produces leading/trailing difference regions
    // that track as steadily moving trails.
    assert!(pipeline.trails().count() >= 1);
    assert!(pipeline.trails().any(|t| t.active() && t.speed() > 0.5));

    let longest = pipeline
        .trails()
        .map(|t| t.points().len())
        .max()
        .unwrap_or(0);
    assert!(longest >= 4, "trail history too short: {}", longest);
}
