//! # Trail tracking
//!
//! Associates per-tick motion blobs with persistent trails. Matching is
//! greedy nearest-neighbor in detector output order; matched trails get a
//! new smoothed position record, unmatched trails age out and are evicted
//! once their last record expires.

use crate::detector::Blob;
use log::*;
use nalgebra as na;
use std::collections::VecDeque;

/// Freshly recorded positions start at this age and decay from it.
const MAX_POINT_AGE: f32 = 255.0;

/// Process-unique trail identifier.
///
/// Ids come from a monotonic counter owned by the tracker, so assignment
/// is deterministic and ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct TrailId(pub u64);

/// Single recorded position of a trail.
#[derive(Clone, Copy, Debug)]
pub struct TrailPoint {
    /// Smoothed position at record time, in frame space.
    pub pos: na::Point2<f32>,
    /// Smoothed speed at record time.
    pub speed: f32,
    /// Mean intensity of the blob that produced the record.
    pub intensity: f32,
    /// Remaining lifetime; decays while the trail goes unmatched.
    pub age: f32,
}

/// Persistent tracked entity representing one moving region's history.
#[derive(Clone, Debug)]
pub struct Trail {
    id: TrailId,
    points: VecDeque<TrailPoint>,
    pos: na::Point2<f32>,
    velocity: na::Vector2<f32>,
    speed: f32,
    active: bool,
}

impl Trail {
    fn new(id: TrailId, centroid: na::Point2<f32>) -> Self {
        Self {
            id,
            points: VecDeque::new(),
            pos: centroid,
            velocity: na::Vector2::zeros(),
            speed: 0.0,
            active: true,
        }
    }

    /// Unique id of the trail.
    pub fn id(&self) -> TrailId {
        self.id
    }

    /// Recorded positions, oldest first.
    pub fn points(&self) -> impl ExactSizeIterator<Item = &TrailPoint> {
        self.points.iter()
    }

    /// Most recent recorded position, if any survive.
    pub fn last_point(&self) -> Option<&TrailPoint> {
        self.points.back()
    }

    /// Exponentially smoothed position.
    pub fn pos(&self) -> na::Point2<f32> {
        self.pos
    }

    /// Exponentially smoothed velocity, in frame units per tick.
    pub fn velocity(&self) -> na::Vector2<f32> {
        self.velocity
    }

    /// Magnitude of the smoothed velocity.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// True iff a blob was matched to this trail in the current tick.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Fold a matched blob into the smoothed kinematics and record it.
    fn record(&mut self, blob: &Blob, settings: &TrackerSettings) {
        let displacement = self
            .points
            .back()
            .map(|p| blob.centroid - p.pos)
            .unwrap_or_else(na::Vector2::zeros);

        let vf = settings.velocity_smoothing;
        self.velocity = self.velocity * vf + displacement * (1.0 - vf);
        self.speed = self.velocity.norm();

        let pf = settings.position_smoothing;
        self.pos = na::Point2::from(self.pos.coords * pf + blob.centroid.coords * (1.0 - pf));

        self.points.push_back(TrailPoint {
            pos: self.pos,
            speed: self.speed,
            intensity: blob.intensity,
            age: MAX_POINT_AGE,
        });

        if self.points.len() > settings.max_trail_length {
            self.points.pop_front();
        }
    }

    /// Age every record; records at or below zero age are dropped.
    fn decay(&mut self, amount: f32) {
        for point in &mut self.points {
            point.age -= amount;
        }
        self.points.retain(|p| p.age > 0.0);
    }
}

/// Trail tracker tunables.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackerSettings {
    /// Position EMA factor in `[0; 1]`; larger is steadier.
    pub position_smoothing: f32,
    /// Velocity EMA factor in `[0; 1]`; larger is steadier.
    pub velocity_smoothing: f32,
    /// FIFO cap on recorded positions per trail.
    pub max_trail_length: usize,
    /// Per-tick age decrement applied to unmatched trails.
    pub trail_decay: f32,
    /// Nearest-neighbor gate for blob-to-trail association.
    pub max_match_distance: f32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            position_smoothing: 0.65,
            velocity_smoothing: 0.8,
            max_trail_length: 32,
            trail_decay: 16.0,
            max_match_distance: 64.0,
        }
    }
}

/// Owns the set of live trails and advances it one tick at a time.
pub struct TrailTracker {
    settings: TrackerSettings,
    trails: Vec<Trail>,
    next_id: u64,
}

impl TrailTracker {
    /// Create an empty tracker.
    ///
    /// # Arguments
    ///
    /// * `settings` - smoothing, matching and lifetime tunables.
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            trails: Vec::new(),
            next_id: 0,
        }
    }

    /// Advance the trail set by one tick.
    ///
    /// Blobs are processed in the detector's output order; each greedily
    /// binds the nearest still-unmatched trail within the match gate, or
    /// starts a new trail. Trails left unmatched age and may be evicted.
    ///
    /// # Arguments
    ///
    /// * `blobs` - blobs detected in the current tick.
    pub fn update(&mut self, blobs: &[Blob]) {
        for trail in &mut self.trails {
            trail.active = false;
        }

        // Tracks both pre-existing and newly spawned trails; spawned ones
        // are born matched so later blobs cannot bind them.
        let mut matched = vec![false; self.trails.len()];

        for blob in blobs {
            let mut best: Option<(usize, f32)> = None;

            // Linear scan in registry order; the first strict minimum
            // wins, keeping tie-breaks reproducible.
            for (i, trail) in self.trails.iter().enumerate() {
                if matched[i] {
                    continue;
                }

                let anchor = trail.last_point().map(|p| p.pos).unwrap_or(trail.pos);
                let dist = na::distance(&anchor, &blob.centroid);

                if dist <= self.settings.max_match_distance
                    && best.map(|(_, d)| dist < d).unwrap_or(true)
                {
                    best = Some((i, dist));
                }
            }

            match best {
                Some((i, _)) => {
                    matched[i] = true;
                    let trail = &mut self.trails[i];
                    trail.active = true;
                    trail.record(blob, &self.settings);
                }
                None => {
                    let id = TrailId(self.next_id);
                    self.next_id += 1;

                    let mut trail = Trail::new(id, blob.centroid);
                    trail.record(blob, &self.settings);

                    self.trails.push(trail);
                    matched.push(true);
                }
            }
        }

        for (i, trail) in self.trails.iter_mut().enumerate() {
            if !matched[i] {
                trail.decay(self.settings.trail_decay);

                if trail.points.is_empty() {
                    debug!("trail {} aged out", trail.id.0);
                }
            }
        }

        self.trails.retain(|t| !t.points.is_empty());
    }

    /// Iterate the live trails in creation order.
    pub fn trails(&self) -> impl Iterator<Item = &Trail> {
        self.trails.iter()
    }

    /// Number of live trails.
    pub fn len(&self) -> usize {
        self.trails.len()
    }

    /// True when no trails are live.
    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    /// Number of trails matched in the current tick.
    pub fn active_count(&self) -> usize {
        self.trails.iter().filter(|t| t.active).count()
    }
}
