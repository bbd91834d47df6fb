// ================================
// src/lidar.rs - ray-cast range sensor against the track
// ================================
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::{
    config::SensorConfig,
    control::RoverState,
    geometry::{heading_vector, ray_circle, ray_segment, Point, Vec2},
    track::Track,
};

/// Forward/right/back/left clearances for consumers without a full scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LidarReading {
    pub forward: f64,
    pub right: f64,
    pub back: f64,
    pub left: f64,
}

impl LidarReading {
    /// Picks the quarter beams out of a circular scan. `None` when empty.
    pub fn from_scan(scan: &[f64]) -> Option<Self> {
        let n = scan.len();
        if n == 0 {
            return None;
        }
        Some(Self {
            forward: scan[0],
            right: scan[(n / 4) % n],
            back: scan[(n / 2) % n],
            left: scan[(3 * n / 4) % n],
        })
    }
}

/// Clearance along one ray: nearest edge or obstacle hit minus the rover
/// radius, clamped to `[min_range, max_range]`. No hit reports `max_range`.
fn beam_clearance(
    origin: &Point,
    dir: &Vec2,
    track: &Track,
    max_range: f64,
    robot_radius: f64,
    min_range: f64,
) -> f64 {
    let mut best = max_range;

    for edge in track.edges() {
        for seg in edge.windows(2) {
            if let Some(t) = ray_segment(origin, dir, &seg[0], &seg[1]) {
                best = best.min(t - robot_radius);
            }
        }
    }

    for o in track.obstacles() {
        if let Some(t) = ray_circle(origin, dir, &o.position, o.radius) {
            best = best.min(t - robot_radius);
        }
    }

    best.min(max_range).max(min_range)
}

/// Circular scan into a reusable buffer. Beam `i` points at
/// `heading + i * 2π / beam_count`; beam 0 is straight ahead.
pub fn scan_into(
    out: &mut Vec<f64>,
    pose: &RoverState,
    track: &Track,
    beam_count: usize,
    max_range: f64,
    robot_radius: f64,
    min_range: f64,
) {
    out.clear();
    out.reserve(beam_count);
    let origin = pose.position();
    let step = TAU / beam_count as f64;
    out.extend((0..beam_count).map(|i| {
        let dir = heading_vector(pose.heading + i as f64 * step);
        beam_clearance(&origin, &dir, track, max_range, robot_radius, min_range)
    }));
}

pub fn scan(
    pose: &RoverState,
    track: &Track,
    beam_count: usize,
    max_range: f64,
    robot_radius: f64,
    min_range: f64,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(beam_count);
    scan_into(
        &mut out,
        pose,
        track,
        beam_count,
        max_range,
        robot_radius,
        min_range,
    );
    out
}

/// Four-beam variant: forward, right (+π/2), back, left (−π/2).
pub fn cardinal_readings(
    pose: &RoverState,
    track: &Track,
    max_range: f64,
    robot_radius: f64,
    min_range: f64,
) -> LidarReading {
    let origin = pose.position();
    let read = |offset: f64| {
        let dir = heading_vector(pose.heading + offset);
        beam_clearance(&origin, &dir, track, max_range, robot_radius, min_range)
    };
    LidarReading {
        forward: read(0.0),
        right: read(FRAC_PI_2),
        back: read(PI),
        left: read(-FRAC_PI_2),
    }
}

/// Range sensor bound to one rover body and sensor configuration.
#[derive(Debug, Clone)]
pub struct Lidar {
    config: SensorConfig,
    robot_radius: f64,
}

impl Lidar {
    pub fn new(config: SensorConfig, robot_radius: f64) -> Self {
        Self {
            config,
            robot_radius,
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn scan(&self, pose: &RoverState, track: &Track) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.config.beam_count);
        self.scan_into(&mut out, pose, track);
        out
    }

    pub fn scan_into(&self, out: &mut Vec<f64>, pose: &RoverState, track: &Track) {
        scan_into(
            out,
            pose,
            track,
            self.config.beam_count,
            self.config.max_range,
            self.robot_radius,
            self.config.min_range,
        );
    }
}
