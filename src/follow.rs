// ================================
// src/follow.rs - centerline tracking and lookahead target
// ================================
use crate::{config::FollowerConfig, geometry::Point, track::Track};

/// Remembers where on the centerline the rover was last seen so the
/// nearest-sample search stays local.
#[derive(Debug, Clone)]
pub struct PathFollower {
    config: FollowerConfig,
    index: usize,
}

impl PathFollower {
    pub fn new(config: FollowerConfig, start_index: usize) -> Self {
        Self {
            config,
            index: start_index,
        }
    }

    pub fn config(&self) -> &FollowerConfig {
        &self.config
    }

    /// Last index returned by [`PathFollower::closest_index`].
    pub fn index(&self) -> usize {
        self.index
    }

    /// Nearest centerline sample to `pos`, searched within ±`window` of the
    /// previous result. Falls back to a full scan when the windowed best is
    /// farther than `reacquire_distance`.
    pub fn closest_index(&mut self, track: &Track, pos: &Point) -> usize {
        let pts = track.center_line();
        let n = pts.len();
        if n == 0 {
            self.index = 0;
            return 0;
        }

        let start = self.index % n;
        let window = self.config.window.min(n) as isize;
        let mut best = start;
        let mut best_d = nalgebra::distance_squared(&pts[start], pos);
        for k in -window..=window {
            let i = (start as isize + k).rem_euclid(n as isize) as usize;
            let d = nalgebra::distance_squared(&pts[i], pos);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }

        if best_d > self.config.reacquire_distance.powi(2) {
            best = track.closest_index(pos);
        }
        self.index = best;
        best
    }

    /// Point `distance` arc-length ahead of sample `from`, wrapping around
    /// the loop.
    pub fn lookahead_point(track: &Track, from: usize, distance: f64) -> Point {
        let pts = track.center_line();
        let n = pts.len();
        if n == 0 {
            return Point::origin();
        }

        let mut i = from % n;
        let mut remaining = distance;
        // one full lap at most; a zero-length loop can't satisfy any distance
        for _ in 0..n {
            if remaining <= 0.0 {
                break;
            }
            let a = pts[i];
            let b = pts[(i + 1) % n];
            let seg = nalgebra::distance(&a, &b);
            if seg >= remaining {
                let t = if seg > 0.0 { remaining / seg } else { 0.0 };
                return a + (b - a) * t;
            }
            remaining -= seg;
            i = (i + 1) % n;
        }
        pts[i]
    }

    /// World-frame heading from `pos` to the lookahead target.
    pub fn target_heading(&mut self, track: &Track, pos: &Point) -> Option<f64> {
        if track.center_line().is_empty() {
            return None;
        }
        let idx = self.closest_index(track, pos);
        let target = Self::lookahead_point(track, idx, self.config.lookahead);
        let d = target - pos;
        Some(d.y.atan2(d.x))
    }
}
