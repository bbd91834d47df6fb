// ================================
// src/resolve.rs - push a proposed pose out of obstacles and walls
// ================================
use tracing::{debug, trace};

use crate::{
    control::RoverState,
    geometry::{closest_on_polyline, unit_or, Point, Vec2},
    track::Track,
};

pub const MAX_PASSES: usize = 12;
/// Margin kept beyond the rover radius for obstacles and edges.
pub const EXTRA_CLEARANCE: f64 = 2.0;
/// Penetration shallower than this is not corrected.
const RESOLVE_EPS: f64 = 1e-9;

/// Nearest point on either edge polyline and its distance.
fn nearest_edge_point(track: &Track, p: &Point) -> Option<(f64, Point)> {
    track
        .edges()
        .into_iter()
        .filter_map(|edge| closest_on_polyline(edge, p))
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

/// Outcome of [`resolve_with_status`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub state: RoverState,
    /// Passes run, the final no-change pass included
    pub passes: usize,
    /// `false` when the pass limit ran out with corrections still pending
    pub settled: bool,
}

/// Geometric correction of `proposed` so it keeps `robot_radius + 2` from
/// every obstacle and both edges. Heading is untouched.
///
/// `nearest_idx` is the centerline sample closest to the proposed pose; it
/// breaks ties when the rover sits exactly on an obstacle centre and keeps
/// edge pushes from leaving the track.
pub fn resolve(
    proposed: RoverState,
    nearest_idx: usize,
    track: &Track,
    robot_radius: f64,
) -> RoverState {
    resolve_with_status(proposed, nearest_idx, track, robot_radius).state
}

/// [`resolve`], also reporting whether the corrections converged. An
/// obstacle closer to a wall than the rover's clearance on both sides makes
/// the two pushes undo each other until the pass limit.
pub fn resolve_with_status(
    proposed: RoverState,
    nearest_idx: usize,
    track: &Track,
    robot_radius: f64,
) -> Resolution {
    let mut pos = proposed.position();
    let center = track
        .center_line()
        .get(nearest_idx)
        .copied()
        .unwrap_or(pos);

    let mut passes = 0;
    let mut settled = false;
    while passes < MAX_PASSES {
        passes += 1;
        let mut changed = false;

        for o in track.obstacles() {
            let offset = pos - o.position;
            let d = offset.norm();
            let min_d = o.radius + robot_radius + EXTRA_CLEARANCE;
            if d < min_d - RESOLVE_EPS {
                let dir = unit_or(offset, unit_or(center - pos, Vec2::zeros()));
                pos += dir * (min_d - d);
                changed = true;
            }
        }

        let min_clear = robot_radius + EXTRA_CLEARANCE;
        if let Some((dist, closest)) = nearest_edge_point(track, &pos) {
            if dist < min_clear - RESOLVE_EPS {
                let to_center = unit_or(center - pos, Vec2::zeros());
                let away = unit_or(pos - closest, to_center);
                let dir = if away.dot(&to_center) >= 0.0 { away } else { -away };
                pos += dir * (min_clear - dist);
                changed = true;
            }
        }

        if !changed {
            trace!(passes, "resolver settled");
            settled = true;
            break;
        }
    }
    if !settled {
        debug!(
            x = pos.x,
            y = pos.y,
            passes,
            "resolver pass limit reached with corrections pending"
        );
    }

    Resolution {
        state: RoverState::new(pos.x, pos.y, proposed.heading),
        passes,
        settled,
    }
}
