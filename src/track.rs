// ================================
// src/track.rs - procedural closed-loop track with obstacles
// ================================
use rand::Rng;
use std::f64::consts::TAU;
use tracing::{info, warn};

use crate::{
    config::TrackConfig,
    control::RoverState,
    error::{EdgeSide, TrackError},
    geometry::{
        close_ring, densify, nearest_vertex, offset_closed, point_segment_distance, unit_or,
        Point, Vec2, DEGENERATE_EPS,
    },
    rng::Mulberry32,
};

pub const SPLINE_SAMPLES: usize = 1200;
pub const SPLINE_TENSION: f64 = 0.5;
/// Fixed center the control points are placed around.
pub const TRACK_CENTER: [f64; 2] = [800.0, 600.0];

pub const DENSIFY_STEP: f64 = 3.0;
pub const OFFSET_ARC_TOLERANCE: f64 = 0.25;
const RING_CLOSE_TOLERANCE: f64 = 1.0;

pub const START_LINE_CLEARANCE: f64 = 120.0;

pub const OBSTACLE_MIN_DIST: f64 = 80.0;
pub const OBSTACLE_RADIUS_MIN: f64 = 12.0;
pub const OBSTACLE_RADIUS_MAX: f64 = 20.0;
pub const OBSTACLE_LATERAL_FACTOR: f64 = 0.4;
pub const OBSTACLE_ATTEMPTS_FACTOR: usize = 50;
/// Centerline samples skipped at either end when placing obstacles.
pub const OBSTACLE_END_MARGIN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub position: Point,
    pub radius: f64,
}

/// Start/finish gate spanning the two edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartLine {
    /// Centerline sample the gate was drawn at
    pub index: usize,
    pub a: Point,
    pub b: Point,
}

impl StartLine {
    pub fn midpoint(&self) -> Point {
        nalgebra::center(&self.a, &self.b)
    }

    pub fn distance_to(&self, p: &Point) -> f64 {
        point_segment_distance(p, &self.a, &self.b)
    }
}

/// Immutable track geometry. Construct with [`generate_track`] (or
/// [`Track::new`] for hand-built layouts) and share behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    center_line: Vec<Point>,
    width: f64,
    left_edge: Vec<Point>,
    right_edge: Vec<Point>,
    obstacles: Vec<Obstacle>,
    start_line: StartLine,
}

impl Track {
    pub fn new(
        center_line: Vec<Point>,
        width: f64,
        left_edge: Vec<Point>,
        right_edge: Vec<Point>,
        obstacles: Vec<Obstacle>,
        start_line: StartLine,
    ) -> Self {
        Self {
            center_line,
            width,
            left_edge,
            right_edge,
            obstacles,
            start_line,
        }
    }

    /// Closed centerline, traversal order.
    pub fn center_line(&self) -> &[Point] {
        &self.center_line
    }

    /// Full width between the edges.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Number of centerline samples.
    pub fn length(&self) -> usize {
        self.center_line.len()
    }

    /// Outer boundary (centerline grown by the half-width), closed.
    pub fn left_edge(&self) -> &[Point] {
        &self.left_edge
    }

    /// Inner boundary (centerline shrunk by the half-width), closed.
    pub fn right_edge(&self) -> &[Point] {
        &self.right_edge
    }

    pub fn edges(&self) -> [&[Point]; 2] {
        [&self.left_edge, &self.right_edge]
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn start_line(&self) -> &StartLine {
        &self.start_line
    }

    /// A track is simulable only when both edges are real polygons.
    pub fn validate(&self) -> Result<(), TrackError> {
        for (side, edge) in [
            (EdgeSide::Left, &self.left_edge),
            (EdgeSide::Right, &self.right_edge),
        ] {
            if edge.len() < 3 {
                return Err(TrackError::DegenerateEdge {
                    side,
                    points: edge.len(),
                });
            }
        }
        Ok(())
    }

    /// Index of the centerline sample nearest `p` (linear scan).
    pub fn closest_index(&self, p: &Point) -> usize {
        self.center_line
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                nalgebra::distance_squared(*a, p).total_cmp(&nalgebra::distance_squared(*b, p))
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Pose at the start gate's midpoint, facing along the centerline.
    pub fn start_pose(&self) -> RoverState {
        let center = self.start_line.midpoint();
        let n = self.center_line.len();
        if n == 0 {
            return RoverState::new(center.x, center.y, 0.0);
        }

        let idx = self.closest_index(&center);
        let a = self.center_line[idx.saturating_sub(1)];
        let b = self.center_line[(idx + 1).min(n - 1)];
        let dir = b - a;
        let heading = if dir.norm() > DEGENERATE_EPS {
            dir.y.atan2(dir.x)
        } else {
            0.0
        };
        RoverState::new(center.x, center.y, heading)
    }
}

/// Builds the track for `(seed, config)`. Always returns a structure; call
/// [`Track::validate`] before simulating on it.
pub fn generate_track(seed: u32, config: &TrackConfig) -> Track {
    let mut rng = Mulberry32::new(seed);

    let control = control_points(
        &mut rng,
        config.control_points,
        config.min_radius,
        config.max_radius,
    );
    let center_line = sample_closed_spline(&control, SPLINE_SAMPLES, SPLINE_TENSION);
    let left_edge = build_edge(&center_line, config.track_width);
    let right_edge = build_edge(&center_line, -config.track_width);

    let start_line = pick_start_line(&mut rng, &center_line, &left_edge, &right_edge);

    let obstacles: Vec<Obstacle> = place_obstacles(
        &mut rng,
        &center_line,
        config.track_width,
        config.obstacle_count,
    )
    .into_iter()
    .filter(|o| start_line.distance_to(&o.position) >= START_LINE_CLEARANCE + o.radius)
    .collect();

    info!(
        seed,
        samples = center_line.len(),
        left = left_edge.len(),
        right = right_edge.len(),
        obstacles = obstacles.len(),
        "generated track"
    );

    Track::new(
        center_line,
        config.track_width * 2.0,
        left_edge,
        right_edge,
        obstacles,
        start_line,
    )
}

/// Evenly spaced angles around the track center, random radius each.
fn control_points(rng: &mut Mulberry32, count: usize, min_r: f64, max_r: f64) -> Vec<Point> {
    let center = Point::from(TRACK_CENTER);
    (0..count)
        .map(|i| {
            let angle = i as f64 / count as f64 * TAU;
            let radius = min_r + rng.next_unit() * (max_r - min_r);
            center + Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// Closed cardinal spline through `control`, sampled uniformly in parameter.
///
/// Tangents are `(1 - tension) / 2 * (p[i+1] - p[i-1])`, so tension 0 is
/// Catmull-Rom. Indices wrap, making the loop seamless.
pub fn sample_closed_spline(control: &[Point], samples: usize, tension: f64) -> Vec<Point> {
    let n = control.len();
    if n == 0 {
        return Vec::new();
    }
    let scale = (1.0 - tension) / 2.0;

    (0..samples)
        .map(|i| {
            let t = i as f64 / samples as f64 * n as f64;
            let seg = (t.floor() as usize) % n;
            let f = t - t.floor();

            let p0 = control[(seg + n - 1) % n].coords;
            let p1 = control[seg].coords;
            let p2 = control[(seg + 1) % n].coords;
            let p3 = control[(seg + 2) % n].coords;
            let m1 = (p2 - p0) * scale;
            let m2 = (p3 - p1) * scale;

            let f2 = f * f;
            let f3 = f2 * f;
            let h00 = 2.0 * f3 - 3.0 * f2 + 1.0;
            let h10 = f3 - 2.0 * f2 + f;
            let h01 = -2.0 * f3 + 3.0 * f2;
            let h11 = f3 - f2;

            Point::from(p1 * h00 + m1 * h10 + p2 * h01 + m2 * h11)
        })
        .collect()
}

/// Offset, densify and close one boundary. Empty when the offset degenerates.
fn build_edge(center_line: &[Point], offset: f64) -> Vec<Point> {
    if center_line.len() < 2 {
        return Vec::new();
    }

    let raw = offset_closed(center_line, offset, OFFSET_ARC_TOLERANCE);
    if raw.len() < 3 {
        warn!(offset, points = raw.len(), "edge offset degenerated");
        return Vec::new();
    }

    let mut edge = densify(&raw, DENSIFY_STEP);
    close_ring(&mut edge, RING_CLOSE_TOLERANCE);
    edge
}

fn pick_start_line(
    rng: &mut Mulberry32,
    center_line: &[Point],
    left_edge: &[Point],
    right_edge: &[Point],
) -> StartLine {
    if center_line.is_empty() {
        let p = left_edge
            .first()
            .or_else(|| right_edge.first())
            .copied()
            .unwrap_or_else(Point::origin);
        return StartLine {
            index: 0,
            a: p,
            b: p,
        };
    }

    let index = rng.random_range(0..center_line.len());
    let p = center_line[index];
    StartLine {
        index,
        a: nearest_vertex(left_edge, &p),
        b: nearest_vertex(right_edge, &p),
    }
}

/// Rejection sampling: interior index, lateral jitter, minimum spacing.
fn place_obstacles(
    rng: &mut Mulberry32,
    center_line: &[Point],
    track_width: f64,
    count: usize,
) -> Vec<Obstacle> {
    let n = center_line.len();
    if count == 0 || n <= 2 * OBSTACLE_END_MARGIN {
        return Vec::new();
    }

    let mut obstacles: Vec<Obstacle> = Vec::with_capacity(count);
    let max_attempts = count * OBSTACLE_ATTEMPTS_FACTOR;
    let mut attempts = 0;

    while obstacles.len() < count && attempts < max_attempts {
        attempts += 1;

        let i = rng.random_range(OBSTACLE_END_MARGIN..n - OBSTACLE_END_MARGIN);
        let p = center_line[i];
        let next = center_line[(i + 1) % n];
        let tangent = unit_or(next - p, Vec2::x());
        let normal = Vec2::new(-tangent.y, tangent.x);

        let lateral = (rng.next_unit() * 2.0 - 1.0) * track_width * OBSTACLE_LATERAL_FACTOR;
        let position = p + normal * lateral;
        let radius =
            OBSTACLE_RADIUS_MIN + rng.next_unit() * (OBSTACLE_RADIUS_MAX - OBSTACLE_RADIUS_MIN);

        if obstacles
            .iter()
            .any(|o| nalgebra::distance(&o.position, &position) < OBSTACLE_MIN_DIST)
        {
            continue;
        }
        obstacles.push(Obstacle { position, radius });
    }

    if obstacles.len() < count {
        info!(
            placed = obstacles.len(),
            requested = count,
            "obstacle placement ran out of attempts"
        );
    }
    obstacles
}
