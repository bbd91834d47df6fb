// ================================
// src/geometry.rs - 2D primitives, ray casting and polygon offsetting
// ================================
use nalgebra::{Point2, Rotation2, Vector2};
use std::{collections::HashMap, f64::consts::FRAC_PI_2};

pub type Point = Point2<f64>;
pub type Vec2 = Vector2<f64>;

/// Rays whose direction is this close to parallel with a segment never hit it.
pub const PARALLEL_EPS: f64 = 1e-9;
/// Vectors shorter than this are treated as zero-length.
pub const DEGENERATE_EPS: f64 = 1e-9;

/// Relative slack when discarding offset points that fall inside the source buffer.
const OFFSET_CLEAN_FACTOR: f64 = 1e-3;
/// Consecutive offset points closer than this are merged.
const OFFSET_MERGE_DIST: f64 = 1e-6;
/// A turn sharper than 120° between consecutive steps counts as doubling back.
const BACKTRACK_COS: f64 = -0.5;
/// Segment parameters this close to 0 or 1 are endpoint contacts, not crossings.
const SEGMENT_END_EPS: f64 = 1e-9;

/// z component of the 2D cross product.
#[inline]
pub fn cross(a: &Vec2, b: &Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Unit vector of `v`, or `fallback` when `v` is (nearly) zero-length.
#[inline]
pub fn unit_or(v: Vec2, fallback: Vec2) -> Vec2 {
    v.try_normalize(DEGENERATE_EPS).unwrap_or(fallback)
}

#[inline]
pub fn heading_vector(heading: f64) -> Vec2 {
    Vec2::new(heading.cos(), heading.sin())
}

/// Wraps an angle into (-π, π].
pub fn normalize_angle(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};

    if !angle.is_finite() {
        return angle;
    }
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Distance along the ray `origin + t * dir` to segment `a..b`.
///
/// Near-parallel rays miss; hits must satisfy `t >= 0` and `u ∈ [0, 1]`.
pub fn ray_segment(origin: &Point, dir: &Vec2, a: &Point, b: &Point) -> Option<f64> {
    let v = b - a;
    let w = a - origin;
    let den = cross(dir, &v);
    if den.abs() < PARALLEL_EPS {
        return None;
    }

    let t = cross(&w, &v) / den;
    let u = cross(&w, dir) / den;
    (t >= 0.0 && (0.0..=1.0).contains(&u)).then_some(t)
}

/// Distance along the ray to the circle `(center, radius)`. `dir` must be unit length.
///
/// The nearer root wins when both are ahead of the origin; an origin inside the
/// circle reports the exit point.
pub fn ray_circle(origin: &Point, dir: &Vec2, center: &Point, radius: f64) -> Option<f64> {
    let oc = origin - center;
    let b = 2.0 * oc.dot(dir);
    let c = oc.dot(&oc) - radius * radius;
    let disc = b * b - 4.0 * c;
    if disc < 0.0 {
        return None;
    }

    let sqrt_d = disc.sqrt();
    let t1 = (-b - sqrt_d) / 2.0;
    let t2 = (-b + sqrt_d) / 2.0;
    if t1 >= 0.0 {
        Some(t1)
    } else if t2 >= 0.0 {
        Some(t2)
    } else {
        None
    }
}

/// Closest point to `p` on segment `a..b`; a degenerate segment collapses to `a`.
pub fn closest_point_on_segment(p: &Point, a: &Point, b: &Point) -> Point {
    let ab = b - a;
    let ab2 = ab.norm_squared();
    if ab2 <= DEGENERATE_EPS {
        return *a;
    }
    let t = ((p - a).dot(&ab) / ab2).clamp(0.0, 1.0);
    a + ab * t
}

pub fn point_segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    nalgebra::distance(p, &closest_point_on_segment(p, a, b))
}

/// Nearest point on an open polyline (segments `i..i+1`) with its distance.
pub fn closest_on_polyline(points: &[Point], p: &Point) -> Option<(f64, Point)> {
    points
        .windows(2)
        .map(|seg| {
            let cp = closest_point_on_segment(p, &seg[0], &seg[1]);
            (nalgebra::distance(p, &cp), cp)
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

/// Nearest vertex of `points` to `target`, or `target` itself when empty.
pub fn nearest_vertex(points: &[Point], target: &Point) -> Point {
    points
        .iter()
        .min_by(|a, b| {
            nalgebra::distance_squared(*a, target).total_cmp(&nalgebra::distance_squared(*b, target))
        })
        .copied()
        .unwrap_or(*target)
}

/// Shoelace area; positive for counter-clockwise rings.
pub fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let p = ring[i];
            let q = ring[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice / 2.0
}

/// Inserts evenly spaced points so that no two consecutive points of the
/// closed ring are more than `step` apart. The wrap segment is included.
pub fn densify(ring: &[Point], step: f64) -> Vec<Point> {
    if ring.len() < 2 || step <= 0.0 {
        return ring.to_vec();
    }

    let n = ring.len();
    let mut dense = Vec::with_capacity(n * 2);
    for i in 0..n {
        let p0 = ring[i];
        let p1 = ring[(i + 1) % n];
        dense.push(p0);

        let d = p1 - p0;
        let len = d.norm();
        if len > step {
            let pieces = (len / step).ceil() as usize;
            for j in 1..pieces {
                let t = j as f64 / pieces as f64;
                dense.push(p0 + d * t);
            }
        }
    }
    dense
}

/// Appends a copy of the first point when the ring is left open by more than `tolerance`.
pub fn close_ring(ring: &mut Vec<Point>, tolerance: f64) {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if nalgebra::distance(&first, &last) > tolerance {
            ring.push(first);
        }
    }
}

fn dedup_ring(points: &[Point]) -> Vec<Point> {
    let mut ring: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        match ring.last() {
            Some(last) if nalgebra::distance(last, p) < DEGENERATE_EPS => {}
            _ => ring.push(*p),
        }
    }
    while ring.len() > 1 && nalgebra::distance(&ring[0], &ring[ring.len() - 1]) < DEGENERATE_EPS {
        ring.pop();
    }
    ring
}

fn arc_step_angle(radius: f64, arc_tolerance: f64) -> f64 {
    let ratio = (1.0 - arc_tolerance / radius).clamp(-1.0, 1.0);
    (2.0 * ratio.acos()).clamp(1e-3, FRAC_PI_2)
}

/// Offsets a closed polygon by `delta` with round joins.
///
/// Positive `delta` grows the polygon, negative shrinks it, independent of
/// winding. Raw offset points that end up closer than `|delta|` to the source
/// ring (overlaps at concave joins, swallowtails, collapsed regions) are
/// discarded. Whatever still doubles back or crosses itself is then cut away,
/// so the result is a simple ring. Returns an empty vector when fewer than
/// three points survive.
pub fn offset_closed(points: &[Point], delta: f64, arc_tolerance: f64) -> Vec<Point> {
    let ring = dedup_ring(points);
    if ring.len() < 3 {
        return Vec::new();
    }

    let area = signed_area(&ring);
    if area.abs() < DEGENERATE_EPS {
        return Vec::new();
    }
    if delta.abs() < DEGENERATE_EPS {
        return ring;
    }

    let orientation = area.signum();
    let n = ring.len();
    let normals: Vec<Vec2> = (0..n)
        .map(|i| {
            let d = ring[(i + 1) % n] - ring[i];
            unit_or(Vec2::new(d.y, -d.x) * orientation, Vec2::x())
        })
        .collect();

    let step_angle = arc_step_angle(delta.abs(), arc_tolerance);
    let mut raw = Vec::with_capacity(n + n / 2);
    for i in 0..n {
        let p = ring[i];
        let n_prev = normals[(i + n - 1) % n];
        let n_next = normals[i];
        let turn = cross(&n_prev, &n_next).atan2(n_prev.dot(&n_next));

        if turn * orientation * delta > 0.0 {
            // gap side: sweep the round join
            let steps = ((turn.abs() / step_angle).ceil() as usize).max(1);
            for k in 0..=steps {
                let rot = Rotation2::new(turn * k as f64 / steps as f64);
                raw.push(p + (rot * n_prev) * delta);
            }
        } else {
            let bisector = n_prev + n_next;
            match bisector.try_normalize(1e-6) {
                Some(m) if m.dot(&n_next) > 0.5 => raw.push(p + m * (delta / m.dot(&n_next))),
                _ => {
                    raw.push(p + n_prev * delta);
                    raw.push(p + n_next * delta);
                }
            }
        }
    }

    let min_dist = delta.abs() * (1.0 - OFFSET_CLEAN_FACTOR);
    let reach = Vec2::new(min_dist, min_dist);
    let grid = SegmentGrid::build(&ring, delta.abs());
    let kept: Vec<Point> = raw
        .into_iter()
        .filter(|q| {
            grid.candidates(&(q - reach), &(q + reach))
                .all(|i| point_segment_distance(q, &ring[i], &ring[(i + 1) % n]) >= min_dist)
        })
        .collect();

    let kept = untangle(kept);
    if kept.len() < 3 {
        Vec::new()
    } else {
        kept
    }
}

/// Point where segments `a..b` and `c..d` cross strictly inside both.
/// Touching endpoints and parallel overlaps are not crossings.
pub fn segment_intersection(a: &Point, b: &Point, c: &Point, d: &Point) -> Option<Point> {
    let r = b - a;
    let s = d - c;
    let den = cross(&r, &s);
    if den.abs() < PARALLEL_EPS {
        return None;
    }

    let w = c - a;
    let t = cross(&w, &s) / den;
    let u = cross(&w, &r) / den;
    let inside = |v: f64| v > SEGMENT_END_EPS && v < 1.0 - SEGMENT_END_EPS;
    (inside(t) && inside(u)).then(|| a + r * t)
}

/// First pair of non-adjacent segments `(i, j)`, `i < j`, of the closed ring
/// that cross each other, with the crossing point. Segment `i` runs from
/// `ring[i]` to `ring[(i + 1) % n]`.
pub fn first_self_crossing(ring: &[Point]) -> Option<(usize, usize, Point)> {
    let n = ring.len();
    if n < 4 {
        return None;
    }

    let grid = SegmentGrid::build(ring, 0.0);
    (0..n).find_map(|i| {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        grid.candidates(&a.inf(&b), &a.sup(&b))
            .filter(|&j| j > i + 1 && !(i == 0 && j == n - 1))
            .filter_map(|j| {
                segment_intersection(&a, &b, &ring[j], &ring[(j + 1) % n]).map(|x| (j, x))
            })
            .min_by_key(|&(j, _)| j)
            .map(|(j, x)| (i, j, x))
    })
}

/// Uniform bucket grid over the segments of a closed ring.
struct SegmentGrid {
    cell: f64,
    buckets: HashMap<(i64, i64), Vec<usize>>,
}

impl SegmentGrid {
    /// Cells are at least as wide as the longest segment and `min_cell`.
    fn build(ring: &[Point], min_cell: f64) -> Self {
        let n = ring.len();
        let longest = (0..n)
            .map(|i| nalgebra::distance(&ring[i], &ring[(i + 1) % n]))
            .fold(0.0, f64::max);
        let mut grid = Self {
            cell: longest.max(min_cell).max(1.0),
            buckets: HashMap::new(),
        };

        for i in 0..n {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            let (lo, hi) = (grid.key(&a.inf(&b)), grid.key(&a.sup(&b)));
            for cx in lo.0..=hi.0 {
                for cy in lo.1..=hi.1 {
                    grid.buckets.entry((cx, cy)).or_default().push(i);
                }
            }
        }
        grid
    }

    fn key(&self, p: &Point) -> (i64, i64) {
        (
            (p.x / self.cell).floor() as i64,
            (p.y / self.cell).floor() as i64,
        )
    }

    /// Segments bucketed in the cells covering the box `lo..hi`. An index may
    /// repeat.
    fn candidates(&self, lo: &Point, hi: &Point) -> impl Iterator<Item = usize> + '_ {
        let (lo, hi) = (self.key(lo), self.key(hi));
        (lo.0..=hi.0)
            .flat_map(move |cx| (lo.1..=hi.1).map(move |cy| (cx, cy)))
            .filter_map(move |key| self.buckets.get(&key))
            .flatten()
            .copied()
    }
}

/// Strips spikes and self-crossings from a closed ring until neither is left.
fn untangle(mut ring: Vec<Point>) -> Vec<Point> {
    loop {
        let before = ring.len();
        ring = cut_crossings(drop_backtracks(ring));
        if ring.len() == before || ring.len() < 3 {
            return ring;
        }
    }
}

fn doubles_back(a: &Point, b: &Point, c: &Point) -> bool {
    let (u, v) = (b - a, c - b);
    u.dot(&v) < BACKTRACK_COS * u.norm() * v.norm()
}

/// Removes points where the ring reverses direction, the seam included.
fn drop_backtracks(ring: Vec<Point>) -> Vec<Point> {
    let mut kept: Vec<Point> = Vec::with_capacity(ring.len());
    for p in ring {
        while kept.len() >= 2 && doubles_back(&kept[kept.len() - 2], &kept[kept.len() - 1], &p) {
            kept.pop();
        }
        if kept
            .last()
            .is_some_and(|last| nalgebra::distance(last, &p) < OFFSET_MERGE_DIST)
        {
            continue;
        }
        kept.push(p);
    }

    while kept.len() > 3 {
        let n = kept.len();
        if nalgebra::distance(&kept[n - 1], &kept[0]) < OFFSET_MERGE_DIST
            || doubles_back(&kept[n - 2], &kept[n - 1], &kept[0])
        {
            kept.pop();
        } else if doubles_back(&kept[n - 1], &kept[0], &kept[1]) {
            kept.remove(0);
        } else {
            break;
        }
    }
    kept
}

/// Cuts the ring at each self-crossing and keeps the larger of the two
/// loops, until the ring is simple.
fn cut_crossings(mut ring: Vec<Point>) -> Vec<Point> {
    while let Some((i, j, x)) = first_self_crossing(&ring) {
        let inner = j - i;
        if 2 * inner <= ring.len() {
            ring.splice(i + 1..=j, [x]);
        } else {
            let mut lobe = Vec::with_capacity(inner + 1);
            lobe.push(x);
            lobe.extend_from_slice(&ring[i + 1..=j]);
            ring = lobe;
        }
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{PI, TAU};

    fn circle(center: Point, radius: f64, n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * TAU;
                center + Vec2::new(a.cos(), a.sin()) * radius
            })
            .collect()
    }

    #[test]
    fn ray_hits_segment_ahead() {
        let t = ray_segment(
            &Point::origin(),
            &Vec2::x(),
            &Point::new(10.0, -5.0),
            &Point::new(10.0, 5.0),
        );
        assert_abs_diff_eq!(t.unwrap(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn ray_misses_segment_behind_or_parallel() {
        let behind = ray_segment(
            &Point::origin(),
            &Vec2::x(),
            &Point::new(-10.0, -5.0),
            &Point::new(-10.0, 5.0),
        );
        assert!(behind.is_none());

        let parallel = ray_segment(
            &Point::origin(),
            &Vec2::x(),
            &Point::new(0.0, 1.0),
            &Point::new(10.0, 1.0),
        );
        assert!(parallel.is_none());

        let beside = ray_segment(
            &Point::origin(),
            &Vec2::x(),
            &Point::new(10.0, 1.0),
            &Point::new(10.0, 5.0),
        );
        assert!(beside.is_none());
    }

    #[test]
    fn ray_circle_picks_nearer_root() {
        let t = ray_circle(&Point::origin(), &Vec2::x(), &Point::new(50.0, 0.0), 10.0);
        assert_abs_diff_eq!(t.unwrap(), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn ray_circle_from_inside_reports_exit() {
        let t = ray_circle(&Point::new(50.0, 0.0), &Vec2::x(), &Point::new(50.0, 0.0), 10.0);
        assert_abs_diff_eq!(t.unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn ray_circle_behind_misses() {
        assert!(ray_circle(&Point::origin(), &Vec2::x(), &Point::new(-50.0, 0.0), 10.0).is_none());
        assert!(ray_circle(&Point::origin(), &Vec2::x(), &Point::new(50.0, 30.0), 10.0).is_none());
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_abs_diff_eq!(point_segment_distance(&Point::new(5.0, 3.0), &a, &b), 3.0);
        assert_abs_diff_eq!(point_segment_distance(&Point::new(13.0, 4.0), &a, &b), 5.0);
        assert_abs_diff_eq!(point_segment_distance(&Point::new(3.0, 4.0), &a, &a), 5.0);
    }

    #[test]
    fn normalize_angle_wraps_into_half_open_range() {
        assert_abs_diff_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(-PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(0.5), 0.5);
        assert_abs_diff_eq!(normalize_angle(-0.5 - TAU), -0.5, epsilon = 1e-12);
    }

    #[test]
    fn densify_bounds_spacing_including_wrap() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let dense = densify(&square, 3.0);
        let n = dense.len();
        for i in 0..n {
            let gap = nalgebra::distance(&dense[i], &dense[(i + 1) % n]);
            assert!(gap <= 3.0 + 1e-9, "gap {gap} at {i}");
        }
    }

    #[test]
    fn offset_circle_outward_and_inward() {
        let c = Point::new(800.0, 600.0);
        let ring = circle(c, 200.0, 400);

        let grown = offset_closed(&ring, 20.0, 0.25);
        assert!(grown.len() >= 3);
        for p in &grown {
            assert_abs_diff_eq!(nalgebra::distance(p, &c), 220.0, epsilon = 0.5);
        }

        let shrunk = offset_closed(&ring, -20.0, 0.25);
        assert!(shrunk.len() >= 3);
        for p in &shrunk {
            assert_abs_diff_eq!(nalgebra::distance(p, &c), 180.0, epsilon = 0.5);
        }
    }

    #[test]
    fn offset_ignores_winding() {
        let c = Point::origin();
        let mut ring = circle(c, 100.0, 200);
        ring.reverse();
        let grown = offset_closed(&ring, 10.0, 0.25);
        assert!(!grown.is_empty());
        assert!(grown.iter().all(|p| nalgebra::distance(p, &c) > 105.0));
    }

    #[test]
    fn offset_square_rounds_convex_corners() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        let grown = offset_closed(&square, 10.0, 0.25);
        // every output point lies at the offset distance from the square
        for q in &grown {
            let d = (0..4)
                .map(|i| point_segment_distance(q, &square[i], &square[(i + 1) % 4]))
                .fold(f64::INFINITY, f64::min);
            assert_abs_diff_eq!(d, 10.0, epsilon = 1e-6);
        }
        // the corner arc produced more than one point per corner
        assert!(grown.len() > 8);
    }

    #[test]
    fn offset_collapses_to_empty() {
        let ring = circle(Point::origin(), 50.0, 120);
        assert!(offset_closed(&ring, -60.0, 0.25).is_empty());
    }

    #[test]
    fn offset_rejects_degenerate_input() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert!(offset_closed(&line, 5.0, 0.25).is_empty());

        let collinear = vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)];
        assert!(offset_closed(&collinear, 5.0, 0.25).is_empty());
    }

    /// Brute-force check that a closed ring neither crosses itself nor reverses.
    fn assert_simple(ring: &[Point]) {
        let n = ring.len();
        for i in 0..n {
            for j in i + 2..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (c, d) = (ring[j], ring[(j + 1) % n]);
                let x = segment_intersection(&ring[i], &ring[(i + 1) % n], &c, &d);
                assert!(x.is_none(), "segments {i} and {j} cross at {x:?}");
            }
            let (a, b, c) = (ring[i], ring[(i + 1) % n], ring[(i + 2) % n]);
            assert!(!doubles_back(&a, &b, &c), "ring reverses at {}", (i + 1) % n);
        }
    }

    /// r(θ) = 200 + 25 sin 7θ: tight lobes that curl under a ±50 offset.
    fn wavy(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * TAU;
                let r = 200.0 + 25.0 * (7.0 * a).sin();
                Point::new(r * a.cos(), r * a.sin())
            })
            .collect()
    }

    #[test]
    fn segment_intersection_is_strict() {
        let x = segment_intersection(
            &Point::new(0.0, 0.0),
            &Point::new(10.0, 10.0),
            &Point::new(0.0, 10.0),
            &Point::new(10.0, 0.0),
        );
        assert_abs_diff_eq!(x.unwrap(), Point::new(5.0, 5.0), epsilon = 1e-12);

        // shared endpoint
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!(segment_intersection(&a, &b, &b, &Point::new(10.0, 10.0)).is_none());
        // collinear overlap
        let (c, d) = (Point::new(5.0, 0.0), Point::new(15.0, 0.0));
        assert!(segment_intersection(&a, &b, &c, &d).is_none());
        // would cross only if extended
        let (c, d) = (Point::new(12.0, -1.0), Point::new(12.0, 1.0));
        assert!(segment_intersection(&a, &b, &c, &d).is_none());
    }

    #[test]
    fn crossing_loop_is_cut_at_the_crossing() {
        let loop_ring = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(4.0, 10.0),
            Point::new(5.0, 12.0),
            Point::new(6.0, 9.0),
            Point::new(0.0, 10.0),
        ];
        let (i, j, x) = first_self_crossing(&loop_ring).unwrap();
        assert_eq!((i, j), (2, 4));
        assert_abs_diff_eq!(x, Point::new(17.0 / 3.0, 10.0), epsilon = 1e-9);

        let cut = cut_crossings(loop_ring.clone());
        assert_eq!(cut.len(), 6);
        assert_abs_diff_eq!(cut[3], x, epsilon = 1e-9);
        assert!(first_self_crossing(&cut).is_none());

        // same ring starting inside the loop: the larger side is the one between the crossings
        let mut rotated = loop_ring;
        rotated.rotate_left(4);
        let cut = cut_crossings(rotated);
        assert_eq!(cut.len(), 6);
        assert_abs_diff_eq!(cut[0], x, epsilon = 1e-9);
        assert!(cut.contains(&Point::new(0.0, 0.0)));
        assert!(!cut.contains(&Point::new(5.0, 12.0)));
    }

    #[test]
    fn spike_at_the_seam_is_dropped() {
        let ring = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 11.0),
        ];
        let cleaned = drop_backtracks(ring);
        assert_eq!(cleaned.len(), 4);
        assert_eq!(cleaned[3], Point::new(0.0, 10.0));

        // a square turns 90° at each corner, which is not a reversal
        let square = cleaned.clone();
        assert_eq!(drop_backtracks(square), cleaned);
    }

    #[test]
    fn offset_of_curling_lobes_is_a_simple_ring() {
        let source = wavy(720);
        let n = source.len();
        for delta in [50.0, -50.0] {
            let edge = offset_closed(&source, delta, 0.25);
            assert!(edge.len() > 100, "delta {delta}: {} points", edge.len());
            assert_simple(&edge);
            for q in &edge {
                let d = (0..n)
                    .map(|i| point_segment_distance(q, &source[i], &source[(i + 1) % n]))
                    .fold(f64::INFINITY, f64::min);
                assert!(d > 49.0, "delta {delta}: {q:?} only {d} from the source");
            }
        }
        let grown = offset_closed(&source, 50.0, 0.25);
        let shrunk = offset_closed(&source, -50.0, 0.25);
        assert!(signed_area(&grown).abs() > signed_area(&source).abs());
        assert!(signed_area(&shrunk).abs() < signed_area(&source).abs());
    }

    #[test]
    fn nearest_vertex_falls_back_to_target() {
        let target = Point::new(3.0, 4.0);
        assert_eq!(nearest_vertex(&[], &target), target);
        let pts = [Point::new(0.0, 0.0), Point::new(3.0, 5.0)];
        assert_eq!(nearest_vertex(&pts, &target), Point::new(3.0, 5.0));
    }
}
