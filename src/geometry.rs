// Screen-space geometry shared by the overlap tracker and the cluster builder.
// Everything here works on plain pixel coordinates, no renderer types.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type Point = (f32, f32);

const SEPARATION_EPS: f32 = 1e-4;

/// Axis-aligned bounding rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mbr {
    pub ll: Point,
    pub ur: Point,
}

impl Mbr {
    pub fn new(ll: Point, ur: Point) -> Self {
        Self {
            ll: (ll.0.min(ur.0), ll.1.min(ur.1)),
            ur: (ll.0.max(ur.0), ll.1.max(ur.1)),
        }
    }

    /// Bounds of a footprint. An empty footprint yields a zero-area
    /// rectangle at the origin.
    pub fn from_points(pts: &[Point]) -> Self {
        let Some(first) = pts.first() else {
            return Self {
                ll: (0.0, 0.0),
                ur: (0.0, 0.0),
            };
        };
        let mut ll = *first;
        let mut ur = *first;
        for pt in &pts[1..] {
            ll.0 = ll.0.min(pt.0);
            ll.1 = ll.1.min(pt.1);
            ur.0 = ur.0.max(pt.0);
            ur.1 = ur.1.max(pt.1);
        }
        Self { ll, ur }
    }

    pub fn from_center_size(center: Point, size: Point) -> Self {
        let hw = size.0.abs() * 0.5;
        let hh = size.1.abs() * 0.5;
        Self {
            ll: (center.0 - hw, center.1 - hh),
            ur: (center.0 + hw, center.1 + hh),
        }
    }

    pub fn width(&self) -> f32 {
        self.ur.0 - self.ll.0
    }

    pub fn height(&self) -> f32 {
        self.ur.1 - self.ll.1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// True when the rectangle encloses no area (point, segment, or
    /// non-finite input).
    pub fn is_degenerate(&self) -> bool {
        let w = self.width();
        let h = self.height();
        !(w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite())
    }

    pub fn center(&self) -> Point {
        (
            (self.ll.0 + self.ur.0) * 0.5,
            (self.ll.1 + self.ur.1) * 0.5,
        )
    }

    pub fn expand(&self, pad_x: f32, pad_y: f32) -> Self {
        Self {
            ll: (self.ll.0 - pad_x, self.ll.1 - pad_y),
            ur: (self.ur.0 + pad_x, self.ur.1 + pad_y),
        }
    }

    pub fn union(&self, other: &Mbr) -> Self {
        Self {
            ll: (self.ll.0.min(other.ll.0), self.ll.1.min(other.ll.1)),
            ur: (self.ur.0.max(other.ur.0), self.ur.1.max(other.ur.1)),
        }
    }

    /// Positive-area intersection. Rectangles sharing only an edge or a
    /// corner do not overlap.
    pub fn overlaps(&self, other: &Mbr) -> bool {
        self.ll.0 < other.ur.0
            && other.ll.0 < self.ur.0
            && self.ll.1 < other.ur.1
            && other.ll.1 < self.ur.1
    }

    /// Corners in counter-clockwise order starting at the lower left.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.ll,
            (self.ur.0, self.ll.1),
            self.ur,
            (self.ll.0, self.ur.1),
        ]
    }
}

fn cross(o: Point, a: Point, b: Point) -> f32 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn point_order(a: &Point, b: &Point) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1))
}

/// Convex hull (counter-clockwise, collinear points dropped) via the
/// monotone chain. Fewer than three distinct points come back as-is.
pub fn convex_hull(pts: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = pts
        .iter()
        .copied()
        .filter(|p| p.0.is_finite() && p.1.is_finite())
        .collect();
    sorted.sort_by(point_order);
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn project(pts: &[Point], axis: Point) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for p in pts {
        let d = p.0 * axis.0 + p.1 * axis.1;
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

fn separated_on_edges(edges_of: &[Point], a: &[Point], b: &[Point]) -> bool {
    let n = edges_of.len();
    let edge_count = if n == 2 { 1 } else { n };
    for i in 0..edge_count {
        let p0 = edges_of[i];
        let p1 = edges_of[(i + 1) % n];
        let dx = p1.0 - p0.0;
        let dy = p1.1 - p0.1;
        let len = (dx * dx + dy * dy).sqrt();
        if len <= 1e-6 {
            continue;
        }
        let axis = (-dy / len, dx / len);
        let (a_min, a_max) = project(a, axis);
        let (b_min, b_max) = project(b, axis);
        if a_max <= b_min + SEPARATION_EPS || b_max <= a_min + SEPARATION_EPS {
            return true;
        }
    }
    false
}

/// Exact interior-overlap test for two convex hulls (as produced by
/// [`convex_hull`]) using separating axes. Touching boundaries count as
/// separated. Two shapes without interior (points/segments) never overlap.
pub fn hulls_overlap(a: &[Point], b: &[Point]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.len() < 3 && b.len() < 3 {
        return false;
    }
    if a.len() >= 2 && separated_on_edges(a, a, b) {
        return false;
    }
    if b.len() >= 2 && separated_on_edges(b, a, b) {
        return false;
    }
    true
}

/// Interior-overlap test for raw footprints. Concave footprints are tested
/// through their convex hulls.
pub fn polygons_overlap(a: &[Point], b: &[Point]) -> bool {
    hulls_overlap(&convex_hull(a), &convex_hull(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Point> {
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }

    #[test]
    fn mbr_from_points_covers_all() {
        let mbr = Mbr::from_points(&[(3.0, 7.0), (-1.0, 2.0), (5.0, 4.0)]);
        assert_eq!(mbr.ll, (-1.0, 2.0));
        assert_eq!(mbr.ur, (5.0, 7.0));
    }

    #[test]
    fn mbr_from_empty_is_degenerate() {
        let mbr = Mbr::from_points(&[]);
        assert!(mbr.is_degenerate());
        assert_eq!(mbr.area(), 0.0);
    }

    #[test]
    fn mbr_touching_edges_do_not_overlap() {
        let a = Mbr::new((0.0, 0.0), (10.0, 10.0));
        let b = Mbr::new((10.0, 0.0), (20.0, 10.0));
        assert!(!a.overlaps(&b));
        let c = Mbr::new((9.0, 9.0), (20.0, 20.0));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn convex_hull_drops_interior_and_collinear_points() {
        let hull = convex_hull(&[
            (0.0, 0.0),
            (5.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (5.0, 5.0),
        ]);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&(5.0, 5.0)));
        assert!(!hull.contains(&(5.0, 0.0)));
    }

    #[test]
    fn identical_squares_overlap() {
        let a = square(10.0, 10.0, 20.0, 20.0);
        assert!(polygons_overlap(&a, &a));
    }

    #[test]
    fn touching_squares_do_not_overlap() {
        let a = square(10.0, 10.0, 20.0, 20.0);
        let b = square(20.0, 10.0, 30.0, 20.0);
        assert!(!polygons_overlap(&a, &b));
    }

    #[test]
    fn rotated_shapes_with_overlapping_bounds_are_separated() {
        // Diamond whose bounding box overlaps the square's corner region.
        let a = square(0.0, 0.0, 10.0, 10.0);
        let tilted = vec![(8.0, 14.0), (14.0, 8.0), (20.0, 14.0), (14.0, 20.0)];
        assert!(Mbr::from_points(&a).overlaps(&Mbr::from_points(&tilted)));
        assert!(!polygons_overlap(&a, &tilted));
    }

    #[test]
    fn segment_through_interior_overlaps() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        let seg = vec![(-5.0, 5.0), (15.0, 5.0)];
        assert!(polygons_overlap(&a, &seg));
        let along_edge = vec![(-5.0, 10.0), (15.0, 10.0)];
        assert!(!polygons_overlap(&a, &along_edge));
    }

    #[test]
    fn points_never_overlap_each_other() {
        assert!(!polygons_overlap(&[(1.0, 1.0)], &[(1.0, 1.0)]));
        assert!(!polygons_overlap(&[], &square(0.0, 0.0, 1.0, 1.0)));
    }
}
