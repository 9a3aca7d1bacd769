// Exact-shape occupancy tracking for annotations that must not overlap.
//
// Commits are never evicted, so the order in which footprints arrive is the
// priority order. The grid only narrows the candidate set; every candidate
// is confirmed with a polygon test before it counts as a conflict.

use crate::geometry::{Mbr, Point, convex_hull, hulls_overlap};
use crate::grid::CellGrid;
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
struct TrackedObject {
    hull: Vec<Point>,
    mbr: Mbr,
}

/// Footprints committed to the screen during one layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapTracker {
    grid: CellGrid,
    objects: Vec<TrackedObject>,
}

impl OverlapTracker {
    pub fn new(mbr: Mbr, size_x: usize, size_y: usize) -> Self {
        Self {
            grid: CellGrid::new(mbr, size_x, size_y),
            objects: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Commit `pts` unless it overlaps something already on screen.
    /// Returns `false`, leaving the tracker untouched, on conflict.
    pub fn add_check_object(&mut self, pts: &[Point]) -> bool {
        let mbr = Mbr::from_points(pts);
        let hull = convex_hull(pts);
        if self.conflicts(&hull, &mbr) {
            trace!(?mbr, "footprint rejected");
            return false;
        }
        self.commit(hull, mbr);
        true
    }

    /// Returns `true` when `pts` would overlap a committed footprint.
    pub fn check_object(&self, pts: &[Point]) -> bool {
        let mbr = Mbr::from_points(pts);
        self.conflicts(&convex_hull(pts), &mbr)
    }

    /// Commit `pts` regardless of what it covers.
    pub fn add_object(&mut self, pts: &[Point]) {
        let mbr = Mbr::from_points(pts);
        self.commit(convex_hull(pts), mbr);
    }

    fn conflicts(&self, hull: &[Point], mbr: &Mbr) -> bool {
        // Zero-area footprints never conflict, on either side of the test.
        if mbr.is_degenerate() {
            return false;
        }
        self.grid.find_objects_within(mbr).into_iter().any(|idx| {
            let other = &self.objects[idx];
            !other.mbr.is_degenerate()
                && other.mbr.overlaps(mbr)
                && hulls_overlap(&other.hull, hull)
        })
    }

    fn commit(&mut self, hull: Vec<Point>, mbr: Mbr) {
        let index = self.objects.len();
        self.grid.add_to_cells(&mbr, index);
        self.objects.push(TrackedObject { hull, mbr });
        debug_assert!(self.grid.is_registered_exactly(index, Some(&mbr)));
    }
}
