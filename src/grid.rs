use crate::geometry::Mbr;
use std::collections::BTreeSet;

/// Inclusive range of cell indices covered by a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub sx: usize,
    pub sy: usize,
    pub ex: usize,
    pub ey: usize,
}

impl CellRange {
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let (sx, sy, ex, ey) = (self.sx, self.sy, self.ex, self.ey);
        (sy..=ey).flat_map(move |iy| (sx..=ex).map(move |ix| (ix, iy)))
    }

    pub fn len(&self) -> usize {
        (self.ex - self.sx + 1) * (self.ey - self.sy + 1)
    }
}

/// Uniform grid over the layout rectangle. Each cell lists the indices of
/// the objects whose bounds touch it.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGrid {
    mbr: Mbr,
    size_x: usize,
    size_y: usize,
    cell_size: (f32, f32),
    cells: Vec<Vec<usize>>,
}

fn cell_index(value: f32, origin: f32, cell: f32, size: usize) -> usize {
    let pos = ((value - origin) / cell).floor();
    if pos.is_nan() || pos <= 0.0 {
        0
    } else if pos >= (size - 1) as f32 {
        size - 1
    } else {
        pos as usize
    }
}

impl CellGrid {
    pub fn new(mbr: Mbr, size_x: usize, size_y: usize) -> Self {
        let size_x = size_x.max(1);
        let size_y = size_y.max(1);
        let cell_size = (
            mbr.width() / size_x as f32,
            mbr.height() / size_y as f32,
        );
        Self {
            mbr,
            size_x,
            size_y,
            cell_size,
            cells: vec![Vec::new(); size_x * size_y],
        }
    }

    pub fn cell_size(&self) -> (f32, f32) {
        self.cell_size
    }

    /// Cells covered by `rect`, clamped to the grid. Anything outside the
    /// layout rectangle lands in the border cells.
    pub fn calc_cells(&self, rect: &Mbr) -> CellRange {
        let sx = cell_index(rect.ll.0, self.mbr.ll.0, self.cell_size.0, self.size_x);
        let sy = cell_index(rect.ll.1, self.mbr.ll.1, self.cell_size.1, self.size_y);
        let ex = cell_index(rect.ur.0, self.mbr.ll.0, self.cell_size.0, self.size_x);
        let ey = cell_index(rect.ur.1, self.mbr.ll.1, self.cell_size.1, self.size_y);
        CellRange {
            sx,
            sy,
            ex: ex.max(sx),
            ey: ey.max(sy),
        }
    }

    fn slot(&self, ix: usize, iy: usize) -> usize {
        iy * self.size_x + ix
    }

    pub fn add_to_cells(&mut self, rect: &Mbr, index: usize) {
        for (ix, iy) in self.calc_cells(rect).iter() {
            let slot = self.slot(ix, iy);
            let cell = &mut self.cells[slot];
            if !cell.contains(&index) {
                cell.push(index);
            }
        }
    }

    pub fn remove_from_cells(&mut self, rect: &Mbr, index: usize) {
        for (ix, iy) in self.calc_cells(rect).iter() {
            let slot = self.slot(ix, iy);
            self.cells[slot].retain(|&idx| idx != index);
        }
    }

    /// Every index registered in a cell that `rect` touches, de-duplicated
    /// and in ascending order.
    pub fn find_objects_within(&self, rect: &Mbr) -> BTreeSet<usize> {
        let mut found = BTreeSet::new();
        for (ix, iy) in self.calc_cells(rect).iter() {
            found.extend(self.cells[self.slot(ix, iy)].iter().copied());
        }
        found
    }

    pub fn cell(&self, ix: usize, iy: usize) -> &[usize] {
        &self.cells[self.slot(ix, iy)]
    }

    /// Cells currently holding `index`, row-major.
    pub fn cells_containing(&self, index: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for iy in 0..self.size_y {
            for ix in 0..self.size_x {
                if self.cells[self.slot(ix, iy)].contains(&index) {
                    out.push((ix, iy));
                }
            }
        }
        out
    }

    /// True when `index` sits in exactly the cells `rect` covers, or in none
    /// when `rect` is `None`.
    pub fn is_registered_exactly(&self, index: usize, rect: Option<&Mbr>) -> bool {
        let expected: Vec<(usize, usize)> = match rect {
            Some(rect) => self.calc_cells(rect).iter().collect(),
            None => Vec::new(),
        };
        self.cells_containing(index) == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_100() -> CellGrid {
        CellGrid::new(Mbr::new((0.0, 0.0), (100.0, 100.0)), 10, 10)
    }

    #[test]
    fn calc_cells_maps_rect_to_inclusive_range() {
        let grid = grid_100();
        let range = grid.calc_cells(&Mbr::new((15.0, 25.0), (34.0, 26.0)));
        assert_eq!(
            range,
            CellRange {
                sx: 1,
                sy: 2,
                ex: 3,
                ey: 2
            }
        );
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn calc_cells_clamps_outside_rects() {
        let grid = grid_100();
        let range = grid.calc_cells(&Mbr::new((-50.0, -50.0), (500.0, 5.0)));
        assert_eq!(range.sx, 0);
        assert_eq!(range.sy, 0);
        assert_eq!(range.ex, 9);
        assert_eq!(range.ey, 0);
    }

    #[test]
    fn calc_cells_handles_degenerate_input() {
        let grid = grid_100();
        let point = grid.calc_cells(&Mbr::new((42.0, 42.0), (42.0, 42.0)));
        assert_eq!(point.len(), 1);
        let nan = Mbr {
            ll: (f32::NAN, f32::NAN),
            ur: (f32::NAN, f32::NAN),
        };
        assert_eq!(grid.calc_cells(&nan).len(), 1);

        let flat = CellGrid::new(Mbr::new((0.0, 0.0), (0.0, 0.0)), 4, 4);
        assert_eq!(flat.calc_cells(&Mbr::new((1.0, 1.0), (2.0, 2.0))).len(), 1);
    }

    #[test]
    fn add_and_remove_keep_cells_in_sync() {
        let mut grid = grid_100();
        let rect = Mbr::new((5.0, 5.0), (25.0, 15.0));
        grid.add_to_cells(&rect, 7);
        grid.add_to_cells(&rect, 7);
        assert!(grid.is_registered_exactly(7, Some(&rect)));
        assert_eq!(grid.cell(0, 0), &[7]);

        grid.remove_from_cells(&rect, 7);
        assert!(grid.is_registered_exactly(7, None));
    }

    #[test]
    fn find_objects_within_unions_and_dedups() {
        let mut grid = grid_100();
        grid.add_to_cells(&Mbr::new((0.0, 0.0), (30.0, 30.0)), 1);
        grid.add_to_cells(&Mbr::new((25.0, 25.0), (35.0, 35.0)), 2);
        grid.add_to_cells(&Mbr::new((80.0, 80.0), (90.0, 90.0)), 3);

        let found: Vec<usize> = grid
            .find_objects_within(&Mbr::new((20.0, 20.0), (29.0, 29.0)))
            .into_iter()
            .collect();
        assert_eq!(found, vec![1, 2]);
        assert!(
            grid.find_objects_within(&Mbr::new((50.0, 50.0), (55.0, 55.0)))
                .is_empty()
        );
    }
}
