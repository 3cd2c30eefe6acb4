use crate::domain::models::{Mark, Point};

/// Square Caro board. Cells are stored row-major in a flat vector; a cell is
/// either empty or carries a mark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Mark>>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn index(&self, x: usize, y: usize) -> usize {
        x * self.size + y
    }

    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Mark> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.cells[self.index(x, y)]
    }

    /// Signed-coordinate lookup used by the line scanners; anything off the
    /// board reads as empty.
    pub fn mark_at(&self, x: isize, y: isize) -> Option<Mark> {
        if x < 0 || y < 0 {
            return None;
        }
        self.get(x as usize, y as usize)
    }

    pub fn is_empty_cell(&self, x: usize, y: usize) -> bool {
        self.in_bounds(x, y) && self.cells[self.index(x, y)].is_none()
    }

    pub fn set(&mut self, x: usize, y: usize, mark: Mark) {
        let idx = self.index(x, y);
        self.cells[idx] = Some(mark);
    }

    pub fn clear(&mut self, x: usize, y: usize) {
        let idx = self.index(x, y);
        self.cells[idx] = None;
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }

    pub fn occupied_points(&self) -> impl Iterator<Item = (Point, Mark)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, c)| {
            c.map(|mark| (Point::new(i / self.size, i % self.size), mark))
        })
    }

    /// Nested-row representation used by the wire protocol.
    pub fn to_rows(&self) -> Vec<Vec<Option<Mark>>> {
        self.cells.chunks(self.size).map(|row| row.to_vec()).collect()
    }
}
