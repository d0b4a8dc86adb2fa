//! Flyweight grid that maps geographic points onto interned cells.

use std::{collections::HashMap, rc::Rc};

use geocoin_core::{Cell, GeoPoint, GeoRect};

/// Converts geographic points into cells and back into bounding rectangles.
///
/// Every distinct `(i, j)` pair resolves to a single shared [`Cell`] handle for
/// the lifetime of the grid; the interning table only ever grows.
#[derive(Debug)]
pub struct CoordinateGrid {
    origin: GeoPoint,
    tile_degrees: f64,
    interned: HashMap<(i32, i32), Rc<Cell>>,
}

impl CoordinateGrid {
    /// Creates a grid whose cell (0, 0) starts at `origin`.
    #[must_use]
    pub fn new(origin: GeoPoint, tile_degrees: f64) -> Self {
        Self {
            origin,
            tile_degrees,
            interned: HashMap::new(),
        }
    }

    /// Resolves the cell containing `point`.
    pub fn cell_for(&mut self, point: GeoPoint) -> Rc<Cell> {
        let i = self.axis_index(point.lat, self.origin.lat);
        let j = self.axis_index(point.lng, self.origin.lng);
        self.intern(i, j)
    }

    /// Returns the shared handle for `(i, j)`, creating it on first use.
    pub fn intern(&mut self, i: i32, j: i32) -> Rc<Cell> {
        Rc::clone(
            self.interned
                .entry((i, j))
                .or_insert_with(|| Rc::new(Cell::new(i, j))),
        )
    }

    /// Geographic rectangle covered by `cell`.
    #[must_use]
    pub fn bounds_for(&self, cell: Cell) -> GeoRect {
        let (i, j) = (f64::from(cell.i()), f64::from(cell.j()));
        let south = self.edge(self.origin.lat, i);
        let west = self.edge(self.origin.lng, j);
        let north = self.edge(self.origin.lat, i + 1.0);
        let east = self.edge(self.origin.lng, j + 1.0);
        GeoRect::new(GeoPoint::new(south, west), GeoPoint::new(north, east))
    }

    /// Geographic centre of `cell`.
    #[must_use]
    pub fn center_of(&self, cell: Cell) -> GeoPoint {
        let tile = self.tile_degrees;
        GeoPoint::new(
            self.origin.lat + (f64::from(cell.i()) + 0.5) * tile,
            self.origin.lng + (f64::from(cell.j()) + 0.5) * tile,
        )
    }

    /// Number of distinct cells resolved so far.
    #[must_use]
    pub fn interned_len(&self) -> usize {
        self.interned.len()
    }

    fn edge(&self, origin: f64, index: f64) -> f64 {
        origin + index * self.tile_degrees
    }

    fn axis_index(&self, value: f64, origin: f64) -> i32 {
        let estimate = ((value - origin) / self.tile_degrees).floor();
        // Saturate far-away points instead of wrapping.
        let mut index = estimate.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
        // The division may round across a tile edge; settle on the tile whose
        // bounds, as computed by `bounds_for`, actually contain the value.
        while index > i32::MIN && value < self.edge(origin, f64::from(index)) {
            index -= 1;
        }
        while index < i32::MAX && value >= self.edge(origin, f64::from(index) + 1.0) {
            index += 1;
        }
        index
    }
}
