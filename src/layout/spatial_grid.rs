// Spatial hash grid for neighbour lookup.
//
// Steering only cares about agents inside the avoidance radius, so instead of
// scanning every tracked position for every agent, positions are bucketed into
// cells of that radius and a query visits the 3x3 block around the asker.

use std::collections::HashMap;

use super::Vec2;
use crate::model::AgentId;

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    /// Size of each cell in the grid.
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<(AgentId, Vec2)>>,
}

impl SpatialGrid {
    /// Cell size should be at least the largest query radius.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            cells: HashMap::new(),
        }
    }

    pub fn from_points<'a>(cell_size: f64, points: impl IntoIterator<Item = (&'a AgentId, Vec2)>) -> Self {
        let mut grid = Self::new(cell_size);
        for (id, pos) in points {
            grid.insert(id.clone(), pos);
        }
        grid
    }

    fn cell_of(&self, p: Vec2) -> (i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    pub fn insert(&mut self, id: AgentId, pos: Vec2) {
        let cell = self.cell_of(pos);
        self.cells.entry(cell).or_default().push((id, pos));
    }

    /// Every point in the 3x3 block of cells around `p`.
    /// May include points further away than `cell_size`; callers filter by distance.
    pub fn neighbors(&self, p: Vec2) -> impl Iterator<Item = (&AgentId, Vec2)> + '_ {
        let (cx, cy) = self.cell_of(p);
        (cx - 1..=cx + 1)
            .flat_map(move |x| (cy - 1..=cy + 1).map(move |y| (x, y)))
            .filter_map(move |cell| self.cells.get(&cell))
            .flat_map(|points| points.iter().map(|(id, pos)| (id, *pos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let a = AgentId::from("a");
        let b = AgentId::from("b");
        let mut grid = SpatialGrid::new(60.0);
        grid.insert(a.clone(), Vec2::new(10.0, 10.0));
        grid.insert(b.clone(), Vec2::new(500.0, 500.0));

        let near: Vec<&AgentId> = grid.neighbors(Vec2::new(40.0, 40.0)).map(|(id, _)| id).collect();
        assert_eq!(near, vec![&a]);
        assert_eq!(grid.neighbors(Vec2::new(520.0, 480.0)).count(), 1);
    }

    #[test]
    fn test_query_crosses_cell_boundary() {
        let a = AgentId::from("a");
        let grid = SpatialGrid::from_points(60.0, [(&a, Vec2::new(-5.0, 59.0))]);
        // (-5, 59) sits in cell (-1, 0); (55, 65) sits in (0, 1).
        assert_eq!(grid.neighbors(Vec2::new(55.0, 65.0)).count(), 1);
    }

    #[test]
    fn test_nonpositive_cell_size() {
        let grid = SpatialGrid::new(0.0);
        assert_eq!(grid.neighbors(Vec2::ZERO).count(), 0);
    }
}
