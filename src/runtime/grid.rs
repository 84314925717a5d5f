//! Tile domain builder.
//!
//! Partitions the monitor-dimension index space into a row-major grid of
//! hyper-cubes of edge `grid_size`. The per-tile polyhedral sets are built
//! once at initialization and reused every classification cycle; the
//! builder emits unclipped cubes, clipping against the full domain happens
//! by intersection downstream.

use crate::polyhedral::{Constraint, IntegerSet};
use crate::utils::errors::ConfigError;
use log::info;

/// The tile grid over the monitored index space.
#[derive(Debug, Clone)]
pub struct TileGrid {
    grid_size: i64,
    extents: Vec<i64>,
    tiles_per_dim: Vec<i64>,
    domains: Vec<IntegerSet>,
    full: IntegerSet,
}

impl TileGrid {
    /// Build the grid for the given per-dimension extents.
    ///
    /// Cost is one constraint pair per tile per dimension, paid here once.
    pub fn new(extents: &[i64], grid_size: i64) -> Result<TileGrid, ConfigError> {
        if grid_size < 1 {
            return Err(ConfigError::InvalidGridSize(grid_size));
        }
        assert!(!extents.is_empty(), "tile grid over zero dimensions");
        assert!(extents.iter().all(|&e| e > 0), "non-positive monitor extent");

        let n = extents.len();
        let tiles_per_dim: Vec<i64> = extents.iter()
            .map(|&e| (e + grid_size - 1) / grid_size)
            .collect();
        let total_tiles: usize = tiles_per_dim.iter().product::<i64>() as usize;
        let full = IntegerSet::rectangular(extents);

        let mut domains = Vec::with_capacity(total_tiles);
        for t in 0..total_tiles {
            let coords = decode(&tiles_per_dim, t);
            let mut cube = IntegerSet::universe(n);
            for (d, &c) in coords.iter().enumerate() {
                let lo = grid_size * c;
                cube.add_constraint(Constraint::lower_bound(d, lo, n, 0));
                cube.add_constraint(Constraint::upper_bound(d, lo + grid_size - 1, n, 0));
            }
            domains.push(cube);
        }
        info!(
            "tile grid: {:?} cells, edge {}, {} tiles ({:?} per dim)",
            extents, grid_size, total_tiles, tiles_per_dim
        );

        Ok(TileGrid {
            grid_size,
            extents: extents.to_vec(),
            tiles_per_dim,
            domains,
            full,
        })
    }

    /// Number of monitor dimensions.
    pub fn n_dims(&self) -> usize { self.extents.len() }

    /// Tile edge length.
    pub fn grid_size(&self) -> i64 { self.grid_size }

    /// Per-dimension extents.
    pub fn extents(&self) -> &[i64] { &self.extents }

    /// Tiles along each dimension.
    pub fn tiles_per_dim(&self) -> &[i64] { &self.tiles_per_dim }

    /// Total number of tiles.
    pub fn total_tiles(&self) -> usize { self.domains.len() }

    /// Total number of monitored cells (`monitor_total_size`).
    pub fn total_cells(&self) -> usize {
        self.extents.iter().product::<i64>() as usize
    }

    /// The full monitor index space.
    pub fn full_domain(&self) -> &IntegerSet { &self.full }

    /// The unclipped cube of tile `t`.
    pub fn tile_domain(&self, t: usize) -> &IntegerSet {
        &self.domains[t]
    }

    /// The cube of tile `t` clipped to the full domain.
    pub fn clipped(&self, t: usize) -> IntegerSet {
        self.domains[t].intersect(&self.full)
    }

    /// Row-major coordinates of tile `t`.
    pub fn tile_coords(&self, t: usize) -> Vec<i64> {
        decode(&self.tiles_per_dim, t)
    }

    /// Row-major tile index from coordinates.
    pub fn tile_index(&self, coords: &[i64]) -> usize {
        assert_eq!(coords.len(), self.n_dims());
        let mut t = 0i64;
        for (d, &c) in coords.iter().enumerate() {
            assert!(c >= 0 && c < self.tiles_per_dim[d], "tile coordinate out of range");
            t = t * self.tiles_per_dim[d] + c;
        }
        t as usize
    }

    /// Row-major linear index of a cell.
    pub fn cell_index(&self, cell: &[i64]) -> usize {
        assert_eq!(cell.len(), self.n_dims());
        let mut idx = 0i64;
        for (d, &c) in cell.iter().enumerate() {
            assert!(c >= 0 && c < self.extents[d], "cell coordinate out of range");
            idx = idx * self.extents[d] + c;
        }
        idx as usize
    }

    /// Tile owning a cell.
    pub fn tile_of_cell(&self, cell: &[i64]) -> usize {
        let coords: Vec<i64> = cell.iter().map(|&c| c / self.grid_size).collect();
        self.tile_index(&coords)
    }
}

fn decode(tiles_per_dim: &[i64], t: usize) -> Vec<i64> {
    let mut rem = t as i64;
    let mut coords = vec![0i64; tiles_per_dim.len()];
    for d in (0..tiles_per_dim.len()).rev() {
        coords[d] = rem % tiles_per_dim[d];
        rem /= tiles_per_dim[d];
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tile_counts() {
        let grid = TileGrid::new(&[10, 10], 4).unwrap();
        assert_eq!(grid.total_tiles(), 9);
        assert_eq!(grid.total_cells(), 100);
        assert_eq!(grid.tiles_per_dim(), &[3, 3]);
    }

    #[test]
    fn test_corner_tiles() {
        let grid = TileGrid::new(&[10, 10], 4).unwrap();
        // tile (0,0) covers [0..3] x [0..3]
        let t00 = grid.tile_index(&[0, 0]);
        let pts = grid.clipped(t00).points();
        assert_eq!(pts.len(), 16);
        assert!(pts.contains(&vec![0, 0]));
        assert!(pts.contains(&vec![3, 3]));
        // tile (2,2) is clipped to [8..9] x [8..9]
        let t22 = grid.tile_index(&[2, 2]);
        let pts = grid.clipped(t22).points();
        assert_eq!(pts.len(), 4);
        assert!(pts.contains(&vec![8, 8]));
        assert!(pts.contains(&vec![9, 9]));
        assert!(!pts.contains(&vec![10, 10]));
    }

    #[test]
    fn test_partition_property() {
        for (extents, size) in [
            (vec![10i64, 10], 4i64),
            (vec![7], 3),
            (vec![5, 6, 2], 2),
            (vec![4, 4], 4),
            (vec![9, 1], 5),
        ] {
            let grid = TileGrid::new(&extents, size).unwrap();
            let mut seen: HashSet<Vec<i64>> = HashSet::new();
            for t in 0..grid.total_tiles() {
                for p in grid.clipped(t).points() {
                    assert!(seen.insert(p), "tiles overlap for {:?}/{}", extents, size);
                }
            }
            assert_eq!(
                seen.len(),
                grid.total_cells(),
                "tiles do not cover {:?}/{}", extents, size
            );
        }
    }

    #[test]
    fn test_cell_and_tile_indexing() {
        let grid = TileGrid::new(&[10, 10], 4).unwrap();
        assert_eq!(grid.cell_index(&[0, 0]), 0);
        assert_eq!(grid.cell_index(&[1, 0]), 10);
        assert_eq!(grid.cell_index(&[9, 9]), 99);
        assert_eq!(grid.tile_of_cell(&[9, 9]), grid.tile_index(&[2, 2]));
        assert_eq!(grid.tile_coords(grid.tile_index(&[1, 2])), vec![1, 2]);
    }

    #[test]
    fn test_invalid_grid_size() {
        assert!(TileGrid::new(&[10], 0).is_err());
    }
}
