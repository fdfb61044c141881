/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct used for neighbor lookups.
 * It divides the simulation domain into uniform cells and stores, per cell,
 * the range of entries it owns inside an externally sorted boid-index array.
 *
 * Optimized for performance by:
 * - Sort-based binning: no per-cell containers, only two flat index arrays
 * - Cell sizes of at least twice the largest interaction radius, so a 2x2
 *   block of cells covers a boid's whole neighborhood
 * - Wrapping cell coordinates instead of bounds-checking them
 */

use std::ops::Range;

use nannou::prelude::*;

use crate::geometry::{expand_rect, is_degenerate, wrap_index, EPSILON};

// Marks a cell with no boids in either index array
pub const EMPTY: i32 = -1;

// One entry of the 2x2 block scanned around a boid
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborCell {
    pub cell: usize,
    // World-space offset of this cell's origin from the scanning boid's cell
    pub offset: Vec2,
}

// The boid's own cell plus up to three neighbors, without duplicates
#[derive(Clone, Copy, Debug)]
pub struct NeighborBlock {
    cells: [NeighborCell; 4],
    len: usize,
}

impl NeighborBlock {
    pub fn iter(&self) -> impl Iterator<Item = &NeighborCell> {
        self.cells[..self.len].iter()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Clone, Debug)]
pub struct SpatialGrid {
    origin: Vec2,
    cell_dims: Vec2,
    width: usize,
    height: usize,
    start_index: Vec<i32>,
    end_index: Vec<i32>,
}

impl SpatialGrid {
    /// Build a grid over `domain` grown by `margin_cells` cells on every side.
    ///
    /// The cell count per axis is `floor(extent / desired_cell_size)` and the
    /// cell size is then stretched so the cells tile the extent exactly; the
    /// resulting `cell_dims` is never smaller than `desired_cell_size`.
    pub fn new(domain: Rect, desired_cell_size: f32, margin_cells: usize) -> Self {
        debug_assert!(!is_degenerate(domain), "spatial grid over a zero-area domain");
        debug_assert!(desired_cell_size > 0.0, "spatial grid cell size must be positive");

        let desired = desired_cell_size.max(EPSILON);
        let bounds = expand_rect(domain, margin_cells as f32 * desired);

        let width = ((bounds.w() / desired).floor() as usize).max(1);
        let height = ((bounds.h() / desired).floor() as usize).max(1);
        let cell_dims = vec2(bounds.w() / width as f32, bounds.h() / height as f32);

        Self {
            origin: pt2(bounds.left(), bounds.bottom()),
            cell_dims,
            width,
            height,
            start_index: vec![EMPTY; width * height],
            end_index: vec![EMPTY; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn cell_dims(&self) -> Vec2 {
        self.cell_dims
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    // Mark every cell empty; called once per tick before rebinning
    pub fn reset_ranges(&mut self) {
        self.start_index.fill(EMPTY);
        self.end_index.fill(EMPTY);
    }

    // Unwrapped integer cell coordinates of a world position
    #[inline]
    pub fn cell_coords(&self, position: Vec2) -> (i32, i32) {
        let local = position - self.origin;
        (
            (local.x / self.cell_dims.x).floor() as i32,
            (local.y / self.cell_dims.y).floor() as i32,
        )
    }

    // Flattened index of a cell, wrapping both axes into the grid
    #[inline]
    pub fn cell_at(&self, cx: i32, cy: i32) -> usize {
        wrap_index(cy, self.height) * self.width + wrap_index(cx, self.width)
    }

    #[inline]
    pub fn cell_of(&self, position: Vec2) -> usize {
        let (cx, cy) = self.cell_coords(position);
        self.cell_at(cx, cy)
    }

    /// Cell index and cell-local position of a world position.
    ///
    /// The local position is measured from the unwrapped cell's corner, so it
    /// always lies in `[0, cell_dims)` even for positions outside the grid.
    #[inline]
    pub fn locate(&self, position: Vec2) -> (usize, Vec2) {
        let (cx, cy) = self.cell_coords(position);
        let corner = self.origin + vec2(cx as f32 * self.cell_dims.x, cy as f32 * self.cell_dims.y);
        (self.cell_at(cx, cy), position - corner)
    }

    #[inline]
    pub fn cell_xy(&self, cell: usize) -> (i32, i32) {
        ((cell % self.width) as i32, (cell / self.width) as i32)
    }

    // World position of a cell's lower-left corner
    pub fn cell_origin(&self, cell: usize) -> Vec2 {
        let (cx, cy) = self.cell_xy(cell);
        self.origin + vec2(cx as f32 * self.cell_dims.x, cy as f32 * self.cell_dims.y)
    }

    #[inline]
    pub fn set_range(&mut self, cell: usize, start: usize, end: usize) {
        self.start_index[cell] = start as i32;
        self.end_index[cell] = end as i32;
    }

    pub fn start_index(&self) -> &[i32] {
        &self.start_index
    }

    pub fn end_index(&self) -> &[i32] {
        &self.end_index
    }

    // Half-open range of sorted entries owned by a cell, if any
    #[inline]
    pub fn range(&self, cell: usize) -> Option<Range<usize>> {
        let start = self.start_index[cell];
        if start == EMPTY {
            return None;
        }
        Some(start as usize..self.end_index[cell] as usize)
    }

    /// Rebuild every cell range from `sorted`, a permutation of boid indices
    /// ordered by `cells[boid]`.
    ///
    /// One linear scan: a range closes wherever the cell value changes
    /// between adjacent sorted entries.
    pub fn rebuild_from_sorted(&mut self, sorted: &[usize], cells: &[usize]) {
        self.reset_ranges();

        let Some(&first) = sorted.first() else {
            return;
        };

        let mut current = cells[first];
        let mut start = 0;
        for (k, &boid) in sorted.iter().enumerate().skip(1) {
            let cell = cells[boid];
            if cell != current {
                self.set_range(current, start, k);
                current = cell;
                start = k;
            }
        }
        self.set_range(current, start, sorted.len());
    }

    /// The cells scanned for a boid in `cell` at cell-local `relative`.
    ///
    /// Only the half of the 3x3 neighborhood facing the boid is visited: the
    /// own cell, the horizontal and vertical neighbors on the side of the
    /// cell the boid sits in, and the diagonal between them. With cells at
    /// least twice the interaction radius this covers the full radius; with
    /// smaller cells, neighbors in the far-side cells are missed.
    pub fn neighbor_block(&self, cell: usize, relative: Vec2) -> NeighborBlock {
        let (cx, cy) = self.cell_xy(cell);
        let sx = if relative.x < self.cell_dims.x * 0.5 { -1 } else { 1 };
        let sy = if relative.y < self.cell_dims.y * 0.5 { -1 } else { 1 };

        let mut block = NeighborBlock {
            cells: [NeighborCell { cell, offset: Vec2::ZERO }; 4],
            len: 0,
        };

        for (ox, oy) in [(0, 0), (sx, 0), (0, sy), (sx, sy)] {
            let neighbor = self.cell_at(cx + ox, cy + oy);
            // Grids one cell wide wrap back onto themselves
            if block.cells[..block.len].iter().any(|c| c.cell == neighbor) {
                continue;
            }
            block.cells[block.len] = NeighborCell {
                cell: neighbor,
                offset: vec2(ox as f32 * self.cell_dims.x, oy as f32 * self.cell_dims.y),
            };
            block.len += 1;
        }

        block
    }
}
