//! Regular mesh over the region bounding box with its inclusion mask

use super::region::RegionBoundary;
use crate::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

/// Coordinates of an `n x n` mesh and the cells inside the region
///
/// Axis 0 walks X (longitude) and axis 1 walks Y (latitude); both axes include
/// the bounding-box edges.
#[derive(Debug, Clone)]
pub struct RegionGrid {
    pub grid_x: Array2<f64>,
    pub grid_y: Array2<f64>,
    pub mask: Array2<bool>,
}

/// `count` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

impl RegionGrid {
    /// Build the mesh spanning the boundary's bounding box and mask it
    ///
    /// # Errors
    ///
    /// `Configuration` when `resolution` is below 2.
    pub fn build(boundary: &RegionBoundary, resolution: usize) -> Result<Self> {
        if resolution < 2 {
            return Err(Error::configuration(format!(
                "Grid resolution must be at least 2, got {}",
                resolution
            )));
        }

        let bounds = boundary.bounds();
        let xs = linspace(bounds.min().x, bounds.max().x, resolution);
        let ys = linspace(bounds.min().y, bounds.max().y, resolution);

        let grid_x = Array2::from_shape_fn((resolution, resolution), |(i, _)| xs[i]);
        let grid_y = Array2::from_shape_fn((resolution, resolution), |(_, j)| ys[j]);

        let inside: Vec<bool> = (0..resolution * resolution)
            .into_par_iter()
            .map(|k| boundary.contains(xs[k / resolution], ys[k % resolution]))
            .collect();
        let mask = Array2::from_shape_vec((resolution, resolution), inside)
            .map_err(|e| Error::data_validation(format!("Mask shape error: {}", e)))?;

        let grid = Self {
            grid_x,
            grid_y,
            mask,
        };
        debug!(
            "Grid {}x{} created, {} cells inside the region",
            resolution,
            resolution,
            grid.inside_count()
        );
        Ok(grid)
    }

    pub fn resolution(&self) -> usize {
        self.grid_x.nrows()
    }

    pub fn inside_count(&self) -> usize {
        self.mask.iter().filter(|inside| **inside).count()
    }

    /// Indices and coordinates of the cells inside the region, row-major
    pub fn inside_cells(&self) -> Vec<((usize, usize), f64, f64)> {
        self.mask
            .indexed_iter()
            .filter(|(_, inside)| **inside)
            .map(|(idx, _)| (idx, self.grid_x[idx], self.grid_y[idx]))
            .collect()
    }
}
