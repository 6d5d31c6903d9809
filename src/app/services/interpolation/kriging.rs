//! Ordinary kriging with a moving neighbourhood
//!
//! Each prediction solves the ordinary kriging system over the `n_closest`
//! samples nearest to the target:
//!
//! ```text
//! | gamma_11 ... gamma_1n 1 | | w_1 |   | gamma_10 |
//! |   ...         ...   ... | | ... | = |   ...    |
//! | gamma_n1 ... gamma_nn 1 | | w_n |   | gamma_n0 |
//! |    1     ...    1     0 | | mu  |   |    1     |
//! ```

use super::variogram::{FittedVariogram, ZERO_LAG};
use nalgebra::{DMatrix, DVector};
use rstar::RTree;
use rstar::primitives::GeomWithData;
use std::collections::HashMap;
use tracing::debug;

type Sample = GeomWithData<[f64; 2], f64>;

/// Ordinary kriging predictor over a fixed sample set
#[derive(Debug, Clone)]
pub struct OrdinaryKriging {
    tree: RTree<Sample>,
    variogram: FittedVariogram,
    n_closest: usize,
}

/// Average values of samples sharing identical coordinates
///
/// Output keeps the order in which each location first appears.
pub fn merge_duplicate_locations(coords: &[[f64; 2]], values: &[f64]) -> (Vec<[f64; 2]>, Vec<f64>) {
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut merged_coords: Vec<[f64; 2]> = Vec::new();
    let mut sums: Vec<(f64, usize)> = Vec::new();

    for (coord, value) in coords.iter().zip(values) {
        // Normalise -0.0 so it shares a key with 0.0
        let key = ((coord[0] + 0.0).to_bits(), (coord[1] + 0.0).to_bits());
        match index.get(&key) {
            Some(&slot) => {
                sums[slot].0 += value;
                sums[slot].1 += 1;
            }
            None => {
                index.insert(key, merged_coords.len());
                merged_coords.push(*coord);
                sums.push((*value, 1));
            }
        }
    }

    let merged_values = sums.into_iter().map(|(sum, count)| sum / count as f64).collect();
    (merged_coords, merged_values)
}

impl OrdinaryKriging {
    /// Build the predictor; samples at identical coordinates are merged first
    pub fn new(
        coords: &[[f64; 2]],
        values: &[f64],
        variogram: FittedVariogram,
        n_closest: usize,
    ) -> Self {
        let original = coords.len();
        let (coords, values) = merge_duplicate_locations(coords, values);
        if coords.len() < original {
            debug!(
                "Merged {} samples at duplicate locations into {}",
                original,
                coords.len()
            );
        }

        let samples = coords
            .into_iter()
            .zip(values)
            .map(|(coord, value)| GeomWithData::new(coord, value))
            .collect();

        Self {
            tree: RTree::bulk_load(samples),
            variogram,
            n_closest: n_closest.max(1),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.tree.size()
    }

    pub fn variogram(&self) -> &FittedVariogram {
        &self.variogram
    }

    /// Kriged value at (x, y), NaN without samples
    ///
    /// A target coinciding with a sample returns that sample's value. A
    /// singular local system falls back to the neighbourhood mean.
    pub fn predict(&self, x: f64, y: f64) -> f64 {
        let target = [x, y];
        let neighbours: Vec<&Sample> = self
            .tree
            .nearest_neighbor_iter(&target)
            .take(self.n_closest)
            .collect();

        let Some(first) = neighbours.first() else {
            return f64::NAN;
        };
        if distance(first.geom(), &target) < ZERO_LAG {
            return first.data;
        }
        if neighbours.len() == 1 {
            return first.data;
        }

        let n = neighbours.len();
        let mut lhs = DMatrix::<f64>::zeros(n + 1, n + 1);
        let mut rhs = DVector::<f64>::zeros(n + 1);
        for i in 0..n {
            for j in (i + 1)..n {
                let gamma = self
                    .variogram
                    .gamma(distance(neighbours[i].geom(), neighbours[j].geom()));
                lhs[(i, j)] = gamma;
                lhs[(j, i)] = gamma;
            }
            lhs[(i, n)] = 1.0;
            lhs[(n, i)] = 1.0;
            rhs[i] = self.variogram.gamma(distance(neighbours[i].geom(), &target));
        }
        rhs[n] = 1.0;

        match lhs.lu().solve(&rhs) {
            Some(weights) if weights.iter().all(|w| w.is_finite()) => neighbours
                .iter()
                .enumerate()
                .map(|(i, sample)| weights[i] * sample.data)
                .sum(),
            _ => neighbours.iter().map(|sample| sample.data).sum::<f64>() / n as f64,
        }
    }
}

fn distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}
