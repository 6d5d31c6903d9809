//! Bootstrap-aggregated regression trees

use super::{RegressionTree, TrendModel, check_training_data};
use crate::Result;
use crate::constants::REGRESSION_RANDOM_SEED;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Random forest of fully grown trees on bootstrap samples
///
/// With a single covariate there is no feature subsampling; the forest
/// averages bagged trees. Per-tree seeds derive from one seeded generator so
/// results do not depend on thread scheduling.
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_estimators: usize,
    seed: u64,
    trees: Vec<RegressionTree>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100, REGRESSION_RANDOM_SEED)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            seed,
            trees: Vec::new(),
        }
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl TrendModel for RandomForest {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let seeds: Vec<u64> = (0..self.n_estimators).map(|_| rng.r#gen()).collect();
        let n = x.len();

        self.trees = seeds
            .into_par_iter()
            .map(|seed| {
                let mut tree_rng = StdRng::seed_from_u64(seed);
                let sample: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
                let mut tree = RegressionTree::new(None);
                tree.fit_indices(x, y, &sample).map(|_| tree)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|tree| tree.predict(x)).sum::<f64>() / self.trees.len() as f64
    }
}
