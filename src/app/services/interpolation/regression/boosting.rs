//! Gradient boosting with squared loss

use super::{RegressionTree, TrendModel, check_training_data, mean};
use crate::Result;

/// Additive model of shallow trees fitted to successive residuals
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    init: f64,
    stages: Vec<RegressionTree>,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(100, 0.1, 3)
    }
}

impl GradientBoosting {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth,
            init: 0.0,
            stages: Vec::new(),
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl TrendModel for GradientBoosting {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;

        self.init = mean(y);
        self.stages.clear();
        let mut current = vec![self.init; y.len()];

        for _ in 0..self.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, f)| t - f).collect();

            let mut tree = RegressionTree::new(Some(self.max_depth));
            tree.fit(x, &residuals)?;
            for (value, covariate) in current.iter_mut().zip(x) {
                *value += self.learning_rate * tree.predict(*covariate);
            }
            self.stages.push(tree);
        }
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        self.init
            + self
                .stages
                .iter()
                .map(|tree| self.learning_rate * tree.predict(x))
                .sum::<f64>()
    }
}
