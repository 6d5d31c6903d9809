//! CART regression tree on one covariate
//!
//! Splits minimise the summed squared error of both children. Thresholds sit
//! halfway between consecutive distinct covariate values.

use super::{TrendModel, check_training_data, mean};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f64),
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Regression tree with optional depth limit
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    max_depth: Option<usize>,
    min_samples_split: usize,
    root: Node,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RegressionTree {
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            min_samples_split: 2,
            root: Node::Leaf(0.0),
        }
    }

    /// Fit on the rows selected by `indices`, which may repeat (bootstrap samples)
    pub fn fit_indices(&mut self, x: &[f64], y: &[f64], indices: &[usize]) -> Result<()> {
        check_training_data(x, y)?;

        let mut rows: Vec<(f64, f64)> = indices.iter().map(|&i| (x[i], y[i])).collect();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.root = self.grow(&rows, 0);
        Ok(())
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            match node {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }

    /// Grow a subtree over rows sorted by covariate
    fn grow(&self, rows: &[(f64, f64)], depth: usize) -> Node {
        let targets: Vec<f64> = rows.iter().map(|r| r.1).collect();
        let value = mean(&targets);

        if rows.len() < self.min_samples_split || self.max_depth.is_some_and(|max| depth >= max) {
            return Node::Leaf(value);
        }

        match best_split(rows) {
            Some((position, threshold)) => Node::Split {
                threshold,
                left: Box::new(self.grow(&rows[..position], depth + 1)),
                right: Box::new(self.grow(&rows[position..], depth + 1)),
            },
            None => Node::Leaf(value),
        }
    }
}

/// Split position and threshold with the lowest child SSE, if any split improves on the parent
fn best_split(rows: &[(f64, f64)]) -> Option<(usize, f64)> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|r| r.1).sum();
    let total_sq: f64 = rows.iter().map(|r| r.1 * r.1).sum();
    let parent_sse = total_sq - total * total / n as f64;
    if parent_sse <= f64::EPSILON {
        return None;
    }

    let mut best: Option<(usize, f64, f64)> = None;
    let mut left_sum = 0.0;
    let mut left_sq = 0.0;

    for position in 1..n {
        let (_, y) = rows[position - 1];
        left_sum += y;
        left_sq += y * y;

        // Only split between distinct covariate values
        if rows[position].0 <= rows[position - 1].0 {
            continue;
        }

        let left_n = position as f64;
        let right_n = (n - position) as f64;
        let right_sum = total - left_sum;
        let right_sq = total_sq - left_sq;
        let sse = (left_sq - left_sum * left_sum / left_n) + (right_sq - right_sum * right_sum / right_n);

        if best.is_none_or(|(_, _, best_sse)| sse < best_sse) {
            let threshold = 0.5 * (rows[position - 1].0 + rows[position].0);
            best = Some((position, threshold, sse));
        }
    }

    best.filter(|(_, _, sse)| *sse < parent_sse)
        .map(|(position, threshold, _)| (position, threshold))
}

impl TrendModel for RegressionTree {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        let indices: Vec<usize> = (0..x.len()).collect();
        self.fit_indices(x, y, &indices)
    }

    fn predict(&self, x: f64) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    threshold,
                    left,
                    right,
                } => {
                    node = if x <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }
}
