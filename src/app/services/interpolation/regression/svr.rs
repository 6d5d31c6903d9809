//! Epsilon-insensitive support vector regression with an RBF kernel
//!
//! The dual is solved by coordinate descent on `beta = alpha - alpha*`. The
//! bias is absorbed by adding 1 to the kernel, which removes the equality
//! constraint, so each coordinate update is a soft-threshold followed by a clip
//! to the box `[-C, C]`.

use super::{TrendModel, check_training_data, mean};
use crate::Result;
use tracing::debug;

const MAX_SWEEPS: usize = 500;
const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct KernelSvr {
    c: f64,
    epsilon: f64,
    gamma: f64,
    support: Vec<f64>,
    coefficients: Vec<f64>,
}

impl Default for KernelSvr {
    fn default() -> Self {
        Self::new(1.0, 0.1)
    }
}

impl KernelSvr {
    pub fn new(c: f64, epsilon: f64) -> Self {
        Self {
            c,
            epsilon,
            gamma: 1.0,
            support: Vec::new(),
            coefficients: Vec::new(),
        }
    }

    /// Kernel width chosen at fit time, 1 / var(x)
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    fn kernel(&self, a: f64, b: f64) -> f64 {
        (-self.gamma * (a - b).powi(2)).exp() + 1.0
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    value.signum() * (value.abs() - threshold).max(0.0)
}

impl TrendModel for KernelSvr {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;

        let x_mean = mean(x);
        let variance = x.iter().map(|v| (v - x_mean).powi(2)).sum::<f64>() / x.len() as f64;
        self.gamma = if variance > 0.0 { 1.0 / variance } else { 1.0 };

        let n = x.len();
        let kernel: Vec<Vec<f64>> = x
            .iter()
            .map(|a| x.iter().map(|b| self.kernel(*a, *b)).collect())
            .collect();

        let mut beta = vec![0.0; n];
        // fitted[i] = sum_j K[i][j] * beta[j]
        let mut fitted = vec![0.0; n];

        let mut sweeps = 0;
        while sweeps < MAX_SWEEPS {
            sweeps += 1;
            let mut max_change: f64 = 0.0;

            for i in 0..n {
                let k_ii = kernel[i][i];
                let gradient = fitted[i] - k_ii * beta[i] - y[i];
                let updated = (soft_threshold(-gradient, self.epsilon) / k_ii).clamp(-self.c, self.c);

                let change = updated - beta[i];
                if change != 0.0 {
                    for (j, value) in fitted.iter_mut().enumerate() {
                        *value += change * kernel[j][i];
                    }
                    beta[i] = updated;
                    max_change = max_change.max(change.abs());
                }
            }

            if max_change < TOLERANCE {
                break;
            }
        }

        debug!(
            "SVR converged after {} sweeps with {} support vectors",
            sweeps,
            beta.iter().filter(|b| **b != 0.0).count()
        );

        let (support, coefficients): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(&beta)
            .filter(|(_, b)| **b != 0.0)
            .map(|(xi, b)| (*xi, *b))
            .unzip();
        self.support = support;
        self.coefficients = coefficients;
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        self.support
            .iter()
            .zip(&self.coefficients)
            .map(|(s, b)| b * self.kernel(*s, x))
            .sum()
    }
}
