//! Ordinary least squares trend

use super::{TrendModel, check_training_data, mean};
use crate::Result;

/// `y = intercept + slope * x`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearTrend {
    pub intercept: f64,
    pub slope: f64,
}

impl TrendModel for LinearTrend {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;

        let x_mean = mean(x);
        let y_mean = mean(y);
        let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
        let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - x_mean) * (b - y_mean)).sum();

        // A constant covariate carries no trend
        self.slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        self.intercept = y_mean - self.slope * x_mean;
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}
