//! Trend regressions of temperature on elevation
//!
//! Every model fits a single covariate. [`RegressionKind`] is the configured
//! selector and builds a boxed [`TrendModel`].

pub mod boosting;
pub mod forest;
pub mod linear;
pub mod svr;
pub mod tree;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use boosting::GradientBoosting;
pub use forest::RandomForest;
pub use linear::LinearTrend;
pub use svr::KernelSvr;
pub use tree::RegressionTree;

/// A fitted or fittable one-covariate regression
pub trait TrendModel: Send + Sync + fmt::Debug {
    /// Fit to paired covariate and target values
    ///
    /// # Errors
    ///
    /// `DataValidation` when the slices are empty or differ in length.
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()>;

    /// Predict the target at covariate `x`
    fn predict(&self, x: f64) -> f64;

    fn predict_many(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|v| self.predict(*v)).collect()
    }
}

/// Check fit inputs shared by all models
pub(crate) fn check_training_data(x: &[f64], y: &[f64]) -> Result<()> {
    if x.is_empty() {
        return Err(Error::data_validation("Cannot fit a trend model to no samples"));
    }
    if x.len() != y.len() {
        return Err(Error::data_validation(format!(
            "Trend model inputs differ in length: {} covariates, {} targets",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Selectable trend regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionKind {
    #[default]
    Linear,
    RandomForest,
    GradientBoosting,
    KernelSvr,
}

impl RegressionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::RandomForest => "random_forest",
            Self::GradientBoosting => "gradient_boosting",
            Self::KernelSvr => "kernel_svr",
        }
    }

    /// Create an unfitted model of this kind with its standard settings
    pub fn build(self) -> Box<dyn TrendModel> {
        match self {
            Self::Linear => Box::new(LinearTrend::default()),
            Self::RandomForest => Box::new(RandomForest::default()),
            Self::GradientBoosting => Box::new(GradientBoosting::default()),
            Self::KernelSvr => Box::new(KernelSvr::default()),
        }
    }
}

impl FromStr for RegressionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "random_forest" => Ok(Self::RandomForest),
            "gradient_boosting" => Ok(Self::GradientBoosting),
            "kernel_svr" | "svr" => Ok(Self::KernelSvr),
            other => Err(Error::configuration(format!(
                "Unknown regression model type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RegressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
