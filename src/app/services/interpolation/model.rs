//! Regression kriging: trend on elevation plus kriged residuals

use super::kriging::OrdinaryKriging;
use super::regression::{RegressionKind, TrendModel};
use super::variogram::{FittedVariogram, VariogramModel};
use crate::Result;
use crate::constants::VARIOGRAM_LAG_BINS;
use tracing::debug;

/// Fitted trend regression and residual kriging predictor for one call
#[derive(Debug)]
pub struct InterpolationModel {
    trend: Box<dyn TrendModel>,
    residuals: OrdinaryKriging,
}

impl InterpolationModel {
    /// Fit the trend to (elevation, temperature) and krige its residuals over coordinates
    ///
    /// # Arguments
    ///
    /// * `regression` - Trend regression to fit
    /// * `variogram` - Variogram family for the residuals
    /// * `n_closest` - Samples per local kriging system
    /// * `elevations` - Covariate at each sample
    /// * `coords` - (longitude, latitude) of each sample
    /// * `temperatures` - Target at each sample
    pub fn fit(
        regression: RegressionKind,
        variogram: VariogramModel,
        n_closest: usize,
        elevations: &[f64],
        coords: &[[f64; 2]],
        temperatures: &[f64],
    ) -> Result<Self> {
        let mut trend = regression.build();
        trend.fit(elevations, temperatures)?;

        let residuals: Vec<f64> = temperatures
            .iter()
            .zip(trend.predict_many(elevations))
            .map(|(t, fitted)| t - fitted)
            .collect();

        let fitted_variogram =
            FittedVariogram::fit(variogram, coords, &residuals, VARIOGRAM_LAG_BINS);
        let kriging = OrdinaryKriging::new(coords, &residuals, fitted_variogram, n_closest);

        debug!(
            "Regression kriging fitted: {} trend, {} residual samples",
            regression,
            kriging.sample_count()
        );

        Ok(Self {
            trend,
            residuals: kriging,
        })
    }

    /// Trend at `elevation` plus kriged residual at (x, y)
    pub fn predict(&self, elevation: f64, x: f64, y: f64) -> f64 {
        self.trend.predict(elevation) + self.residuals.predict(x, y)
    }

    pub fn variogram(&self) -> &FittedVariogram {
        self.residuals.variogram()
    }
}
