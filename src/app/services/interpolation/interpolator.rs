//! Grid interpolation of per-site predicted temperatures

use super::grid::RegionGrid;
use super::model::InterpolationModel;
use super::region::RegionBoundary;
use super::regression::RegressionKind;
use super::variogram::VariogramModel;
use crate::app::models::{OutputGrid, PredictedRecord};
use crate::app::services::enrichment::ElevationGrid;
use crate::config::InterpolationConfig;
use crate::constants::{DEFAULT_GRID_RESOLUTION, DEFAULT_N_CLOSEST, MISSING_VALUE};
use crate::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info};

/// Builds the region grid and fills it by regression kriging
#[derive(Debug, Clone)]
pub struct SpatialInterpolator {
    grid_resolution: usize,
    variogram: VariogramModel,
    n_closest: usize,
    regression: RegressionKind,
}

impl Default for SpatialInterpolator {
    fn default() -> Self {
        Self {
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            variogram: VariogramModel::Spherical,
            n_closest: DEFAULT_N_CLOSEST,
            regression: RegressionKind::Linear,
        }
    }
}

/// Replace NaN entries with the mean of the finite ones
///
/// Returns the number of replaced entries. Without any finite value the
/// entries are set to `fallback`.
pub fn fill_missing_with_mean(values: &mut [f64], fallback: f64) -> usize {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let fill = if finite.is_empty() {
        fallback
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };
    fill_missing(values, fill)
}

/// Replace non-finite entries with `fill`, returning how many were replaced
pub fn fill_missing(values: &mut [f64], fill: f64) -> usize {
    let mut replaced = 0;
    for value in values.iter_mut().filter(|v| !v.is_finite()) {
        *value = fill;
        replaced += 1;
    }
    replaced
}

impl SpatialInterpolator {
    /// Build an interpolator, parsing the regression and variogram selectors
    ///
    /// # Errors
    ///
    /// `Configuration` for an unknown regression model or variogram family.
    pub fn from_config(config: &InterpolationConfig) -> Result<Self> {
        let regression: RegressionKind = config.regression_model.parse()?;
        let variogram: VariogramModel = config.variogram_model.parse()?;
        Ok(Self {
            grid_resolution: config.grid_resolution,
            variogram,
            n_closest: config.n_closest,
            regression,
        })
    }

    pub fn with_grid_resolution(mut self, resolution: usize) -> Self {
        self.grid_resolution = resolution;
        self
    }

    pub fn with_regression(mut self, regression: RegressionKind) -> Self {
        self.regression = regression;
        self
    }

    pub fn with_variogram(mut self, variogram: VariogramModel) -> Self {
        self.variogram = variogram;
        self
    }

    pub fn with_n_closest(mut self, n_closest: usize) -> Self {
        self.n_closest = n_closest;
        self
    }

    pub fn grid_resolution(&self) -> usize {
        self.grid_resolution
    }

    /// Interpolate predicted temperatures onto the region grid
    ///
    /// # Arguments
    ///
    /// * `predictions` - Per-site predicted temperatures
    /// * `boundary` - Region the grid is masked to
    /// * `elevation` - Elevation raster for the trend covariate
    ///
    /// # Returns
    ///
    /// The grid with exterior cells set to the missing-value sentinel
    ///
    /// # Errors
    ///
    /// `DataValidation` without finite samples, `DimensionMismatch` when the
    /// sample arrays disagree in length.
    pub fn interpolate(
        &self,
        predictions: &[PredictedRecord],
        boundary: &RegionBoundary,
        elevation: &ElevationGrid,
    ) -> Result<OutputGrid> {
        info!(
            "Spatial interpolation started. Using regression model: {}",
            self.regression
        );

        let grid = RegionGrid::build(boundary, self.grid_resolution)?;

        let samples: Vec<&PredictedRecord> = predictions
            .iter()
            .filter(|p| {
                p.longitude.is_finite() && p.latitude.is_finite() && p.predicted_temperature.is_finite()
            })
            .collect();
        if samples.is_empty() {
            return Err(Error::data_validation("No finite samples to interpolate"));
        }

        let lon: Vec<f64> = samples.iter().map(|p| p.longitude).collect();
        let lat: Vec<f64> = samples.iter().map(|p| p.latitude).collect();
        let temperature: Vec<f64> = samples.iter().map(|p| p.predicted_temperature).collect();

        let mut sample_elevation: Vec<f64> = lon
            .iter()
            .zip(&lat)
            .map(|(x, y)| elevation.bilinear(*x, *y))
            .collect();
        let inside = grid.inside_cells();
        let mut cell_elevation: Vec<f64> = inside
            .par_iter()
            .map(|(_, x, y)| elevation.bilinear(*x, *y))
            .collect();

        let replaced = fill_missing_with_mean(&mut sample_elevation, 0.0);
        if replaced > 0 {
            debug!("Replaced {} missing sample elevations with the mean", replaced);
        }
        // Cells off the raster take the sample mean, independent of the mask
        let sample_mean = sample_elevation.iter().sum::<f64>() / sample_elevation.len() as f64;
        let replaced = fill_missing(&mut cell_elevation, sample_mean);
        if replaced > 0 {
            debug!(
                "Replaced {} missing grid elevations with the sample mean {:.1}",
                replaced, sample_mean
            );
        }

        if !(lon.len() == lat.len()
            && lat.len() == temperature.len()
            && temperature.len() == sample_elevation.len())
        {
            return Err(Error::dimension_mismatch(
                lon.len(),
                lat.len(),
                temperature.len(),
                sample_elevation.len(),
            ));
        }

        let coords: Vec<[f64; 2]> = lon.iter().zip(&lat).map(|(x, y)| [*x, *y]).collect();
        let model = InterpolationModel::fit(
            self.regression,
            self.variogram,
            self.n_closest,
            &sample_elevation,
            &coords,
            &temperature,
        )?;
        info!("Regression kriging model trained on {} samples", coords.len());

        let predicted: Vec<f64> = inside
            .par_iter()
            .zip(cell_elevation.par_iter())
            .map(|((_, x, y), e)| model.predict(*e, *x, *y))
            .collect();

        let n = grid.resolution();
        let mut field = Array2::from_elem((n, n), MISSING_VALUE);
        for ((idx, _, _), value) in inside.iter().zip(predicted) {
            field[*idx] = value;
        }

        info!(
            cells = inside.len(),
            "Temperature prediction on grid completed, mask applied"
        );

        Ok(OutputGrid {
            grid_x: grid.grid_x,
            grid_y: grid.grid_y,
            temperature: field,
        })
    }
}

/// Parse selectors from `config` and interpolate in one call
///
/// Unknown selectors fail before any grid computation.
pub fn interpolate(
    predictions: &[PredictedRecord],
    boundary: &RegionBoundary,
    elevation: &ElevationGrid,
    config: &InterpolationConfig,
) -> Result<OutputGrid> {
    SpatialInterpolator::from_config(config)?.interpolate(predictions, boundary, elevation)
}
