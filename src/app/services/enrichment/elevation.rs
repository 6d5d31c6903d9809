//! Rectilinear terrain elevation grid
//!
//! Stores elevations on ascending longitude and latitude axes and answers the
//! two lookups the pipeline needs: nearest valid node (enrichment) and bilinear
//! interpolation (kriging covariate).

use crate::constants::ELEVATION_NODATA;
use crate::{Error, Result};
use ndarray::Array2;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use std::cmp::Ordering;
use tracing::debug;

type ElevationNode = GeomWithData<[f64; 2], f64>;

/// Elevation raster with its coordinate axes
///
/// `values[[i, j]]` is the elevation at `(lons[i], lats[j])`. Nodata cells hold NaN.
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    lons: Vec<f64>,
    lats: Vec<f64>,
    values: Array2<f64>,
    nodes: RTree<ElevationNode>,
}

impl ElevationGrid {
    /// Build a grid from strictly ascending axes and a `(lons, lats)` shaped array
    ///
    /// # Errors
    ///
    /// Returns `DataValidation` when an axis is empty or unsorted, when the
    /// value array does not match the axes, or when no cell holds a valid elevation.
    pub fn new(lons: Vec<f64>, lats: Vec<f64>, mut values: Array2<f64>) -> Result<Self> {
        check_axis("longitude", &lons)?;
        check_axis("latitude", &lats)?;
        if values.dim() != (lons.len(), lats.len()) {
            return Err(Error::data_validation(format!(
                "Elevation array shape {:?} does not match axes ({}, {})",
                values.dim(),
                lons.len(),
                lats.len()
            )));
        }

        values.mapv_inplace(|v| if is_nodata(v) { f64::NAN } else { v });

        let nodes: Vec<ElevationNode> = values
            .indexed_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|((i, j), v)| GeomWithData::new([lons[i], lats[j]], *v))
            .collect();
        if nodes.is_empty() {
            return Err(Error::data_validation("Elevation grid holds no valid cells"));
        }

        debug!(
            "Elevation grid {}x{} with {} valid cells",
            lons.len(),
            lats.len(),
            nodes.len()
        );

        Ok(Self {
            lons,
            lats,
            values,
            nodes: RTree::bulk_load(nodes),
        })
    }

    /// Build a grid from long-format `(lon, lat, elevation)` samples
    ///
    /// Axes are the sorted distinct coordinates; nodes absent from the input are nodata.
    pub fn from_points(points: &[(f64, f64, f64)]) -> Result<Self> {
        let lons = distinct_sorted(points.iter().map(|p| p.0));
        let lats = distinct_sorted(points.iter().map(|p| p.1));

        let mut values = Array2::from_elem((lons.len(), lats.len()), f64::NAN);
        for &(lon, lat, elevation) in points {
            let i = axis_position(&lons, lon)?;
            let j = axis_position(&lats, lat)?;
            values[[i, j]] = elevation;
        }

        Self::new(lons, lats, values)
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Elevation of the nearest valid node
    pub fn nearest(&self, lon: f64, lat: f64) -> Option<f64> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        self.nodes.nearest_neighbor(&[lon, lat]).map(|node| node.data)
    }

    /// Bilinear interpolation, NaN outside the axes or next to a nodata cell
    pub fn bilinear(&self, lon: f64, lat: f64) -> f64 {
        let Some((i, tx)) = bracket(&self.lons, lon) else {
            return f64::NAN;
        };
        let Some((j, ty)) = bracket(&self.lats, lat) else {
            return f64::NAN;
        };

        let i1 = (i + 1).min(self.lons.len() - 1);
        let j1 = (j + 1).min(self.lats.len() - 1);

        let corners = [
            (self.values[[i, j]], (1.0 - tx) * (1.0 - ty)),
            (self.values[[i1, j]], tx * (1.0 - ty)),
            (self.values[[i, j1]], (1.0 - tx) * ty),
            (self.values[[i1, j1]], tx * ty),
        ];

        // Zero-weight corners do not contribute, so nodata only spreads into its own cells
        corners
            .iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(value, weight)| value * weight)
            .sum()
    }
}

fn is_nodata(value: f64) -> bool {
    !value.is_finite() || value <= ELEVATION_NODATA
}

fn check_axis(name: &str, axis: &[f64]) -> Result<()> {
    if axis.is_empty() {
        return Err(Error::data_validation(format!("Elevation {} axis is empty", name)));
    }
    if axis.iter().any(|v| !v.is_finite()) || axis.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::data_validation(format!(
            "Elevation {} axis must be finite and strictly ascending",
            name
        )));
    }
    Ok(())
}

fn distinct_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted
}

fn axis_position(axis: &[f64], value: f64) -> Result<usize> {
    axis.binary_search_by(|probe| probe.partial_cmp(&value).unwrap_or(Ordering::Less))
        .map_err(|_| Error::data_validation(format!("Non-finite elevation coordinate {}", value)))
}

/// Lower cell index and fractional offset of `value` on an ascending axis
fn bracket(axis: &[f64], value: f64) -> Option<(usize, f64)> {
    let first = *axis.first()?;
    let last = *axis.last()?;
    if !value.is_finite() || value < first || value > last {
        return None;
    }
    if axis.len() == 1 {
        return Some((0, 0.0));
    }

    let upper = axis.partition_point(|&v| v <= value).min(axis.len() - 1);
    let lower = upper - 1;
    let span = axis[upper] - axis[lower];
    Some((lower, ((value - axis[lower]) / span).clamp(0.0, 1.0)))
}
