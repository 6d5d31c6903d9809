//! Variogram families and their least-squares fit
//!
//! The experimental semivariogram bins half squared differences of all sample
//! pairs into equal-width lag classes. Model parameters are then fitted by a
//! range search; for each candidate range nugget and partial sill follow from
//! a non-negative linear least-squares solve.
//!
//! Model forms (h = lag, a = range, c0 = nugget, c = partial sill):
//! - spherical: c0 + c (1.5 h/a - 0.5 (h/a)^3) for h < a, c0 + c beyond
//! - exponential: c0 + c (1 - exp(-3 h/a))
//! - gaussian: c0 + c (1 - exp(-3 (h/a)^2))
//! - linear: c0 + c h
//!
//! All families return 0 at zero lag.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Lags below this are treated as coincident
pub const ZERO_LAG: f64 = 1e-10;

/// Candidate ranges tried by the fit
const RANGE_CANDIDATES: usize = 60;

/// Variogram family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariogramModel {
    #[default]
    Spherical,
    Exponential,
    Gaussian,
    Linear,
}

impl VariogramModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spherical => "spherical",
            Self::Exponential => "exponential",
            Self::Gaussian => "gaussian",
            Self::Linear => "linear",
        }
    }

    /// Unit-sill shape of the family at lag `h`
    fn shape(self, h: f64, range: f64) -> f64 {
        match self {
            Self::Spherical => {
                if h >= range {
                    1.0
                } else {
                    let ratio = h / range;
                    1.5 * ratio - 0.5 * ratio.powi(3)
                }
            }
            Self::Exponential => 1.0 - (-3.0 * h / range).exp(),
            Self::Gaussian => 1.0 - (-3.0 * (h / range).powi(2)).exp(),
            Self::Linear => h,
        }
    }
}

impl FromStr for VariogramModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spherical" => Ok(Self::Spherical),
            "exponential" => Ok(Self::Exponential),
            "gaussian" => Ok(Self::Gaussian),
            "linear" => Ok(Self::Linear),
            other => Err(Error::configuration(format!(
                "Unknown variogram model '{}', expected spherical, exponential, gaussian or linear",
                other
            ))),
        }
    }
}

impl fmt::Display for VariogramModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bin of the experimental semivariogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagBin {
    /// Mean pair distance in the bin
    pub lag: f64,
    /// Mean half squared difference in the bin
    pub semivariance: f64,
    pub pairs: usize,
}

/// Experimental semivariogram over `n_lags` equal-width classes between the
/// smallest and largest pair distance; empty classes are dropped
pub fn experimental_semivariogram(coords: &[[f64; 2]], values: &[f64], n_lags: usize) -> Vec<LagBin> {
    let n = coords.len().min(values.len());
    if n < 2 || n_lags == 0 {
        return Vec::new();
    }

    let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = coords[i][0] - coords[j][0];
            let dy = coords[i][1] - coords[j][1];
            pairs.push(((dx * dx + dy * dy).sqrt(), 0.5 * (values[i] - values[j]).powi(2)));
        }
    }

    let d_min = pairs.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let d_max = pairs.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let width = (d_max - d_min) / n_lags as f64;

    let mut sums = vec![(0.0, 0.0, 0usize); n_lags];
    for (distance, semivariance) in pairs {
        let bin = if width > 0.0 {
            (((distance - d_min) / width) as usize).min(n_lags - 1)
        } else {
            0
        };
        sums[bin].0 += distance;
        sums[bin].1 += semivariance;
        sums[bin].2 += 1;
    }

    sums.into_iter()
        .filter(|(_, _, count)| *count > 0)
        .map(|(distance, semivariance, count)| LagBin {
            lag: distance / count as f64,
            semivariance: semivariance / count as f64,
            pairs: count,
        })
        .collect()
}

/// Variogram family with fitted parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedVariogram {
    pub model: VariogramModel,
    pub nugget: f64,
    /// Partial sill, or the slope for the linear family
    pub psill: f64,
    /// Range, unused by the linear family
    pub range: f64,
}

impl FittedVariogram {
    /// Semivariance at lag `h`
    pub fn gamma(&self, h: f64) -> f64 {
        if h < ZERO_LAG {
            return 0.0;
        }
        self.nugget + self.psill * self.model.shape(h, self.range)
    }

    /// Fit the family to the samples
    ///
    /// Falls back to zero nugget, the sample variance as sill and the largest
    /// pair distance as range when fewer than two lag classes are populated.
    pub fn fit(model: VariogramModel, coords: &[[f64; 2]], values: &[f64], n_lags: usize) -> Self {
        let bins = experimental_semivariogram(coords, values, n_lags);
        if bins.len() < 2 {
            let fitted = Self::fallback(model, coords, values);
            debug!("Variogram fallback parameters: {:?}", fitted);
            return fitted;
        }

        let fitted = match model {
            VariogramModel::Linear => {
                let (nugget, psill, _) = fit_nonnegative(&bins, |h| h);
                Self {
                    model,
                    nugget,
                    psill,
                    range: bins.last().map(|b| b.lag).unwrap_or(1.0),
                }
            }
            _ => {
                let max_lag = bins.iter().map(|b| b.lag).fold(0.0, f64::max);
                (1..=RANGE_CANDIDATES)
                    .map(|k| max_lag * k as f64 / RANGE_CANDIDATES as f64)
                    .filter(|range| *range > 0.0)
                    .map(|range| {
                        let (nugget, psill, sse) = fit_nonnegative(&bins, |h| model.shape(h, range));
                        (
                            Self {
                                model,
                                nugget,
                                psill,
                                range,
                            },
                            sse,
                        )
                    })
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(fitted, _)| fitted)
                    .unwrap_or_else(|| Self::fallback(model, coords, values))
            }
        };

        debug!(
            "Fitted {} variogram: nugget={:.4} psill={:.4} range={:.4} from {} lag classes",
            fitted.model,
            fitted.nugget,
            fitted.psill,
            fitted.range,
            bins.len()
        );
        fitted
    }

    fn fallback(model: VariogramModel, coords: &[[f64; 2]], values: &[f64]) -> Self {
        let n = values.len();
        let variance = if n > 1 {
            let mean = values.iter().sum::<f64>() / n as f64;
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64
        } else {
            0.0
        };
        let sill = if variance > 0.0 { variance } else { 1.0 };

        let mut max_distance: f64 = 0.0;
        for (i, a) in coords.iter().enumerate() {
            for b in &coords[i + 1..] {
                max_distance = max_distance.max(((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt());
            }
        }
        let range = if max_distance > 0.0 { max_distance } else { 1.0 };

        let psill = match model {
            VariogramModel::Linear => sill / range,
            _ => sill,
        };

        Self {
            model,
            nugget: 0.0,
            psill,
            range,
        }
    }
}

/// Minimise sum((c0 + c f(h) - gamma)^2) subject to c0, c >= 0
///
/// Returns (c0, c, sse).
fn fit_nonnegative(bins: &[LagBin], basis: impl Fn(f64) -> f64) -> (f64, f64, f64) {
    let fs: Vec<f64> = bins.iter().map(|b| basis(b.lag)).collect();
    let gs: Vec<f64> = bins.iter().map(|b| b.semivariance).collect();
    let n = bins.len() as f64;

    let sse = |c0: f64, c: f64| -> f64 {
        fs.iter()
            .zip(&gs)
            .map(|(f, g)| (c0 + c * f - g).powi(2))
            .sum()
    };

    let sf: f64 = fs.iter().sum();
    let sg: f64 = gs.iter().sum();
    let sff: f64 = fs.iter().map(|f| f * f).sum();
    let sfg: f64 = fs.iter().zip(&gs).map(|(f, g)| f * g).sum();

    let mut candidates = Vec::with_capacity(3);

    let det = n * sff - sf * sf;
    if det.abs() > f64::EPSILON {
        let c = (n * sfg - sf * sg) / det;
        let c0 = (sg - c * sf) / n;
        if c >= 0.0 && c0 >= 0.0 {
            candidates.push((c0, c));
        }
    }
    // Boundary solutions with one parameter pinned at zero
    if sff > 0.0 {
        candidates.push((0.0, (sfg / sff).max(0.0)));
    }
    candidates.push(((sg / n).max(0.0), 0.0));

    candidates
        .into_iter()
        .map(|(c0, c)| (c0, c, sse(c0, c)))
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .unwrap_or((0.0, 0.0, f64::INFINITY))
}
