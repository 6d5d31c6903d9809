//! Spatial interpolation by regression kriging
//!
//! Predicted per-site temperatures are turned into a dense field over the
//! region:
//!
//! 1. A regular mesh spans the boundary's bounding box ([`grid`]) and is
//!    masked by the boundary polygons ([`region`])
//! 2. Elevation is interpolated bilinearly at samples and grid cells
//! 3. A trend regression of temperature on elevation is fitted ([`regression`])
//! 4. Its residuals are ordinary-kriged with a fitted variogram ([`variogram`],
//!    [`kriging`]) in a moving neighbourhood
//! 5. Each interior cell gets trend plus kriged residual ([`model`],
//!    [`interpolator`]); exterior cells hold the missing-value sentinel

pub mod grid;
pub mod interpolator;
pub mod kriging;
pub mod model;
pub mod region;
pub mod regression;
pub mod variogram;

#[cfg(test)]
pub mod tests;

pub use grid::RegionGrid;
pub use interpolator::{SpatialInterpolator, interpolate};
pub use kriging::OrdinaryKriging;
pub use model::InterpolationModel;
pub use region::RegionBoundary;
pub use regression::{RegressionKind, TrendModel};
pub use variogram::{FittedVariogram, VariogramModel};
