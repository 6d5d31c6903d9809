//! Neighbourhood residual test
//!
//! Compares each record with the mean temperature of the records around it,
//! using an R-tree over (latitude, longitude) in degrees.

use crate::app::models::EnrichedRecord;
use crate::constants::radius_km_to_degrees;
use rstar::RTree;
use rstar::primitives::GeomWithData;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Outcome of the local test for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalVerdict {
    /// Too few neighbours to judge
    Unevaluated,
    Normal,
    Anomalous,
}

impl LocalVerdict {
    pub fn is_anomalous(self) -> bool {
        self == Self::Anomalous
    }
}

/// Parameters of the local test
#[derive(Debug, Clone, Copy)]
pub struct LocalTest {
    pub residual_threshold: f64,
    pub min_neighbors: usize,
    pub radius_km: f64,
}

impl LocalTest {
    /// Judge every record against its neighbours within the radius
    ///
    /// Neighbours are the other records at distance strictly below
    /// `radius_km / 111` degrees; a record at the same location as another
    /// still counts it. With `min_neighbors == 0` an isolated record is judged
    /// against an undefined mean and comes out `Normal`.
    pub fn evaluate(&self, records: &[EnrichedRecord]) -> Vec<LocalVerdict> {
        let points: Vec<IndexedPoint> = records
            .iter()
            .enumerate()
            .map(|(idx, r)| GeomWithData::new([r.latitude, r.longitude], idx))
            .collect();
        let tree = RTree::bulk_load(points);

        let radius = radius_km_to_degrees(self.radius_km);
        let radius_squared = radius * radius;

        records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let neighbours: Vec<f64> = tree
                    .locate_within_distance([record.latitude, record.longitude], radius_squared)
                    .filter(|point| point.data != idx)
                    .filter(|point| {
                        let [lat, lon] = *point.geom();
                        let d_lat = lat - record.latitude;
                        let d_lon = lon - record.longitude;
                        d_lat * d_lat + d_lon * d_lon < radius_squared
                    })
                    .map(|point| records[point.data].temperature)
                    .collect();

                if neighbours.len() < self.min_neighbors {
                    return LocalVerdict::Unevaluated;
                }

                let local_mean = neighbours.iter().sum::<f64>() / neighbours.len() as f64;
                if (record.temperature - local_mean).abs() > self.residual_threshold {
                    LocalVerdict::Anomalous
                } else {
                    LocalVerdict::Normal
                }
            })
            .collect()
    }
}
