//! Region boundary as a (multi)polygon with point-in-polygon tests

use crate::{Error, Result};
use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Rect};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonObject {
    FeatureCollection { features: Vec<Feature> },
    Feature(Feature),
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Unsupported,
}

/// Region the temperature map is restricted to
///
/// Each polygon keeps its own bounding box so point tests can skip the
/// exact containment check for most cells.
#[derive(Debug, Clone)]
pub struct RegionBoundary {
    polygons: Vec<(Polygon<f64>, Rect<f64>)>,
    bounds: Rect<f64>,
}

impl RegionBoundary {
    /// Build a boundary from polygons
    ///
    /// # Errors
    ///
    /// `DataValidation` when no polygon has a non-empty exterior.
    pub fn new(polygons: Vec<Polygon<f64>>) -> Result<Self> {
        let polygons: Vec<(Polygon<f64>, Rect<f64>)> = polygons
            .into_iter()
            .filter_map(|polygon| polygon.bounding_rect().map(|rect| (polygon, rect)))
            .collect();

        let bounds = MultiPolygon::new(polygons.iter().map(|(p, _)| p.clone()).collect())
            .bounding_rect()
            .ok_or_else(|| Error::data_validation("Region boundary has no polygons"))?;

        Ok(Self { polygons, bounds })
    }

    /// Axis-aligned rectangle from (x_min, y_min) to (x_max, y_max)
    pub fn rectangle(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<Self> {
        let exterior = LineString::from(vec![
            (x_min, y_min),
            (x_max, y_min),
            (x_max, y_max),
            (x_min, y_max),
            (x_min, y_min),
        ]);
        Self::new(vec![Polygon::new(exterior, Vec::new())])
    }

    /// Parse a GeoJSON document holding Polygon or MultiPolygon geometries
    ///
    /// Accepts a bare geometry, a Feature or a FeatureCollection. Features with
    /// other geometry types are skipped.
    pub fn from_geojson_str(content: &str) -> Result<Self> {
        let object: GeoJsonObject = serde_json::from_str(content)
            .map_err(|e| Error::json("Invalid region boundary GeoJSON", e))?;

        let mut polygons = Vec::new();
        match object {
            GeoJsonObject::FeatureCollection { features } => {
                for feature in features {
                    collect_feature(feature, &mut polygons)?;
                }
            }
            GeoJsonObject::Feature(feature) => collect_feature(feature, &mut polygons)?,
            GeoJsonObject::Polygon { coordinates } => polygons.push(to_polygon(&coordinates)?),
            GeoJsonObject::MultiPolygon { coordinates } => {
                for polygon in &coordinates {
                    polygons.push(to_polygon(polygon)?);
                }
            }
        }

        Self::new(polygons)
    }

    /// Bounding box of all polygons
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// True when (x, y) lies strictly inside any polygon
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let point = Point::new(x, y);
        self.polygons.iter().any(|(polygon, rect)| {
            x > rect.min().x
                && x < rect.max().x
                && y > rect.min().y
                && y < rect.max().y
                && polygon.contains(&point)
        })
    }
}

fn collect_feature(feature: Feature, polygons: &mut Vec<Polygon<f64>>) -> Result<()> {
    match feature.geometry {
        Some(Geometry::Polygon { coordinates }) => polygons.push(to_polygon(&coordinates)?),
        Some(Geometry::MultiPolygon { coordinates }) => {
            for polygon in &coordinates {
                polygons.push(to_polygon(polygon)?);
            }
        }
        Some(Geometry::Unsupported) | None => {}
    }
    Ok(())
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| to_ring(ring));
    let exterior = rings
        .next()
        .ok_or_else(|| Error::data_validation("Polygon without exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn to_ring(positions: &[Vec<f64>]) -> Result<LineString<f64>> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(Error::data_validation(
                "GeoJSON position needs at least two coordinates",
            )),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}
