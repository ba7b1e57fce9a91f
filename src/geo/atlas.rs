//! GeoJSON atlas of US state boundaries.
//!
//! Loads the standard `us-states.json` FeatureCollection into flat ring
//! lists keyed by state name. Only the two geometry types that file uses
//! are modeled; anything else is rejected at parse time.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Properties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Properties {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum Geometry {
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

/// Boundary of one state: closed rings of (longitude, latitude) points.
#[derive(Debug, Clone)]
pub struct StateShape {
    pub name: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

impl StateShape {
    /// Bounding box over every ring point.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds: Option<Bounds> = None;
        for ring in &self.rings {
            for &(lon, lat) in ring {
                match bounds.as_mut() {
                    Some(b) => b.expand(lon, lat),
                    None => bounds = Some(Bounds::point(lon, lat)),
                }
            }
        }
        bounds
    }
}

/// Lon/lat bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// A degenerate box around a single point.
    pub fn point(lon: f64, lat: f64) -> Self {
        Self {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    /// Grows the box to include a point.
    pub fn expand(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
    }

    /// Merges another box into this one.
    pub fn merge(&mut self, other: &Bounds) {
        self.expand(other.min_lon, other.min_lat);
        self.expand(other.max_lon, other.max_lat);
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

/// Parsed atlas with name-based lookup.
#[derive(Debug, Clone)]
pub struct StateAtlas {
    shapes: Vec<StateShape>,
    index: HashMap<String, usize>,
}

impl StateAtlas {
    /// Loads and parses a GeoJSON atlas file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read atlas file: {}", path.display()))?;
        let collection: FeatureCollection = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse atlas file: {}", path.display()))?;

        let mut shapes = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let rings = match feature.geometry {
                Geometry::Polygon(polygon) => convert_rings(&feature.properties.name, polygon)?,
                Geometry::MultiPolygon(polygons) => {
                    let mut rings = Vec::new();
                    for polygon in polygons {
                        rings.extend(convert_rings(&feature.properties.name, polygon)?);
                    }
                    rings
                }
            };
            shapes.push(StateShape {
                name: feature.properties.name,
                rings,
            });
        }

        let index = shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| (shape.name.clone(), i))
            .collect();

        Ok(Self { shapes, index })
    }

    /// Looks up a state's boundary by display name.
    pub fn get(&self, name: &str) -> Option<&StateShape> {
        self.index.get(name).map(|&i| &self.shapes[i])
    }

    /// All boundaries in file order.
    pub fn shapes(&self) -> &[StateShape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Bounding box over the states the filter accepts.
    pub fn bounds_where<F>(&self, include: F) -> Option<Bounds>
    where
        F: Fn(&str) -> bool,
    {
        let mut bounds: Option<Bounds> = None;
        for shape in &self.shapes {
            if !include(&shape.name) {
                continue;
            }
            if let Some(shape_bounds) = shape.bounds() {
                match bounds.as_mut() {
                    Some(b) => b.merge(&shape_bounds),
                    None => bounds = Some(shape_bounds),
                }
            }
        }
        bounds
    }
}

fn convert_rings(name: &str, polygon: Vec<Vec<Vec<f64>>>) -> Result<Vec<Vec<(f64, f64)>>> {
    let mut rings = Vec::with_capacity(polygon.len());
    for ring in polygon {
        let mut points = Vec::with_capacity(ring.len());
        for position in ring {
            if position.len() < 2 {
                bail!("Atlas geometry for {} has a position with fewer than 2 ordinates", name);
            }
            points.push((position[0], position[1]));
        }
        rings.push(points);
    }
    Ok(rings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "01",
                "properties": {"name": "Alabama"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-87.3, 35.0], [-85.6, 35.0], [-85.2, 32.9], [-87.3, 35.0]]]
                }
            },
            {
                "type": "Feature",
                "id": "02",
                "properties": {"name": "Alaska"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[-153.0, 57.4], [-152.5, 57.2], [-154.0, 56.7], [-153.0, 57.4]]],
                        [[[-166.5, 53.7], [-166.2, 53.4], [-167.1, 53.3], [-166.5, 53.7]]]
                    ]
                }
            }
        ]
    }"#;

    fn sample_atlas() -> StateAtlas {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        StateAtlas::load(file.path()).unwrap()
    }

    #[test]
    fn test_load_polygon_and_multipolygon() {
        let atlas = sample_atlas();
        assert_eq!(atlas.len(), 2);

        let alabama = atlas.get("Alabama").unwrap();
        assert_eq!(alabama.rings.len(), 1);
        assert_eq!(alabama.rings[0].len(), 4);
        assert_eq!(alabama.rings[0][0], (-87.3, 35.0));

        // Both Alaska polygons flatten into one ring list.
        let alaska = atlas.get("Alaska").unwrap();
        assert_eq!(alaska.rings.len(), 2);

        assert!(atlas.get("Atlantis").is_none());
    }

    #[test]
    fn test_shape_bounds() {
        let atlas = sample_atlas();
        let bounds = atlas.get("Alabama").unwrap().bounds().unwrap();
        assert_eq!(bounds.min_lon, -87.3);
        assert_eq!(bounds.max_lon, -85.2);
        assert_eq!(bounds.min_lat, 32.9);
        assert_eq!(bounds.max_lat, 35.0);
        assert!((bounds.width() - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_where_filters_states() {
        let atlas = sample_atlas();
        let continental = atlas.bounds_where(|name| name != "Alaska").unwrap();
        assert_eq!(continental.min_lon, -87.3);

        let everything = atlas.bounds_where(|_| true).unwrap();
        assert_eq!(everything.min_lon, -167.1);
        assert!(atlas.bounds_where(|_| false).is_none());
    }

    #[test]
    fn test_rejects_malformed_positions() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"type": "FeatureCollection", "features": [{
                "type": "Feature",
                "properties": {"name": "Broken"},
                "geometry": {"type": "Polygon", "coordinates": [[[1.0]]]}
            }]}"#,
        )
        .unwrap();
        assert!(StateAtlas::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = StateAtlas::load(Path::new("/nonexistent/atlas.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read atlas file"));
    }
}
