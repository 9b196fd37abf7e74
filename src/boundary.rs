use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fs;
use std::path::Path;

use geo::{Centroid, Coord, Geometry, MapCoords, MultiPolygon};
use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use tracing::{info, warn};

use crate::error::AtlasError;
use crate::normalize::normalize_key;
use crate::schema::boundary;

const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Municipal polygon geometries for one state, indexed by normalized name.
///
/// Lookups never fail: a name that is not in the dataset yields `None` so the
/// query path degrades to an empty map instead of crashing.
pub struct BoundaryRepository {
    geometries: HashMap<String, MultiPolygon<f64>>,
}

impl BoundaryRepository {
    /// Load a GeoJSON FeatureCollection of municipal boundaries, keeping only
    /// features whose state-entity code matches `entity_code`.
    ///
    /// Names are normalized with the same folding as the facility and
    /// population tables; that agreement is what makes cross-table lookups
    /// work at all. A municipality appearing twice is a validation error.
    pub fn load(path: &Path, entity_code: &str) -> Result<Self, AtlasError> {
        let contents = fs::read_to_string(path)?;
        let collection = match contents.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(AtlasError::InvalidData(
                    "boundary dataset must be a GeoJSON FeatureCollection".to_string(),
                ))
            }
        };

        let mut geometries = HashMap::new();
        for feature in collection.features {
            let props = feature.properties.as_ref().ok_or_else(|| {
                AtlasError::InvalidData("boundary feature has no properties".to_string())
            })?;

            match property_string(props, boundary::CVE_ENT) {
                Some(code) if code == entity_code => {}
                Some(_) => continue,
                None => return Err(AtlasError::MissingColumn(boundary::CVE_ENT.to_string())),
            }

            let name = property_string(props, boundary::NOM_MUN)
                .ok_or_else(|| AtlasError::MissingColumn(boundary::NOM_MUN.to_string()))?;
            let key = normalize_key(&name)?;

            let geometry = feature.geometry.ok_or_else(|| {
                AtlasError::InvalidData(format!("boundary feature '{name}' has no geometry"))
            })?;
            let geometry: Geometry<f64> = geometry.value.try_into()?;
            let polygons = match geometry {
                Geometry::Polygon(p) => MultiPolygon(vec![p]),
                Geometry::MultiPolygon(mp) => mp,
                other => {
                    return Err(AtlasError::InvalidData(format!(
                        "boundary feature '{name}' is not a polygon: {other:?}"
                    )))
                }
            };

            if geometries.insert(key.clone(), polygons).is_some() {
                return Err(AtlasError::Validation(format!(
                    "duplicate boundary for municipality '{key}'"
                )));
            }
        }

        info!(municipalities = geometries.len(), entity_code, "boundary dataset loaded");
        Ok(Self { geometries })
    }

    /// Raw polygon geometry for a municipality, or `None` on lookup miss.
    pub fn geometry_for(&self, municipality: &str) -> Option<&MultiPolygon<f64>> {
        let key = normalize_key(municipality).ok()?;
        self.geometries.get(&key)
    }

    /// The municipality boundary as a GeoJSON feature carrying its normalized
    /// name, the interchange shape consumed by the map layer.
    pub fn boundary_for(&self, municipality: &str) -> Option<Feature> {
        let key = normalize_key(municipality).ok()?;
        let geometry = self.geometries.get(&key)?;

        let mut properties = JsonObject::new();
        properties.insert(
            boundary::NOM_MUN.to_string(),
            JsonValue::String(key),
        );

        Some(Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        })
    }

    /// Map-centering point for a municipality as `(lat, lon)`.
    ///
    /// The centroid is computed in a projected metric plane and reprojected
    /// to geographic coordinates; taking it directly in lon/lat space gives a
    /// biased point.
    pub fn centroid_for(&self, municipality: &str) -> Option<(f64, f64)> {
        let geometry = self.geometry_for(municipality)?;
        let projected = geometry.map_coords(to_mercator);
        let centroid = projected.centroid()?;
        let geographic = centroid.map_coords(from_mercator);
        Some((geographic.y(), geographic.x()))
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

/// Best-effort removal of previously rendered map artifacts (`*.html`).
///
/// Idempotent; failures are logged and never propagated to the caller.
pub fn clean_map_artifacts(dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), %err, "could not scan map artifact directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("html") {
            if let Err(err) = fs::remove_file(&path) {
                warn!(path = %path.display(), %err, "failed to remove stale map artifact");
            }
        }
    }
}

/// Read a property as a string, accepting numeric codes as well.
fn property_string(props: &JsonObject, key: &str) -> Option<String> {
    match props.get(key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Spherical-Mercator forward projection (lon/lat degrees → metres).
fn to_mercator(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: EARTH_RADIUS_M * c.x.to_radians(),
        y: EARTH_RADIUS_M * (FRAC_PI_4 + c.y.to_radians() / 2.0).tan().ln(),
    }
}

/// Spherical-Mercator inverse projection (metres → lon/lat degrees).
fn from_mercator(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (c.x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0 * (c.y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use geo::{Contains, Point};
    use std::io::Write;
    use std::path::PathBuf;

    pub(crate) const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "CVE_ENT": "13", "NOM_MUN": "Pachuca de Soto" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-98.8, 20.0], [-98.7, 20.0], [-98.7, 20.2], [-98.8, 20.2], [-98.8, 20.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "CVE_ENT": "13", "NOM_MUN": "Tulancingo de Bravo" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[-98.4, 20.0], [-98.3, 20.0], [-98.3, 20.1], [-98.4, 20.1], [-98.4, 20.0]]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "CVE_ENT": "13", "NOM_MUN": "Huasca de Ocampo" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-98.9, 19.9], [-98.5, 19.9], [-98.5, 20.1], [-98.7, 20.1], [-98.7, 20.3], [-98.9, 20.3], [-98.9, 19.9]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "CVE_ENT": "15", "NOM_MUN": "Otro Estado" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-99.8, 19.0], [-99.7, 19.0], [-99.7, 19.1], [-99.8, 19.1], [-99.8, 19.0]]]
                }
            }
        ]
    }"#;

    pub(crate) fn write_boundaries(dir: &Path) -> PathBuf {
        let path = dir.join("municipios.geojson");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(BOUNDARIES.as_bytes()).unwrap();
        path
    }

    fn repo() -> (tempfile::TempDir, BoundaryRepository) {
        crate::testutil::init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = write_boundaries(dir.path());
        let repo = BoundaryRepository::load(&path, "13").unwrap();
        (dir, repo)
    }

    #[test]
    fn filters_to_the_configured_entity() {
        let (_dir, repo) = repo();
        assert_eq!(repo.len(), 3);
        assert!(repo.geometry_for("Otro Estado").is_none());
    }

    #[test]
    fn lookup_accepts_unnormalized_names() {
        let (_dir, repo) = repo();
        assert!(repo.geometry_for("Pachuca de Soto").is_some());
        assert!(repo.geometry_for("PACHUCA DE SOTO").is_some());
    }

    #[test]
    fn lookup_miss_is_none_not_an_error() {
        let (_dir, repo) = repo();
        assert!(repo.boundary_for("NONEXISTENT").is_none());
        assert!(repo.centroid_for("NONEXISTENT").is_none());
        assert!(repo.geometry_for("").is_none());
    }

    #[test]
    fn boundary_feature_carries_name_and_geometry() {
        let (_dir, repo) = repo();
        let feature = repo.boundary_for("Tulancingo de Bravo").unwrap();
        let props = feature.properties.unwrap();
        assert_eq!(
            props.get(boundary::NOM_MUN).and_then(|v| v.as_str()),
            Some("TULANCINGO DE BRAVO")
        );
        assert!(feature.geometry.is_some());
    }

    #[test]
    fn centroid_falls_inside_its_own_polygon() {
        let (_dir, repo) = repo();
        // Huasca is L-shaped: its bounding-box center lies outside the
        // polygon, so only a real area centroid passes here.
        for name in ["PACHUCA DE SOTO", "TULANCINGO DE BRAVO", "HUASCA DE OCAMPO"] {
            let (lat, lon) = repo.centroid_for(name).unwrap();
            let polygon = repo.geometry_for(name).unwrap();
            assert!(
                polygon.contains(&Point::new(lon, lat)),
                "centroid of {name} outside its boundary"
            );
        }
    }

    #[test]
    fn concave_centroid_avoids_the_notch() {
        let (_dir, repo) = repo();
        let (lat, lon) = repo.centroid_for("HUASCA DE OCAMPO").unwrap();
        // The notch is the quadrant lon > -98.7, lat > 20.1.
        assert!(!(lon > -98.7 && lat > 20.1));
        assert!((19.9..20.3).contains(&lat));
        assert!((-98.9..-98.5).contains(&lon));
    }

    #[test]
    fn mercator_round_trips() {
        let original = Coord { x: -98.73, y: 20.12 };
        let back = from_mercator(to_mercator(original));
        assert!((back.x - original.x).abs() < 1e-9);
        assert!((back.y - original.y).abs() < 1e-9);
    }

    #[test]
    fn artifact_cleanup_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mapa_20.1_-98.7.html"), "<html></html>").unwrap();
        std::fs::write(dir.path().join("keep.geojson"), "{}").unwrap();

        clean_map_artifacts(dir.path());
        assert!(!dir.path().join("mapa_20.1_-98.7.html").exists());
        assert!(dir.path().join("keep.geojson").exists());

        // Missing directory is not an error.
        clean_map_artifacts(&dir.path().join("no-such-dir"));
    }
}
