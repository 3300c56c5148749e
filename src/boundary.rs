//! Study-area boundary geometry.
//!
//! A [`Boundary`] is a read-only multipolygon. It can be loaded from GeoJSON
//! (a bare geometry, a feature, or a feature collection) and answers the two
//! questions the pipeline asks: its bounding box, and how much of an arbitrary
//! polygon it covers.

use crate::error::{ExtractError, Result};
use crate::models::BoundingBox;
use geo::{Area, BooleanOps, BoundingRect, Geometry, MultiPolygon, Polygon};
use geojson::GeoJson;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Study-area boundary, possibly made of several features
#[derive(Debug, Clone)]
pub struct Boundary {
    geometry: MultiPolygon<f64>,
    feature_count: usize,
}

impl Boundary {
    pub fn new(geometry: MultiPolygon<f64>) -> Self {
        let feature_count = geometry.0.len();
        Self {
            geometry,
            feature_count,
        }
    }

    /// Load a GeoJSON file
    pub fn from_geojson_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ExtractError::BoundaryNotFound {
                path: path.to_path_buf(),
            });
        }

        let text = fs::read_to_string(path)?;
        let boundary = Self::from_geojson_str(&text).map_err(|e| match e {
            ExtractError::InvalidBoundary { reason, .. } => ExtractError::InvalidBoundary {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        info!(
            "Boundary loaded from {}: {} features, {} polygons",
            path.display(),
            boundary.feature_count,
            boundary.geometry.0.len()
        );
        Ok(boundary)
    }

    /// Parse GeoJSON text; every Polygon and MultiPolygon found is kept
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let geojson: GeoJson = text.parse()?;

        let geometries: Vec<geojson::Geometry> = match geojson {
            GeoJson::Geometry(geometry) => vec![geometry],
            GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .filter_map(|f| f.geometry)
                .collect(),
        };
        let feature_count = geometries.len();

        let mut polygons = Vec::new();
        for geometry in geometries {
            let geometry: Geometry<f64> = geometry.try_into()?;
            collect_polygons(geometry, &mut polygons);
        }

        if polygons.is_empty() {
            return Err(ExtractError::InvalidBoundary {
                path: "<geojson>".into(),
                reason: "no polygon geometry found".to_string(),
            });
        }

        debug!("Parsed {} boundary polygons", polygons.len());
        Ok(Self {
            geometry: MultiPolygon::new(polygons),
            feature_count,
        })
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Bounding box over all features
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geometry
            .bounding_rect()
            .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }

    /// Bounding box, or `InvalidBoundary` when the boundary has no polygons
    pub fn extent(&self) -> Result<BoundingBox> {
        self.bounding_box()
            .ok_or_else(|| ExtractError::InvalidBoundary {
                path: "<boundary>".into(),
                reason: "boundary has no extent".to_string(),
            })
    }

    /// Planar area of `polygon ∩ boundary`; zero when they only touch
    pub fn intersection_area(&self, polygon: &Polygon<f64>) -> f64 {
        let clip = MultiPolygon::new(vec![polygon.clone()]);
        clip.intersection(&self.geometry).unsigned_area()
    }
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp.0),
        Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}
