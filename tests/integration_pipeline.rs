//! Integration tests for the extraction pipeline
//!
//! These tests drive the public API end to end: a GeoJSON boundary on disk,
//! an in-memory gridded dataset, and the files written for SWAT.

use chrono::NaiveDate;
use ndarray::Array3;
use std::fs;
use std::path::Path;
use swat_weather::processor::discovery::DatasetDiscovery;
use swat_weather::{
    BatchProcessor, Boundary, DataCategory, DatasetProcessor, DateWindow, ExtractError,
    ExtractionConfig, MemoryGrid,
};
use tempfile::TempDir;

/// Two-feature watershed: one square over four cells, one sliver over a fifth
const WATERSHED: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"name": "upper"},
         "geometry": {"type": "Polygon",
                      "coordinates": [[[77.0, 12.0], [77.5, 12.0], [77.5, 12.5], [77.0, 12.5], [77.0, 12.0]]]}},
        {"type": "Feature", "properties": {"name": "outlet"},
         "geometry": {"type": "MultiPolygon",
                      "coordinates": [[[[78.05, 12.05], [78.1, 12.05], [78.1, 12.1], [78.05, 12.1], [78.05, 12.05]]]]}}
    ]
}"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write_boundary(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("watershed.geojson");
    fs::write(&path, WATERSHED).unwrap();
    path
}

/// 0.25° daily rainfall grid over 76.5–78.5°E, 11.5–13.0°N
fn rainfall_grid() -> MemoryGrid {
    let lats: Vec<f64> = (0..7).map(|k| 11.625 + 0.25 * k as f64).collect();
    let lons: Vec<f64> = (0..8).map(|k| 76.625 + 0.25 * k as f64).collect();
    let values = Array3::from_shape_fn((31, lats.len(), lons.len()), |(t, i, j)| {
        (t as f64) * 0.5 + (i * lons.len() + j) as f64 * 0.01
    });
    MemoryGrid::daily("IMD_rainfall_1990", date(1990, 1, 1), 31, lats, lons)
        .with_variable("rf", values)
        .unwrap()
}

#[test]
fn test_watershed_extraction() {
    let temp_dir = TempDir::new().unwrap();
    let boundary = Boundary::from_geojson_path(&write_boundary(temp_dir.path())).unwrap();
    let source = rainfall_grid();
    let output = temp_dir.path().join("File_1_IMD_rainfall_1990");

    let stats = DatasetProcessor::new(
        &source,
        &boundary,
        DateWindow::new(date(1990, 1, 1), date(1990, 1, 10)).unwrap(),
        DataCategory::Rainfall,
        &output,
    )
    .process()
    .unwrap();

    // cells centred 77.125/77.375 x 12.125/12.375 plus the outlet cell at 78.125, 12.125
    assert_eq!(stats.stations_created, 5);
    assert_eq!(stats.timesteps, 10);

    let registry = fs::read_to_string(output.join("RAINFALL_station.csv")).unwrap();
    let rows: Vec<&str> = registry.lines().collect();
    assert_eq!(rows[0], "ID,station_names,Lat,Lon");
    assert_eq!(rows.len(), 6);
    assert!(rows[1].starts_with("1,RAINFALL1,12.125,77.125"));
    assert!(rows[5].starts_with("5,RAINFALL5,12.375,77.375"));

    let record = fs::read_to_string(output.join("RAINFALL1.csv")).unwrap();
    let lines: Vec<&str> = record.lines().collect();
    assert_eq!(lines[0], "19900101");
    assert_eq!(lines.len(), 11);
    assert!(!record.contains('e'));
}

#[test]
fn test_missing_boundary_file() {
    let err = Boundary::from_geojson_path(Path::new("/nonexistent/watershed.geojson")).unwrap_err();
    assert!(err.is_fatal_for_batch());
}

#[test]
fn test_boundary_without_polygons() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gauges.geojson");
    fs::write(
        &path,
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [77.1, 12.1]}}
        ]}"#,
    )
    .unwrap();

    match Boundary::from_geojson_path(&path).unwrap_err() {
        ExtractError::InvalidBoundary { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("Expected InvalidBoundary error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_batch_over_directory() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("grids");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("tmax_1990.nc"), b"placeholder").unwrap();
    fs::write(input.join("readme.txt"), b"not a dataset").unwrap();

    let datasets = DatasetDiscovery::new(&input).discover().unwrap();
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].category, DataCategory::Temperature);

    let boundary = Boundary::from_geojson_path(&write_boundary(temp_dir.path())).unwrap();
    let output = temp_dir.path().join("out");
    let batch = BatchProcessor::new(
        boundary,
        DateWindow::new(date(1990, 1, 1), date(1990, 1, 31)).unwrap(),
        &output,
    )
    .with_config(ExtractionConfig::default());

    // the placeholder is not readable gridded data; the batch reports it and carries on
    let stats = batch.run(datasets).await.unwrap();
    assert_eq!(stats.datasets_processed(), 0);
    assert_eq!(stats.datasets_failed(), 1);
    assert!(!output.join("File_1_tmax_1990").join("TEMPERATURE_station.csv").exists());
}
