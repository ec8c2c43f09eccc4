//! Variable eligibility and per-file failure isolation.

use super::{builder_for, read_lines, write_grid_file};
use crate::extract::BatchTextExtractor;
use crate::progress::{CancellationToken, NullSink};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Like the standard grid fixture, plus a rank-2 variable and a rank-3
/// variable whose shape disagrees with `sst`.
fn write_mixed_file(path: &Path) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", 2).unwrap();
    file.add_dimension("lat", 2).unwrap();
    file.add_dimension("lon", 2).unwrap();
    file.add_dimension("depth", 3).unwrap();

    let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
    time.put_values(&[0.0f64, 1.0], ..).unwrap();
    let mut lat = file.add_variable::<f64>("lat", &["lat"]).unwrap();
    lat.put_values(&[10.0f64, 20.0], ..).unwrap();
    let mut lon = file.add_variable::<f64>("lon", &["lon"]).unwrap();
    lon.put_values(&[30.0f64, 40.0], ..).unwrap();

    let mut sst = file
        .add_variable::<f64>("sst", &["time", "lat", "lon"])
        .unwrap();
    sst.put_values(&[1.0f64; 8], ..).unwrap();

    let mut flat = file.add_variable::<f64>("flat", &["lat", "lon"]).unwrap();
    flat.put_values(&[0.0f64; 4], ..).unwrap();

    let mut deep = file
        .add_variable::<f64>("deep", &["time", "lat", "depth"])
        .unwrap();
    deep.put_values(&[0.0f64; 12], ..).unwrap();
}

#[test]
fn test_unknown_variable_selection_skips_the_file() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("grid.nc");
    write_grid_file(&source);

    let mut builder = crate::params::ExtractionParametersBuilder::new();
    builder.add_variable(&source, "nope");
    let params = builder.build().unwrap();
    let report = BatchTextExtractor::new(params)
        .run(&NullSink, &CancellationToken::new())
        .unwrap()
        .into_done()
        .unwrap();

    assert_eq!(report.files_exported, 0);
    assert_eq!(report.files_skipped, 1);
    assert!(report.failures.is_empty());
    assert!(!dir.path().join("grid.txt").exists());
}

#[test]
fn test_ineligible_variables_are_dropped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("mixed.nc");
    write_mixed_file(&source);

    let mut builder = crate::params::ExtractionParametersBuilder::new();
    builder
        .add_variable(&source, "sst")
        .add_variable(&source, "flat")
        .add_variable(&source, "deep");
    let params = builder.build().unwrap();
    let report = BatchTextExtractor::new(params)
        .run(&NullSink, &CancellationToken::new())
        .unwrap()
        .into_done()
        .unwrap();

    assert_eq!(report.files_exported, 1);
    let lines = read_lines(&dir.path().join("mixed.txt"));
    // Only the eligible variable survives; rank-2 and shape-mismatched
    // selections are dropped.
    assert_eq!(lines[0], "time,lat,lon,sst");
    assert_eq!(lines.len(), 9);
}

#[test]
fn test_unreadable_file_is_recorded_and_the_batch_continues() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("broken.nc");
    let good = dir.path().join("good.nc");
    fs::write(&broken, b"this is not netcdf").unwrap();
    write_grid_file(&good);

    let mut builder = builder_for(&broken);
    builder.add_variable(&good, "sst");
    let params = builder.build().unwrap();
    let report = BatchTextExtractor::new(params)
        .run(&NullSink, &CancellationToken::new())
        .unwrap()
        .into_done()
        .unwrap();

    assert_eq!(report.files_exported, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("broken.nc"));
    assert!(dir.path().join("good.txt").exists());
    // The failed source must not leave an empty document behind.
    assert!(!dir.path().join("broken.txt").exists());
}

#[test]
fn test_unreadable_source_preserves_an_existing_output() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("broken.nc");
    fs::write(&broken, b"this is not netcdf").unwrap();
    // Output from an earlier run of the same source.
    let previous = dir.path().join("broken.txt");
    fs::write(&previous, "time,lat,lon,sst\n1970-01-01T00:00:00+00:00,10,30,1\n").unwrap();

    let params = builder_for(&broken).build().unwrap();
    let report = BatchTextExtractor::new(params)
        .run(&NullSink, &CancellationToken::new())
        .unwrap()
        .into_done()
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    // The source is opened before the destination is touched, so the earlier
    // output survives intact.
    let lines = read_lines(&previous);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "time,lat,lon,sst");
}
