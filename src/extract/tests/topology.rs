//! Output topology: per-file documents, the single-document mode and
//! destination handling.

use super::{builder_for, read_lines, write_grid_file};
use crate::error::Error;
use crate::extract::BatchTextExtractor;
use crate::params::ExtractionParametersBuilder;
use crate::progress::{CancellationToken, NullSink};
use tempfile::TempDir;

#[test]
fn test_each_source_gets_its_own_document() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.nc");
    let second = dir.path().join("b.nc");
    write_grid_file(&first);
    write_grid_file(&second);

    let mut builder = builder_for(&first);
    builder.add_variable(&second, "sst");
    let params = builder.build().unwrap();
    let report = BatchTextExtractor::new(params)
        .run(&NullSink, &CancellationToken::new())
        .unwrap()
        .into_done()
        .unwrap();

    assert_eq!(report.files_exported, 2);
    assert_eq!(report.rows_written, 16);
    assert_eq!(report.outputs.len(), 2);
    assert_eq!(read_lines(&dir.path().join("a.txt")).len(), 9);
    assert_eq!(read_lines(&dir.path().join("b.txt")).len(), 9);
}

#[test]
fn test_single_document_concatenates_with_one_header() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.nc");
    let second = dir.path().join("b.nc");
    write_grid_file(&first);
    write_grid_file(&second);

    let mut builder = builder_for(&first);
    builder.add_variable(&second, "sst").single_document(true);
    let params = builder.build().unwrap();
    let report = BatchTextExtractor::new(params)
        .run(&NullSink, &CancellationToken::new())
        .unwrap()
        .into_done()
        .unwrap();

    assert_eq!(report.files_exported, 2);
    assert_eq!(report.outputs.len(), 1);
    // The document is named after the first registered source.
    let lines = read_lines(&dir.path().join("a.txt"));
    assert_eq!(lines.len(), 17);
    assert_eq!(lines[0], "time,lat,lon,sst");
    assert_eq!(
        lines.iter().filter(|line| *line == "time,lat,lon,sst").count(),
        1
    );
    assert!(!dir.path().join("b.txt").exists());
}

#[test]
fn test_single_document_survives_an_unreadable_source() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("broken.nc");
    let good = dir.path().join("good.nc");
    std::fs::write(&broken, b"this is not netcdf").unwrap();
    write_grid_file(&good);

    let mut builder = builder_for(&broken);
    builder.add_variable(&good, "sst").single_document(true);
    let params = builder.build().unwrap();
    let report = BatchTextExtractor::new(params)
        .run(&NullSink, &CancellationToken::new())
        .unwrap()
        .into_done()
        .unwrap();

    assert_eq!(report.files_exported, 1);
    assert_eq!(report.failures.len(), 1);
    // The document is still named after the first registered source, and
    // carries exactly one header.
    let lines = read_lines(&dir.path().join("broken.txt"));
    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0], "time,lat,lon,sst");
}

#[test]
fn test_destination_dir_redirects_output() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let source = dir.path().join("grid.nc");
    write_grid_file(&source);

    let params = builder_for(&source)
        .destination_dir(Some(out.path().to_path_buf()))
        .build()
        .unwrap();
    let report = BatchTextExtractor::new(params)
        .run(&NullSink, &CancellationToken::new())
        .unwrap()
        .into_done()
        .unwrap();

    assert!(out.path().join("grid.txt").exists());
    assert!(!dir.path().join("grid.txt").exists());
    assert_eq!(report.outputs, vec![out.path().join("grid.txt")]);
}

#[test]
fn test_missing_destination_dir_is_rejected_before_any_read() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("grid.nc");
    write_grid_file(&source);

    let params = builder_for(&source)
        .destination_dir(Some(dir.path().join("absent")))
        .build()
        .unwrap();
    let result = BatchTextExtractor::new(params).run(&NullSink, &CancellationToken::new());

    assert!(matches!(
        result,
        Err(Error::DestinationNotADirectory { .. })
    ));
    assert!(!dir.path().join("grid.txt").exists());
}

#[test]
fn test_empty_parameters_are_rejected() {
    let params = ExtractionParametersBuilder::new().build().unwrap();
    let result = BatchTextExtractor::new(params).run(&NullSink, &CancellationToken::new());
    assert!(matches!(result, Err(Error::EmptyParameters)));
}
