//! Tests for the batch text extraction engine.

pub mod cancellation;
pub mod eligibility;
pub mod topology;

use std::fs;
use std::path::Path;

use crate::params::ExtractionParametersBuilder;

/// Write a 2x2x2 (time, lat, lon) dataset with one filled cell in `sst`.
///
/// Ticks 0 and 1, latitudes 10 and 20, longitudes 30 and 40. Cell values run
/// 1..8 in storage order except cell 6, which holds the fill sentinel.
pub fn write_grid_file(path: &Path) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", 2).unwrap();
    file.add_dimension("lat", 2).unwrap();
    file.add_dimension("lon", 2).unwrap();

    let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
    time.put_values(&[0.0f64, 1.0], ..).unwrap();
    let mut lat = file.add_variable::<f64>("lat", &["lat"]).unwrap();
    lat.put_values(&[10.0f64, 20.0], ..).unwrap();
    let mut lon = file.add_variable::<f64>("lon", &["lon"]).unwrap();
    lon.put_values(&[30.0f64, 40.0], ..).unwrap();

    let mut sst = file
        .add_variable::<f64>("sst", &["time", "lat", "lon"])
        .unwrap();
    sst.put_attribute("_FillValue", -999.0f64).unwrap();
    sst.put_values(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, -999.0, 8.0], ..)
        .unwrap();
}

/// Builder preloaded with the `sst` variable of the given source.
pub fn builder_for(path: &Path) -> ExtractionParametersBuilder {
    let mut builder = ExtractionParametersBuilder::new();
    builder.add_variable(path, "sst");
    builder
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
