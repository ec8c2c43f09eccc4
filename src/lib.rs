//! ncextract library
//!
//! A Rust library for extracting gridded variables from NetCDF files into
//! delimited text files and false-color raster images.
//!
//! This library provides tools for:
//! - Scanning directories of NetCDF files into a navigable catalog
//! - Decoding stored values through fill/missing/valid-range/scale/offset metadata
//! - Reconstructing a calendar time axis from a reference epoch and period
//! - Streaming (time, lat, lon) grids to delimited text, per-file or concatenated
//! - Rendering 2D slices as hue-ramp false-color images
//! - Granular progress reporting and cooperative cancellation

pub mod attrs;
pub mod catalog;
pub mod constants;
pub mod decode;
pub mod error;
pub mod extract;
pub mod params;
pub mod progress;
pub mod render;
pub mod timeaxis;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use catalog::{Catalog, CatalogEntry, VariableDescriptor};
pub use error::{Error, Result};
pub use extract::{BatchTextExtractor, ExtractionReport};
pub use params::{ExtractionParameters, ExtractionParametersBuilder};
pub use progress::{Completion, ProgressSink};
pub use render::RasterRenderer;
pub use timeaxis::PeriodUnit;
