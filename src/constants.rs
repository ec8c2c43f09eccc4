//! Application constants for ncextract
//!
//! This module contains attribute names, default parameter values and file
//! naming conventions used throughout the extractor.

// =============================================================================
// File Patterns
// =============================================================================

/// File extensions recognized as NetCDF sources during a directory scan
pub const NETCDF_EXTENSIONS: &[&str] = &["nc", "cdf"];

/// Extension given to extracted text files
pub const OUTPUT_EXTENSION: &str = "txt";

// =============================================================================
// Variable Attribute Names
// =============================================================================

/// Sentinel value written by producers for cells that were never written
pub const ATTR_FILL_VALUE: &str = "_FillValue";

/// Sentinel value for cells explicitly marked as missing
pub const ATTR_MISSING_VALUE: &str = "missing_value";

/// Affine decode: physical = stored * scale_factor + add_offset
pub const ATTR_SCALE_FACTOR: &str = "scale_factor";
pub const ATTR_ADD_OFFSET: &str = "add_offset";

/// Declared inclusive validity bounds, either as one two-element attribute
/// or as two scalar attributes
pub const ATTR_VALID_RANGE: &str = "valid_range";
pub const ATTR_VALID_MIN: &str = "valid_min";
pub const ATTR_VALID_MAX: &str = "valid_max";

/// Free-text variable description
pub const ATTR_LONG_NAME: &str = "long_name";

// =============================================================================
// Extraction Parameter Defaults
// =============================================================================

/// Default field separator for extracted rows
pub const DEFAULT_SEPARATOR: &str = ",";

/// Default token emitted for cells without a physical value
pub const DEFAULT_MISSING_VALUE: &str = "NaN";

/// Default name of the dimension variable encoding time
pub const DEFAULT_TIME_VARIABLE: &str = "time";

/// Default number of period units per stored tick
pub const DEFAULT_PERIOD_SIZE: u32 = 1;

/// Default reference epoch (RFC 3339)
pub const DEFAULT_START_DATE: &str = "1970-01-01T00:00:00+00:00";

/// Default chrono pattern for the emitted time column (ISO 8601 with offset)
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Whether extracted files carry a header row by default
pub const DEFAULT_INCLUDE_HEADER: bool = true;

/// Whether all sources are concatenated into one document by default
pub const DEFAULT_SINGLE_DOCUMENT: bool = false;

/// Whether per-file buffers are dropped eagerly between files by default
pub const DEFAULT_RECLAIM_MEMORY: bool = true;

// =============================================================================
// Extraction Geometry
// =============================================================================

/// Exported variables must be (time, lat, lon) grids
pub const EXPORTABLE_RANK: usize = 3;

/// Fixed progress steps per file before the row loop starts
/// (the ten collect states minus the three counted before totals are known)
pub const PRELIMINARY_STEPS: u64 = 7;

// =============================================================================
// Raster Rendering
// =============================================================================

/// Edge length of the square block painted per logical cell
pub const DEFAULT_IMAGE_UPSCALE: u32 = 3;

/// Hue of the coldest value on the ramp, as a fraction of a full turn.
/// 240° is blue; the ramp runs blue -> red as values rise.
pub const HUE_COLDEST: f64 = 240.0 / 360.0;
