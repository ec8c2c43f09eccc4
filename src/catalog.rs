//! Directory scanning and the navigable catalog.
//!
//! Walks a directory for NetCDF sources, opens each one and builds a
//! two-level catalog of files and their variables. One unreadable file never
//! aborts the scan: its error is recorded in a non-fatal list and scanning
//! continues with the remaining files.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::attrs;
use crate::constants::{ATTR_LONG_NAME, NETCDF_EXTENSIONS};
use crate::decode::NumericKind;
use crate::error::{Error, Result};
use crate::progress::{CancellationToken, Completion, ProgressSink, ProgressTracker};

/// A variable eligible for navigation.
///
/// Scalars and 1-D coordinate variables are excluded from the catalog (they
/// remain readable as dimension variables during extraction).
#[derive(Debug, Clone, Serialize)]
pub struct VariableDescriptor {
    pub name: String,
    /// Group-qualified name; identical to `name` for the flat root group.
    pub full_name: String,
    /// Free-text description from `long_name`, empty when undeclared.
    pub description: String,
    pub rank: usize,
    /// Declared numeric storage class, `None` for non-numeric variables.
    pub data_type: Option<NumericKind>,
}

/// One scanned source file and its navigable variables.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub variables: Vec<VariableDescriptor>,
}

/// A per-file failure recorded during the scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// The two-level file/variable catalog. Immutable after construction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    /// Non-fatal per-file failures, for the caller to report.
    pub failures: Vec<ScanFailure>,
}

/// Check whether a path looks like a NetCDF source.
fn is_netcdf_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| NETCDF_EXTENSIONS.contains(&ext))
}

/// Scan a directory for NetCDF files and build the catalog.
///
/// Cancellation is checked between every file and every variable; a cancelled
/// scan yields no catalog, which the caller must treat distinctly from an
/// empty directory.
pub fn scan(
    directory: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<Completion<Catalog>> {
    if !directory.is_dir() {
        return Err(Error::SourceNotFound {
            path: directory.to_path_buf(),
        });
    }

    let mut tracker = ProgressTracker::new(sink);
    tracker.title(&format!("Scanning {}", directory.display()));
    tracker.message("Listing files");
    if cancel.is_cancelled() {
        return Ok(Completion::Cancelled);
    }

    // Candidate files, non-recursive, in stable name order.
    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_netcdf_file(path))
        .collect();
    files.sort();

    tracker.set_total(2 + 2 * files.len() as u64);
    tracker.step();
    debug!("Found {} candidate files in {}", files.len(), directory.display());

    let mut catalog = Catalog::default();
    for path in files {
        if cancel.is_cancelled() {
            return Ok(Completion::Cancelled);
        }
        tracker.message(&format!("Reading {}", path.display()));
        match read_entry(&path, &mut tracker, cancel) {
            Ok(Completion::Cancelled) => return Ok(Completion::Cancelled),
            Ok(Completion::Done(entry)) => catalog.entries.push(entry),
            Err(error) => {
                // Record and continue; one bad file never aborts the scan.
                warn!("Skipping unreadable file {}: {}", path.display(), error);
                catalog.failures.push(ScanFailure {
                    path: path.clone(),
                    reason: error.to_string(),
                });
                tracker.step();
                tracker.step();
            }
        }
    }

    tracker.step();
    tracker.message("Scan complete");
    Ok(Completion::Done(catalog))
}

/// Open one file and collect its variable descriptors.
fn read_entry(
    path: &Path,
    tracker: &mut ProgressTracker<'_>,
    cancel: &CancellationToken,
) -> Result<Completion<CatalogEntry>> {
    let file = netcdf::open(path)?;
    tracker.step();

    let mut variables = Vec::new();
    for variable in file.variables() {
        if cancel.is_cancelled() {
            return Ok(Completion::Cancelled);
        }
        let rank = variable.dimensions().len();
        if rank <= 1 {
            continue;
        }
        let name = variable.name();
        let description = attrs::string_attribute(&variable, ATTR_LONG_NAME).unwrap_or_default();
        variables.push(VariableDescriptor {
            full_name: name.clone(),
            name,
            description,
            rank,
            data_type: NumericKind::from_nc_type(&variable.vartype()),
        });
    }
    tracker.step();

    Ok(Completion::Done(CatalogEntry {
        path: path.to_path_buf(),
        variables,
    }))
}
