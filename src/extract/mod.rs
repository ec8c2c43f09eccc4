//! Batch text extraction engine.
//!
//! Drives the full pipeline for each registered source file: collect the
//! selected variables and their decode metadata, reconstruct the time axis,
//! iterate the (time, lat, lon) grid in row-major order and stream delimited
//! rows to the destination. Supports two output topologies: one text file per
//! source, or all sources concatenated into a single document.
//!
//! The per-file pipeline is strictly sequential; every phase updates progress
//! and observes the cancellation token, including once per emitted column
//! inside the row loop, because a single file's row loop can dominate total
//! runtime.

#[cfg(test)]
pub mod tests;

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::attrs;
use crate::constants::{
    ATTR_ADD_OFFSET, ATTR_FILL_VALUE, ATTR_MISSING_VALUE, ATTR_SCALE_FACTOR, EXPORTABLE_RANK,
    OUTPUT_EXTENSION, PRELIMINARY_STEPS,
};
use crate::decode::{CellValue, DecodeRules, FloatRules, IntRules, NumericKind, RawValue};
use crate::error::{Error, Result};
use crate::params::{ExtractionParameters, Settings};
use crate::progress::{CancellationToken, Completion, ProgressSink, ProgressTracker};
use crate::timeaxis;

/// Summary of one extraction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub files_exported: usize,
    pub files_skipped: usize,
    pub rows_written: u64,
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

/// A per-file failure that did not abort the batch.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of exporting one source file.
enum ExportOutcome {
    Exported(u64),
    Skipped,
    Cancelled,
}

/// One selected variable with everything needed to decode its cells.
struct Column {
    name: String,
    kind: NumericKind,
    rules: DecodeRules,
}

/// Raw cell storage for one variable, kept on the matching numeric path.
enum RawColumn {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl RawColumn {
    fn get(&self, index: usize) -> RawValue {
        match self {
            RawColumn::Int(values) => RawValue::Int(values[index]),
            RawColumn::Float(values) => RawValue::Float(values[index]),
        }
    }
}

/// Derive the destination path for a source file.
///
/// The output lands in `target_dir` when given, otherwise alongside the
/// source, with the `.nc`/`.cdf` suffix replaced by `.txt`.
pub fn destination_for(source: &Path, target_dir: Option<&Path>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = format!("{}.{}", stem, OUTPUT_EXTENSION);
    let dir = target_dir
        .map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(file_name)
}

/// Batch text extraction engine.
pub struct BatchTextExtractor {
    params: ExtractionParameters,
}

impl BatchTextExtractor {
    pub fn new(params: ExtractionParameters) -> Self {
        Self { params }
    }

    /// Run the batch.
    ///
    /// Configuration errors (empty parameter set, missing destination
    /// directory) are detected here, before any source file is opened.
    /// Per-file failures are collected into the report in per-file mode; in
    /// single-document mode a write failure is fatal because the writer is
    /// shared.
    pub fn run(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Completion<ExtractionReport>> {
        if self.params.is_empty() {
            return Err(Error::EmptyParameters);
        }
        if let Some(dir) = &self.params.destination_dir
            && !dir.is_dir()
        {
            return Err(Error::DestinationNotADirectory { path: dir.clone() });
        }

        let mut tracker = ProgressTracker::new(sink);
        let mut report = ExtractionReport::default();

        let completion = if self.params.single_document {
            self.run_single_document(&mut tracker, cancel, &mut report)?
        } else {
            self.run_per_file(&mut tracker, cancel, &mut report)?
        };
        match completion {
            Completion::Cancelled => Ok(Completion::Cancelled),
            Completion::Done(()) => {
                info!(
                    "Extraction finished: {} exported, {} skipped, {} rows",
                    report.files_exported, report.files_skipped, report.rows_written
                );
                Ok(Completion::Done(report))
            }
        }
    }

    /// Per-file topology: independent writer and optional header per source.
    fn run_per_file(
        &self,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
        report: &mut ExtractionReport,
    ) -> Result<Completion<()>> {
        let total = self.params.file_count();
        for (index, source) in self.params.files().enumerate() {
            if cancel.is_cancelled() {
                return Ok(Completion::Cancelled);
            }
            let settings = self
                .params
                .settings(source)
                .expect("registered file has settings");
            let destination =
                destination_for(source, self.params.destination_dir.as_deref());

            let result = (|| -> Result<ExportOutcome> {
                // The source is opened before the destination is created, so
                // an unreadable source never truncates an existing output.
                let netcdf_file = netcdf::open(source)?;
                let file = File::create(&destination)?;
                let mut writer = BufWriter::new(file);
                let mut header_pending = self.params.include_header;
                let outcome = self.export_file(
                    source,
                    &netcdf_file,
                    settings,
                    &mut writer,
                    &mut header_pending,
                    index,
                    total,
                    tracker,
                    cancel,
                )?;
                writer.flush()?;
                Ok(outcome)
            })();

            match result {
                Ok(ExportOutcome::Cancelled) => return Ok(Completion::Cancelled),
                Ok(ExportOutcome::Exported(rows)) => {
                    report.files_exported += 1;
                    report.rows_written += rows;
                    report.outputs.push(destination);
                }
                Ok(ExportOutcome::Skipped) => {
                    report.files_skipped += 1;
                    // Nothing was extracted; do not leave an empty shell behind.
                    let _ = std::fs::remove_file(&destination);
                }
                Err(error) => {
                    warn!("Extraction failed for {}: {}", source.display(), error);
                    report.failures.push(FileFailure {
                        path: source.to_path_buf(),
                        reason: error.to_string(),
                    });
                }
            }
        }
        Ok(Completion::Done(()))
    }

    /// Single-document topology: one writer spans all files and the header is
    /// written at most once, before the first exported file.
    fn run_single_document(
        &self,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
        report: &mut ExtractionReport,
    ) -> Result<Completion<()>> {
        let first = self.params.files().next().expect("checked non-empty");
        let destination = destination_for(first, self.params.destination_dir.as_deref());
        let file = File::create(&destination)?;
        let mut writer = BufWriter::new(file);
        let mut header_pending = self.params.include_header;

        let total = self.params.file_count();
        for (index, source) in self.params.files().enumerate() {
            if cancel.is_cancelled() {
                writer.flush()?;
                return Ok(Completion::Cancelled);
            }
            let settings = self
                .params
                .settings(source)
                .expect("registered file has settings");

            let result = netcdf::open(source)
                .map_err(Error::from)
                .and_then(|netcdf_file| {
                    self.export_file(
                        source,
                        &netcdf_file,
                        settings,
                        &mut writer,
                        &mut header_pending,
                        index,
                        total,
                        tracker,
                        cancel,
                    )
                });
            let outcome = match result {
                Ok(outcome) => outcome,
                // A write failure is fatal here: the writer is shared, so
                // the remaining files cannot produce a coherent document.
                Err(error @ Error::Io(_)) => return Err(error),
                // Anything else is confined to this source.
                Err(error) => {
                    warn!("Extraction failed for {}: {}", source.display(), error);
                    report.failures.push(FileFailure {
                        path: source.to_path_buf(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };
            match outcome {
                ExportOutcome::Cancelled => {
                    writer.flush()?;
                    return Ok(Completion::Cancelled);
                }
                ExportOutcome::Exported(rows) => {
                    report.files_exported += 1;
                    report.rows_written += rows;
                }
                ExportOutcome::Skipped => report.files_skipped += 1,
            }
        }
        writer.flush()?;
        report.outputs.push(destination);
        Ok(Completion::Done(()))
    }

    /// Export one source file through the sequential per-file pipeline.
    #[allow(clippy::too_many_arguments)]
    fn export_file(
        &self,
        source: &Path,
        netcdf_file: &netcdf::File,
        settings: &Settings,
        writer: &mut BufWriter<File>,
        header_pending: &mut bool,
        index: usize,
        total_files: usize,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome> {
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());
        tracker.title(&format!("file {}/{}: {}", index + 1, total_files, file_name));

        // Collect variables.
        tracker.message("Collecting variables");
        let variables = self.collect_variables(netcdf_file, settings, source);
        if variables.is_empty() {
            warn!(
                "No eligible variables selected in {}, skipping file",
                source.display()
            );
            return Ok(ExportOutcome::Skipped);
        }
        if cancel.is_cancelled() {
            return Ok(ExportOutcome::Cancelled);
        }

        // Collect dimensions, in the order declared by the first variable.
        tracker.message("Collecting dimensions");
        let reference = netcdf_file
            .variable(&variables[0])
            .expect("eligibility checked above");
        let dimension_names: Vec<String> = reference
            .dimensions()
            .iter()
            .map(|dim| dim.name())
            .collect();
        if cancel.is_cancelled() {
            return Ok(ExportOutcome::Cancelled);
        }

        // Collect dimension sizes.
        tracker.message("Collecting dimension sizes");
        let sizes: Vec<usize> = reference.dimensions().iter().map(|dim| dim.len()).collect();
        drop(reference);
        if cancel.is_cancelled() {
            return Ok(ExportOutcome::Cancelled);
        }

        // Total step count becomes known here: the remaining preliminary
        // phases, the optional header, and one step per emitted column and
        // line terminator per row.
        let total_rows = (sizes[0] * sizes[1] * sizes[2]) as u64;
        let columns_per_row = (dimension_names.len() + variables.len() + 1) as u64;
        let header_steps = if *header_pending { 1 } else { 0 };
        tracker.set_total(PRELIMINARY_STEPS + header_steps + columns_per_row * total_rows);

        // Collect data types.
        tracker.message("Collecting variables data types");
        let kinds: Vec<NumericKind> = variables
            .iter()
            .map(|name| {
                let variable = netcdf_file.variable(name).expect("eligibility checked");
                NumericKind::from_nc_type(&variable.vartype()).expect("eligibility checked")
            })
            .collect();
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(ExportOutcome::Cancelled);
        }

        // Collect fill values, missing values, scale factors, add offsets and
        // valid ranges into per-variable decode rules.
        let columns =
            self.collect_decode_rules(&netcdf_file, &variables, &kinds, tracker, cancel)?;
        let Some(columns) = columns else {
            return Ok(ExportOutcome::Cancelled);
        };

        // Collect dimension variables.
        tracker.message("Collecting dimension variables");
        let ticks = self.read_time_ticks(&netcdf_file, source, &dimension_names[0])?;
        let lats = read_axis_values(&netcdf_file, source, &dimension_names[1])?;
        let lons = read_axis_values(&netcdf_file, source, &dimension_names[2])?;
        if ticks.len() < sizes[0] || lats.len() < sizes[1] || lons.len() < sizes[2] {
            return Err(Error::extraction_failed(
                source,
                "dimension variable is shorter than its dimension",
            ));
        }
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(ExportOutcome::Cancelled);
        }

        // Write header. The pending flag flips exactly when the bytes go
        // out, so a shared writer never gets a second header after a
        // mid-batch failure.
        if *header_pending {
            let mut fields: Vec<&str> = dimension_names.iter().map(String::as_str).collect();
            fields.extend(columns.iter().map(|column| column.name.as_str()));
            writeln!(writer, "{}", fields.join(&self.params.separator))?;
            *header_pending = false;
            tracker.step();
            if cancel.is_cancelled() {
                return Ok(ExportOutcome::Cancelled);
            }
        }

        // Extract rows.
        let outcome = self.extract_rows(
            &netcdf_file,
            &columns,
            &sizes,
            &ticks,
            &lats,
            &lons,
            total_rows,
            writer,
            tracker,
            cancel,
        )?;
        debug!("Finished {}", source.display());
        Ok(outcome)
    }

    /// Resolve the selected variable names to eligible variables.
    ///
    /// Eligibility: present in the file, rank exactly 3, a supported numeric
    /// type, and the same shape as the first eligible variable. Ineligible
    /// selections are logged and dropped, preserving order and repetitions.
    fn collect_variables(
        &self,
        netcdf_file: &netcdf::File,
        settings: &Settings,
        source: &Path,
    ) -> Vec<String> {
        let mut eligible: Vec<String> = Vec::new();
        let mut reference_shape: Option<Vec<usize>> = None;
        for name in &settings.variables {
            let Some(variable) = netcdf_file.variable(name) else {
                warn!("Variable {} not found in {}, dropped", name, source.display());
                continue;
            };
            if variable.dimensions().len() != EXPORTABLE_RANK {
                warn!(
                    "Variable {} in {} has rank {}, expected {}, dropped",
                    name,
                    source.display(),
                    variable.dimensions().len(),
                    EXPORTABLE_RANK
                );
                continue;
            }
            if NumericKind::from_nc_type(&variable.vartype()).is_none() {
                warn!(
                    "Variable {} in {} has an unsupported data type, dropped",
                    name,
                    source.display()
                );
                continue;
            }
            let shape: Vec<usize> = variable.dimensions().iter().map(|dim| dim.len()).collect();
            match &reference_shape {
                None => reference_shape = Some(shape),
                Some(reference) if *reference != shape => {
                    warn!(
                        "Variable {} in {} has shape {:?}, expected {:?}, dropped",
                        name,
                        source.display(),
                        shape,
                        reference
                    );
                    continue;
                }
                Some(_) => {}
            }
            eligible.push(name.clone());
        }
        eligible
    }

    /// Collect the decode metadata phases, one progress step each.
    ///
    /// Returns `None` when cancellation was observed between phases.
    fn collect_decode_rules(
        &self,
        netcdf_file: &netcdf::File,
        variables: &[String],
        kinds: &[NumericKind],
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Column>>> {
        // Fill values.
        tracker.message("Collecting variables fill values");
        let fills: Vec<(i64, f64)> = variables
            .iter()
            .map(|name| {
                let variable = netcdf_file.variable(name).expect("eligibility checked");
                (
                    attrs::int_attribute(&variable, ATTR_FILL_VALUE, i64::MIN),
                    attrs::numeric_attribute(&variable, ATTR_FILL_VALUE, f64::NAN),
                )
            })
            .collect();
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(None);
        }

        // Missing values.
        tracker.message("Collecting variables missing values");
        let missings: Vec<(i64, f64)> = variables
            .iter()
            .map(|name| {
                let variable = netcdf_file.variable(name).expect("eligibility checked");
                (
                    attrs::int_attribute(&variable, ATTR_MISSING_VALUE, i64::MIN),
                    attrs::numeric_attribute(&variable, ATTR_MISSING_VALUE, f64::NAN),
                )
            })
            .collect();
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(None);
        }

        // Scale factors.
        tracker.message("Collecting variables scale factors");
        let scales: Vec<(i64, f64)> = variables
            .iter()
            .map(|name| {
                let variable = netcdf_file.variable(name).expect("eligibility checked");
                (
                    attrs::int_attribute(&variable, ATTR_SCALE_FACTOR, 1),
                    attrs::numeric_attribute(&variable, ATTR_SCALE_FACTOR, 1.0),
                )
            })
            .collect();
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(None);
        }

        // Add offsets.
        tracker.message("Collecting variables add offsets");
        let offsets: Vec<(i64, f64)> = variables
            .iter()
            .map(|name| {
                let variable = netcdf_file.variable(name).expect("eligibility checked");
                (
                    attrs::int_attribute(&variable, ATTR_ADD_OFFSET, 0),
                    attrs::numeric_attribute(&variable, ATTR_ADD_OFFSET, 0.0),
                )
            })
            .collect();
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(None);
        }

        // Valid ranges.
        tracker.message("Collecting variables valid ranges");
        let ranges: Vec<((i64, i64), (f64, f64))> = variables
            .iter()
            .map(|name| {
                let variable = netcdf_file.variable(name).expect("eligibility checked");
                (
                    attrs::valid_range_i64(&variable, i64::MIN, i64::MAX),
                    attrs::valid_range(&variable, f64::NEG_INFINITY, f64::INFINITY),
                )
            })
            .collect();
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let columns = variables
            .iter()
            .zip(kinds)
            .enumerate()
            .map(|(i, (name, kind))| {
                let rules = if kind.is_integer() {
                    DecodeRules::Int(IntRules {
                        fill: fills[i].0,
                        missing: missings[i].0,
                        valid_min: ranges[i].0.0,
                        valid_max: ranges[i].0.1,
                        scale: scales[i].0,
                        offset: offsets[i].0,
                    })
                } else {
                    DecodeRules::Float(FloatRules {
                        fill: fills[i].1,
                        missing: missings[i].1,
                        valid_min: ranges[i].1.0,
                        valid_max: ranges[i].1.1,
                        scale: scales[i].1,
                        offset: offsets[i].1,
                    })
                };
                Column {
                    name: name.clone(),
                    kind: *kind,
                    rules,
                }
            })
            .collect();
        Ok(Some(columns))
    }

    /// Read the raw time tick counts.
    ///
    /// Prefers the configured time variable when the file declares it,
    /// falling back to the variable named after dimension 0.
    fn read_time_ticks(
        &self,
        netcdf_file: &netcdf::File,
        source: &Path,
        dim0_name: &str,
    ) -> Result<Vec<i64>> {
        let variable = netcdf_file
            .variable(&self.params.time_variable)
            .or_else(|| netcdf_file.variable(dim0_name))
            .ok_or_else(|| Error::MissingDimensionVariable {
                path: source.to_path_buf(),
                name: self.params.time_variable.clone(),
            })?;
        Ok(variable.get_values::<i64, _>(..)?)
    }

    /// The row loop: dimension 0 outermost, then dimension 1, then 2.
    #[allow(clippy::too_many_arguments)]
    fn extract_rows(
        &self,
        netcdf_file: &netcdf::File,
        columns: &[Column],
        sizes: &[usize],
        ticks: &[i64],
        lats: &[f64],
        lons: &[f64],
        total_rows: u64,
        writer: &mut BufWriter<File>,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome> {
        // Each variable is read in full once; cells are then indexed in
        // memory instead of hitting the file once per cell.
        let mut raw_columns: Vec<RawColumn> = Vec::with_capacity(columns.len());
        for column in columns {
            let variable = netcdf_file
                .variable(&column.name)
                .expect("eligibility checked");
            let raw = if column.kind.is_integer() {
                RawColumn::Int(variable.get_values::<i64, _>(..)?)
            } else {
                RawColumn::Float(variable.get_values::<f64, _>(..)?)
            };
            raw_columns.push(raw);
        }

        let separator = &self.params.separator;
        let mut current_row: u64 = 0;
        for z in 0..sizes[0] {
            for y in 0..sizes[1] {
                for x in 0..sizes[2] {
                    tracker.message(&format!("Row {}/{}", current_row + 1, total_rows));
                    let mut fields: Vec<String> =
                        Vec::with_capacity(3 + columns.len());

                    // Time.
                    let instant = timeaxis::timestamp(
                        ticks[z],
                        self.params.period_size,
                        self.params.period_unit,
                        self.params.start_date,
                    )?;
                    fields.push(timeaxis::format_timestamp(instant, &self.params.time_format));
                    tracker.step();
                    if cancel.is_cancelled() {
                        writer.flush()?;
                        return Ok(ExportOutcome::Cancelled);
                    }

                    // Lat.
                    fields.push(lats[y].to_string());
                    tracker.step();
                    if cancel.is_cancelled() {
                        writer.flush()?;
                        return Ok(ExportOutcome::Cancelled);
                    }

                    // Lon.
                    fields.push(lons[x].to_string());
                    tracker.step();
                    if cancel.is_cancelled() {
                        writer.flush()?;
                        return Ok(ExportOutcome::Cancelled);
                    }

                    // Variables.
                    let cell = (z * sizes[1] + y) * sizes[2] + x;
                    for (column, raw) in columns.iter().zip(&raw_columns) {
                        fields.push(self.format_cell(column.rules.decode(raw.get(cell))));
                        tracker.step();
                        if cancel.is_cancelled() {
                            writer.flush()?;
                            return Ok(ExportOutcome::Cancelled);
                        }
                    }

                    // A row is written whole or not at all, so cancellation
                    // never corrupts already-written rows.
                    writeln!(writer, "{}", fields.join(separator))?;
                    tracker.step();
                    if cancel.is_cancelled() {
                        writer.flush()?;
                        return Ok(ExportOutcome::Cancelled);
                    }
                    current_row += 1;
                }
            }
        }

        writer.flush()?;
        Ok(ExportOutcome::Exported(current_row))
    }

    fn format_cell(&self, outcome: Option<CellValue>) -> String {
        match outcome {
            Some(value) => value.to_string(),
            None => self
                .params
                .missing_value
                .clone()
                .unwrap_or_default(),
        }
    }
}

/// Read a 1-D axis variable as physical coordinates.
fn read_axis_values(
    netcdf_file: &netcdf::File,
    source: &Path,
    name: &str,
) -> Result<Vec<f64>> {
    let variable =
        netcdf_file
            .variable(name)
            .ok_or_else(|| Error::MissingDimensionVariable {
                path: source.to_path_buf(),
                name: name.to_string(),
            })?;
    Ok(variable.get_values::<f64, _>(..)?)
}
