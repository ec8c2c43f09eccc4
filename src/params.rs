//! Extraction parameters and their builder.
//!
//! A mutable [`ExtractionParametersBuilder`] accumulates edits from the
//! caller; `build()` produces an immutable [`ExtractionParameters`] snapshot
//! with per-file settings copied, so a long-running extraction is unaffected
//! by later edits to the builder.

use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_INCLUDE_HEADER, DEFAULT_MISSING_VALUE, DEFAULT_PERIOD_SIZE, DEFAULT_RECLAIM_MEMORY,
    DEFAULT_SEPARATOR, DEFAULT_SINGLE_DOCUMENT, DEFAULT_START_DATE, DEFAULT_TIME_FORMAT,
    DEFAULT_TIME_VARIABLE,
};
use crate::error::{Error, Result};
use crate::timeaxis::PeriodUnit;

/// Per-file extraction settings.
///
/// The variable list is ordered and may contain the same name several times;
/// each repetition re-reads and re-emits that column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub variables: Vec<String>,
}

/// Immutable unit of work for the batch text extraction engine.
#[derive(Debug, Clone)]
pub struct ExtractionParameters {
    files: Vec<(PathBuf, Settings)>,
    pub separator: String,
    pub destination_dir: Option<PathBuf>,
    pub single_document: bool,
    pub include_header: bool,
    /// Accepted for configuration compatibility. The engine always releases a
    /// file's cell buffers when that file finishes, so the flag currently has
    /// no additional effect.
    pub reclaim_memory: bool,
    /// Token emitted for cells without a physical value; `None` omits the
    /// field entirely (the separator is still written).
    pub missing_value: Option<String>,
    pub period_size: u32,
    pub period_unit: PeriodUnit,
    pub start_date: DateTime<FixedOffset>,
    pub time_format: String,
    pub time_variable: String,
}

impl ExtractionParameters {
    /// Registered source files, in insertion order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|(path, _)| path.as_path())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Settings for a registered file. Every registered file has settings.
    pub fn settings(&self, source: &Path) -> Option<&Settings> {
        self.files
            .iter()
            .find(|(path, _)| path == source)
            .map(|(_, settings)| settings)
    }
}

/// Mutable accumulator for [`ExtractionParameters`].
#[derive(Debug, Clone)]
pub struct ExtractionParametersBuilder {
    files: Vec<(PathBuf, Settings)>,
    separator: String,
    destination_dir: Option<PathBuf>,
    single_document: bool,
    include_header: bool,
    reclaim_memory: bool,
    missing_value: Option<String>,
    period_size: u32,
    period_unit: PeriodUnit,
    start_date: DateTime<FixedOffset>,
    time_format: String,
    time_variable: String,
}

impl Default for ExtractionParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionParametersBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            destination_dir: None,
            single_document: DEFAULT_SINGLE_DOCUMENT,
            include_header: DEFAULT_INCLUDE_HEADER,
            reclaim_memory: DEFAULT_RECLAIM_MEMORY,
            missing_value: Some(DEFAULT_MISSING_VALUE.to_string()),
            period_size: DEFAULT_PERIOD_SIZE,
            period_unit: PeriodUnit::Second,
            start_date: DEFAULT_START_DATE
                .parse()
                .expect("default start date is valid RFC 3339"),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            time_variable: DEFAULT_TIME_VARIABLE.to_string(),
        }
    }

    /// Register a source file without variables. Registering the same file
    /// twice is a no-op; files form an insertion-ordered set.
    pub fn add_file(&mut self, source: impl Into<PathBuf>) -> &mut Self {
        self.settings_for(source.into());
        self
    }

    /// Append a variable to export from the given file, registering the file
    /// if needed. Repeated names are kept: they produce repeated columns.
    pub fn add_variable(&mut self, source: impl Into<PathBuf>, variable: impl Into<String>) -> &mut Self {
        self.settings_for(source.into()).variables.push(variable.into());
        self
    }

    /// Remove the first occurrence of a variable from the given file.
    pub fn remove_variable(&mut self, source: &Path, variable: &str) -> &mut Self {
        if let Some((_, settings)) = self.files.iter_mut().find(|(path, _)| path == source)
            && let Some(position) = settings.variables.iter().position(|v| v == variable)
        {
            settings.variables.remove(position);
        }
        self
    }

    pub fn clear_files(&mut self) -> &mut Self {
        self.files.clear();
        self
    }

    pub fn separator(&mut self, separator: impl Into<String>) -> &mut Self {
        self.separator = separator.into();
        self
    }

    /// Destination directory for extracted files; `None` writes alongside
    /// each source. Existence is validated at extraction start, before any
    /// source is opened.
    pub fn destination_dir(&mut self, dir: Option<PathBuf>) -> &mut Self {
        self.destination_dir = dir;
        self
    }

    pub fn single_document(&mut self, value: bool) -> &mut Self {
        self.single_document = value;
        self
    }

    pub fn include_header(&mut self, value: bool) -> &mut Self {
        self.include_header = value;
        self
    }

    /// See [`ExtractionParameters::reclaim_memory`].
    pub fn reclaim_memory(&mut self, value: bool) -> &mut Self {
        self.reclaim_memory = value;
        self
    }

    pub fn missing_value(&mut self, token: Option<String>) -> &mut Self {
        self.missing_value = token;
        self
    }

    pub fn period_size(&mut self, size: u32) -> &mut Self {
        self.period_size = size;
        self
    }

    pub fn period_unit(&mut self, unit: PeriodUnit) -> &mut Self {
        self.period_unit = unit;
        self
    }

    pub fn start_date(&mut self, start: DateTime<FixedOffset>) -> &mut Self {
        self.start_date = start;
        self
    }

    pub fn time_format(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.time_format = pattern.into();
        self
    }

    pub fn time_variable(&mut self, name: impl Into<String>) -> &mut Self {
        self.time_variable = name.into();
        self
    }

    /// Produce an immutable snapshot.
    ///
    /// Validates what can be known without touching the filesystem: a
    /// positive period size and a non-empty separator.
    pub fn build(&self) -> Result<ExtractionParameters> {
        if self.period_size == 0 {
            return Err(Error::configuration("period size must be at least 1"));
        }
        if self.separator.is_empty() {
            return Err(Error::configuration("separator must not be empty"));
        }
        Ok(ExtractionParameters {
            // Settings are cloned per file so the snapshot shares nothing
            // with this builder.
            files: self.files.clone(),
            separator: self.separator.clone(),
            destination_dir: self.destination_dir.clone(),
            single_document: self.single_document,
            include_header: self.include_header,
            reclaim_memory: self.reclaim_memory,
            missing_value: self.missing_value.clone(),
            period_size: self.period_size,
            period_unit: self.period_unit,
            start_date: self.start_date,
            time_format: self.time_format.clone(),
            time_variable: self.time_variable.clone(),
        })
    }

    fn settings_for(&mut self, source: PathBuf) -> &mut Settings {
        if let Some(position) = self.files.iter().position(|(path, _)| *path == source) {
            &mut self.files[position].1
        } else {
            self.files.push((source, Settings::default()));
            &mut self.files.last_mut().expect("just pushed").1
        }
    }
}
