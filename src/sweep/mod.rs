//! Building two dimensional sweep matrices from a directory of trace files whose names
//! encode two swept integer parameters, one scalar metric per file.
//!
//! A file such as `ON_GC_R400_C20.txt` is parsed by a [`FilenamePattern`] into the
//! [`ParameterPair`] `(400, 20)`, which addresses a cell through the two [`SweepAxis`]
//! definitions. Files that do not match the pattern, or whose parameters are not
//! admissible on both axes, are ignored. A file that fails to load or compute is skipped
//! with a warning and its cell stays `f64::NAN`, one bad file never aborts a sweep.

use std::{
    fs,
    path::{Path, PathBuf},
    result::Result,
};
use log::{debug, info, warn};
use ndarray::Array2;
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use crate::error::{SpectralError, SweepAnalysisError, SweepError};
use crate::spectral::{band_power, SpectralSettings};
use crate::spikes::{firing_rate, SpikeSettings};
use crate::trace::{read_trace, TraceLoaderSettings};


/// Two parameter values identifying one cell of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterPair {
    pub row: u32,
    pub col: u32,
}

/// Structural filename pattern `<prefix>_<row marker><digits>_<col marker><digits>.<extension>`,
/// matched case insensitively against the whole file name
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    pub prefix: String,
    pub row_marker: String,
    pub col_marker: String,
    pub extension: String,
    regex: Regex,
}

impl FilenamePattern {
    pub fn new(prefix: &str, row_marker: &str, col_marker: &str, extension: &str) -> Result<Self, SweepError> {
        let pattern = format!(
            r"^{}_{}(\d+)_{}(\d+)\.{}$",
            regex::escape(prefix),
            regex::escape(row_marker),
            regex::escape(col_marker),
            regex::escape(extension),
        );

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| SweepError::InvalidPattern(e.to_string()))?;

        Ok(
            FilenamePattern {
                prefix: String::from(prefix),
                row_marker: String::from(row_marker),
                col_marker: String::from(col_marker),
                extension: String::from(extension),
                regex,
            }
        )
    }

    /// Parses the two parameters from a file name, `None` if the name does not match
    pub fn parse(&self, file_name: &str) -> Option<ParameterPair> {
        let captures = self.regex.captures(file_name)?;

        let row = captures.get(1)?.as_str().parse::<u32>().ok()?;
        let col = captures.get(2)?.as_str().parse::<u32>().ok()?;

        Some(ParameterPair { row, col })
    }
}

/// Ordered list of admissible values for one swept parameter
#[derive(Debug, Clone, PartialEq)]
pub struct SweepAxis {
    /// Name used for labelling exported tables
    pub name: String,
    /// Admissible values in display order
    pub values: Vec<u32>,
    /// `(display value, value in file name)` pairs, for levels that are stored on
    /// disk under a different number than they are displayed with
    pub aliases: Vec<(u32, u32)>,
    /// Value considered 100%, defaults to the largest admissible value
    pub percent_scale: Option<f64>,
    /// If set, labels are written as percentages with this many decimals
    pub percent_decimals: Option<usize>,
}

impl SweepAxis {
    pub fn new(name: &str, values: Vec<u32>) -> Self {
        SweepAxis {
            name: String::from(name),
            values,
            aliases: vec![],
            percent_scale: None,
            percent_decimals: None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Maps a value parsed from a file name onto a position along the axis,
    /// an aliased display value is only reachable through its on disk value
    pub fn index_of_file_value(&self, file_value: u32) -> Option<usize> {
        let display_value = match self.aliases.iter().find(|(_, on_disk)| *on_disk == file_value) {
            Some((display, _)) => *display,
            None if self.aliases.iter().any(|(display, _)| *display == file_value) => return None,
            None => file_value,
        };

        self.values.iter().position(|v| *v == display_value)
    }

    /// Values as percentages of the percent scale
    pub fn percentages(&self) -> Vec<f64> {
        let scale = self.percent_scale
            .unwrap_or_else(|| self.values.iter().copied().max().unwrap_or(0) as f64);

        self.values.iter()
            .map(|v| if scale > 0. { *v as f64 / scale * 100. } else { 0. })
            .collect()
    }

    /// Values as numbers along the axis, percentages if labels are percentages
    pub fn positions(&self) -> Vec<f64> {
        match self.percent_decimals {
            Some(_) => self.percentages(),
            None => self.values.iter().map(|v| *v as f64).collect(),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        match self.percent_decimals {
            Some(decimals) => self.percentages().iter()
                .map(|p| format!("{:.*}", decimals, p))
                .collect(),
            None => self.values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// How to handle two files that map onto the same cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Later file in enumeration order overwrites earlier one
    LastWriteWins,
    /// Abort the sweep with [`SweepError::DuplicateCell`]
    Reject,
}

/// Settings used by [`build_sweep_matrix`]
#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub directory: PathBuf,
    pub pattern: FilenamePattern,
    pub rows: SweepAxis,
    pub columns: SweepAxis,
    /// Use `true` to search subdirectories
    pub recursive: bool,
    /// Use `true` to compute cells on the rayon thread pool
    pub parallel: bool,
    pub duplicates: DuplicatePolicy,
}

/// Scalar computed from one trace file
pub trait CellMetric: Sync {
    fn compute(&self, path: &Path) -> Result<f64, SweepAnalysisError>;
}

impl<F> CellMetric for F
where
    F: Fn(&Path) -> Result<f64, SweepAnalysisError> + Sync,
{
    fn compute(&self, path: &Path) -> Result<f64, SweepAnalysisError> {
        self(path)
    }
}

/// Band power of each trace file
#[derive(Debug, Clone, Copy)]
pub struct BandPowerMetric {
    pub loader: TraceLoaderSettings,
    pub settings: SpectralSettings,
}

impl CellMetric for BandPowerMetric {
    fn compute(&self, path: &Path) -> Result<f64, SweepAnalysisError> {
        let trace = read_trace(path, &self.loader)?;

        Ok(band_power(&trace, &self.settings)?)
    }
}

/// Firing rate of each trace file
#[derive(Debug, Clone, Copy)]
pub struct FiringRateMetric {
    pub loader: TraceLoaderSettings,
    pub settings: SpikeSettings,
}

impl CellMetric for FiringRateMetric {
    fn compute(&self, path: &Path) -> Result<f64, SweepAnalysisError> {
        let trace = read_trace(path, &self.loader)?;

        Ok(firing_rate(&trace, &self.settings)?)
    }
}

/// Grid of metric values indexed by two sweep axes, missing cells are `f64::NAN`
#[derive(Debug, Clone)]
pub struct SweepMatrix {
    pub rows: SweepAxis,
    pub columns: SweepAxis,
    pub cells: Array2<f64>,
}

impl SweepMatrix {
    /// Generates a matrix where every cell is missing
    pub fn empty(rows: SweepAxis, columns: SweepAxis) -> Self {
        let cells = Array2::from_elem((rows.len(), columns.len()), f64::NAN);

        SweepMatrix { rows, columns, cells }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    /// Value at the given display values, `None` if either is not on its axis or the cell is missing
    pub fn get(&self, row_value: u32, col_value: u32) -> Option<f64> {
        let i = self.rows.values.iter().position(|v| *v == row_value)?;
        let j = self.columns.values.iter().position(|v| *v == col_value)?;

        let value = self.cells[[i, j]];
        if value.is_nan() { None } else { Some(value) }
    }

    pub fn row(&self, i: usize) -> Vec<f64> {
        self.cells.row(i).to_vec()
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.cells.column(j).to_vec()
    }

    /// Number of cells holding a value
    pub fn populated(&self) -> usize {
        self.cells.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn expected(&self) -> usize {
        self.cells.len()
    }

    /// Writes matrix with row labels in the first column and column labels as header,
    /// missing cells are left empty
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), SweepError> {
        write_grid_csv(
            path,
            &self.rows.name,
            &self.rows.labels(),
            &self.columns.labels(),
            &self.cells,
        )
    }
}

/// Writes a labelled grid of values to a csv file, `NaN` is written as an empty field
pub fn write_grid_csv<P: AsRef<Path>>(
    path: P,
    corner: &str,
    row_labels: &[String],
    col_labels: &[String],
    grid: &Array2<f64>,
) -> Result<(), SweepError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![String::from(corner)];
    header.extend(col_labels.iter().cloned());
    writer.write_record(&header)?;

    for (label, row) in row_labels.iter().zip(grid.rows()) {
        let mut record = vec![label.clone()];
        record.extend(row.iter().map(|v| format_cell(*v)));
        writer.write_record(&record)?;
    }

    writer.flush()?;

    Ok(())
}

/// Formats a value for csv output, `NaN` becomes an empty field
pub fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// A file that matched the sweep but could not produce a value
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a sweep with the populated matrix and its completeness
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub matrix: SweepMatrix,
    /// Cells holding a value
    pub populated: usize,
    /// Cells in the matrix
    pub expected: usize,
    /// Files that matched but failed to load or compute
    pub skipped: Vec<SkippedFile>,
    /// Files that did not match the pattern or fell outside the axes
    pub ignored: usize,
}

impl SweepReport {
    /// Fraction of expected cells that were populated
    pub fn coverage(&self) -> f64 {
        if self.expected == 0 {
            0.
        } else {
            self.populated as f64 / self.expected as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.populated == self.expected
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn collect_files(directory: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<(), SweepError> {
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();

        if path.is_file() {
            files.push(path);
        } else if recursive && path.is_dir() {
            collect_files(&path, recursive, files)?;
        }
    }

    Ok(())
}

/// Lists the regular files of a directory (and its subdirectories if `recursive`),
/// sorted by file name then full path
pub fn discover_files(directory: &Path, recursive: bool) -> Result<Vec<PathBuf>, SweepError> {
    let mut files = vec![];
    collect_files(directory, recursive, &mut files)?;

    files.sort_by(|a, b| file_name(a).cmp(&file_name(b)).then_with(|| a.cmp(b)));

    Ok(files)
}

struct Candidate {
    path: PathBuf,
    row: usize,
    col: usize,
    pair: ParameterPair,
}

fn select_candidates(settings: &SweepSettings, files: Vec<PathBuf>) -> Result<(Vec<Candidate>, usize), SweepError> {
    let mut candidates: Vec<Candidate> = vec![];
    let mut ignored = 0;

    for path in files {
        let name = file_name(&path);

        let pair = match settings.pattern.parse(&name) {
            Some(pair) => pair,
            None => {
                debug!("ignoring {}: does not match pattern", name);
                ignored += 1;
                continue;
            }
        };

        let indices = (
            settings.rows.index_of_file_value(pair.row),
            settings.columns.index_of_file_value(pair.col),
        );

        let (row, col) = match indices {
            (Some(row), Some(col)) => (row, col),
            _ => {
                debug!("ignoring {}: ({}, {}) not on sweep axes", name, pair.row, pair.col);
                ignored += 1;
                continue;
            }
        };

        if settings.duplicates == DuplicatePolicy::Reject {
            if let Some(existing) = candidates.iter().find(|c| c.row == row && c.col == col) {
                return Err(SweepError::DuplicateCell {
                    row: pair.row,
                    col: pair.col,
                    first: file_name(&existing.path),
                    second: name,
                });
            }
        }

        candidates.push(Candidate { path, row, col, pair });
    }

    Ok((candidates, ignored))
}

/// Builds a sweep matrix by computing `metric` for every file in `settings.directory` whose name
/// matches `settings.pattern` and whose parameters are on both axes, failures and non-finite
/// results leave the cell missing and are reported in [`SweepReport::skipped`], fails if the
/// directory is missing, either axis is empty, or no cell could be populated
pub fn build_sweep_matrix<M: CellMetric + ?Sized>(
    settings: &SweepSettings,
    metric: &M,
) -> Result<SweepReport, SweepError> {
    if !settings.directory.is_dir() {
        return Err(SweepError::DirectoryNotFound(settings.directory.display().to_string()));
    }
    if settings.rows.is_empty() {
        return Err(SweepError::EmptyParameterList(settings.rows.name.clone()));
    }
    if settings.columns.is_empty() {
        return Err(SweepError::EmptyParameterList(settings.columns.name.clone()));
    }

    let files = discover_files(&settings.directory, settings.recursive)?;
    let (candidates, ignored) = select_candidates(settings, files)?;

    // each file is independent, results are merged afterwards in enumeration order
    let results: Vec<Result<f64, SweepAnalysisError>> = if settings.parallel {
        candidates.par_iter()
            .map(|c| metric.compute(&c.path))
            .collect()
    } else {
        candidates.iter()
            .map(|c| metric.compute(&c.path))
            .collect()
    };

    let mut matrix = SweepMatrix::empty(settings.rows.clone(), settings.columns.clone());
    let mut skipped = vec![];

    for (candidate, result) in candidates.iter().zip(results) {
        let result = result.and_then(|value| {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(SpectralError::DegenerateInput(format!("non-finite result {}", value)).into())
            }
        });

        match result {
            Ok(value) => {
                debug!(
                    "{} ({}, {}) -> {}",
                    file_name(&candidate.path), candidate.pair.row, candidate.pair.col, value,
                );
                matrix.cells[[candidate.row, candidate.col]] = value;
            },
            Err(e) => {
                warn!("[SKIP] {}: {}", file_name(&candidate.path), e);
                skipped.push(SkippedFile { path: candidate.path.clone(), reason: e.to_string() });
            },
        }
    }

    let populated = matrix.populated();
    let expected = matrix.expected();

    if populated == 0 {
        return Err(SweepError::NoCellsPopulated { expected });
    }

    info!("computed {}/{} cells", populated, expected);
    if populated < expected {
        warn!("{} cells missing, they are left empty in exported tables", expected - populated);
    }

    Ok(SweepReport { matrix, populated, expected, skipped, ignored })
}
