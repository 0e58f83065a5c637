//! Reading two column time series (time in ms, membrane potential in mV or a synapse
//! variable) written by the retinal circuit simulator, and cropping them to analysis windows.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    result::Result,
};
use csv::{ReaderBuilder, Trim};
use crate::error::{SpectralError, TraceError};


/// How to split each line of a trace file into fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Comma separated fields
    Comma,
    /// Fields separated by any run of whitespace
    Whitespace,
    /// Comma separated, falling back to whitespace when fewer than two columns are found
    Auto,
}

/// How rows that are not two numbers are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTolerance {
    /// Any malformed row fails the whole file
    Strict,
    /// Malformed rows (and rows containing non-finite numbers) are dropped
    DropMalformed,
}

/// Settings for [`read_trace`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceLoaderSettings {
    /// Number of leading lines to ignore
    pub header_lines: usize,
    pub delimiter: Delimiter,
    pub tolerance: ParseTolerance,
}

impl Default for TraceLoaderSettings {
    fn default() -> Self {
        TraceLoaderSettings {
            header_lines: 1,
            delimiter: Delimiter::Comma,
            tolerance: ParseTolerance::Strict,
        }
    }
}

/// Closed interval of time (ms) used to select samples for analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisWindow {
    /// Start of window (ms)
    pub start: f64,
    /// End of window (ms)
    pub end: f64,
}

impl AnalysisWindow {
    pub fn new(start: f64, end: f64) -> Self {
        AnalysisWindow { start, end }
    }

    /// Length of the window in seconds
    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start) / 1000.
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}

impl Default for AnalysisWindow {
    fn default() -> Self {
        AnalysisWindow { start: 1000., end: 6000. }
    }
}

/// Sampled time series, `time` (ms) and `value` always have the same length
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trace {
    pub time: Vec<f64>,
    pub value: Vec<f64>,
}

impl Trace {
    pub fn new(time: Vec<f64>, value: Vec<f64>) -> Result<Self, TraceError> {
        if time.len() != value.len() {
            return Err(TraceError::LengthMismatch { time: time.len(), value: value.len() });
        }

        Ok(Trace { time, value })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time spanned between first and last sample (ms), `0.` if fewer than two samples
    pub fn duration(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.,
        }
    }

    /// Returns the samples with `window.start <= t <= window.end`
    pub fn crop(&self, window: &AnalysisWindow) -> Result<Trace, SpectralError> {
        let (time, value): (Vec<f64>, Vec<f64>) = self.time.iter()
            .zip(self.value.iter())
            .filter(|(t, _)| window.contains(**t))
            .map(|(t, v)| (*t, *v))
            .unzip();

        if time.is_empty() {
            return Err(SpectralError::EmptyWindow { start: window.start, end: window.end });
        }

        Ok(Trace { time, value })
    }
}

struct RowCollector {
    tolerance: ParseTolerance,
    time: Vec<f64>,
    value: Vec<f64>,
    max_columns: usize,
}

impl RowCollector {
    fn new(tolerance: ParseTolerance) -> Self {
        RowCollector { tolerance, time: vec![], value: vec![], max_columns: 0 }
    }

    fn push(&mut self, fields: &[&str], line: usize) -> Result<(), TraceError> {
        self.max_columns = self.max_columns.max(fields.len());

        if fields.len() < 2 {
            return match self.tolerance {
                ParseTolerance::Strict => Err(TraceError::TooFewColumns { found: fields.len() }),
                ParseTolerance::DropMalformed => Ok(()),
            };
        }

        let parsed = (fields[0].trim().parse::<f64>(), fields[1].trim().parse::<f64>());

        match (parsed, self.tolerance) {
            ((Ok(t), Ok(v)), ParseTolerance::Strict) => {
                self.time.push(t);
                self.value.push(v);
            },
            ((Ok(t), Ok(v)), ParseTolerance::DropMalformed) => {
                // nan and inf are treated as missing markers
                if t.is_finite() && v.is_finite() {
                    self.time.push(t);
                    self.value.push(v);
                }
            },
            (_, ParseTolerance::Strict) => {
                return Err(TraceError::MalformedRow { line, content: fields.join(",") });
            },
            (_, ParseTolerance::DropMalformed) => {},
        }

        Ok(())
    }

    fn finish(self) -> Result<Trace, TraceError> {
        if self.time.is_empty() {
            if self.max_columns < 2 {
                return Err(TraceError::TooFewColumns { found: self.max_columns });
            }

            return Err(TraceError::NoValidRows);
        }

        Ok(Trace { time: self.time, value: self.value })
    }
}

fn read_comma_delimited(path: &Path, settings: &TraceLoaderSettings) -> Result<Trace, TraceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut rows = RowCollector::new(settings.tolerance);

    for (n, record) in reader.records().enumerate() {
        if n < settings.header_lines {
            continue;
        }

        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let fields: Vec<&str> = record.iter().collect();

        rows.push(&fields, n + 1)?;
    }

    rows.finish()
}

fn read_whitespace_delimited(path: &Path, settings: &TraceLoaderSettings) -> Result<Trace, TraceError> {
    let reader = BufReader::new(File::open(path)?);

    let mut rows = RowCollector::new(settings.tolerance);

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if n < settings.header_lines || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();

        rows.push(&fields, n + 1)?;
    }

    rows.finish()
}

/// Reads the first two columns of a delimited trace file as time (ms) and value,
/// skipping `settings.header_lines` leading lines, fails with [`TraceError::TooFewColumns`]
/// if fewer than two columns are present and [`TraceError::NoValidRows`] if no rows survive
pub fn read_trace<P: AsRef<Path>>(path: P, settings: &TraceLoaderSettings) -> Result<Trace, TraceError> {
    let path = path.as_ref();

    match settings.delimiter {
        Delimiter::Comma => read_comma_delimited(path, settings),
        Delimiter::Whitespace => read_whitespace_delimited(path, settings),
        Delimiter::Auto => match read_comma_delimited(path, settings) {
            Err(TraceError::TooFewColumns { .. }) => read_whitespace_delimited(path, settings),
            result => result,
        },
    }
}
