//! Error sets for loading traces, computing metrics, building sweeps and reading configuration.

use std::fmt::{Display, Debug, Formatter, Result};


/// Error set for reading a trace file
pub enum TraceError {
    /// File could not be opened or read
    Io(String),
    /// Fewer than two columns were found in the data rows
    TooFewColumns { found: usize },
    /// No row survived parsing
    NoValidRows,
    /// A row could not be parsed as numbers while parsing strictly
    MalformedRow { line: usize, content: String },
    /// Time and value columns hold a different number of samples
    LengthMismatch { time: usize, value: usize },
}

impl Display for TraceError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            TraceError::Io(msg) => write!(f, "Cannot read trace: {}", msg),
            TraceError::TooFewColumns { found } => write!(
                f, "Trace must have at least two numeric columns, found {}", found
            ),
            TraceError::NoValidRows => write!(f, "No valid numeric rows in trace"),
            TraceError::MalformedRow { line, content } => write!(
                f, "Malformed row at line {}: '{}'", line, content
            ),
            TraceError::LengthMismatch { time, value } => write!(
                f, "Time and value lengths differ ({} vs {})", time, value
            ),
        }
    }
}

impl Debug for TraceError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

impl From<std::io::Error> for TraceError {
    fn from(err: std::io::Error) -> TraceError {
        TraceError::Io(err.to_string())
    }
}

impl From<csv::Error> for TraceError {
    fn from(err: csv::Error) -> TraceError {
        TraceError::Io(err.to_string())
    }
}

/// Error set for spectral and spike rate computations over a window of a trace
pub enum SpectralError {
    /// No samples fall within the analysis window (ms)
    EmptyWindow { start: f64, end: f64 },
    /// Input cannot produce a meaningful estimate (duplicate timestamps,
    /// too few samples, non-finite values)
    DegenerateInput(String),
}

impl Display for SpectralError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            SpectralError::EmptyWindow { start, end } => write!(
                f, "No samples in crop range {}-{} ms", start, end
            ),
            SpectralError::DegenerateInput(reason) => write!(f, "Degenerate input: {}", reason),
        }
    }
}

impl Debug for SpectralError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

/// Error set for building a sweep matrix, these abort the sweep as a whole
pub enum SweepError {
    /// Sweep directory does not exist or is not a directory
    DirectoryNotFound(String),
    /// An axis has no admissible values
    EmptyParameterList(String),
    /// Filename pattern could not be compiled
    InvalidPattern(String),
    /// Every file was rejected, nothing to report
    NoCellsPopulated { expected: usize },
    /// Two files map onto the same cell while duplicates are rejected
    DuplicateCell { row: u32, col: u32, first: String, second: String },
    /// Directory could not be listed or output could not be written
    Io(String),
}

impl Display for SweepError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            SweepError::DirectoryNotFound(path) => write!(f, "{} is not a directory", path),
            SweepError::EmptyParameterList(axis) => write!(f, "Parameter list for '{}' is empty", axis),
            SweepError::InvalidPattern(reason) => write!(f, "Invalid filename pattern: {}", reason),
            SweepError::NoCellsPopulated { expected } => write!(
                f, "No cells populated out of {} expected", expected
            ),
            SweepError::DuplicateCell { row, col, first, second } => write!(
                f, "Files '{}' and '{}' both map to cell ({}, {})", first, second, row, col
            ),
            SweepError::Io(msg) => write!(f, "Sweep IO failure: {}", msg),
        }
    }
}

impl Debug for SweepError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

impl From<std::io::Error> for SweepError {
    fn from(err: std::io::Error) -> SweepError {
        SweepError::Io(err.to_string())
    }
}

impl From<csv::Error> for SweepError {
    fn from(err: csv::Error) -> SweepError {
        SweepError::Io(err.to_string())
    }
}

/// Error set for reading the analysis configuration
pub enum ConfigError {
    /// Configuration file cannot be read
    Io(String),
    /// Configuration is not valid TOML
    Parse(String),
    /// A required key is absent
    MissingField(String),
    /// A key is present but holds the wrong kind of value
    InvalidField { field: String, expected: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Cannot read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Cannot parse config: {}", msg),
            ConfigError::MissingField(field) => write!(f, "Missing required field '{}'", field),
            ConfigError::InvalidField { field, expected } => write!(
                f, "Cannot parse {} as {}", field, expected
            ),
        }
    }
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

/// A set of errors that may occur when using the library
pub enum SweepAnalysisError {
    /// Errors related to reading traces
    TraceRelatedError(TraceError),
    /// Errors related to band power or firing rate computation
    SpectralRelatedError(SpectralError),
    /// Errors related to building sweeps
    SweepRelatedError(SweepError),
    /// Errors related to configuration
    ConfigRelatedError(ConfigError),
}

impl Display for SweepAnalysisError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            SweepAnalysisError::TraceRelatedError(err) => write!(f, "{}", err),
            SweepAnalysisError::SpectralRelatedError(err) => write!(f, "{}", err),
            SweepAnalysisError::SweepRelatedError(err) => write!(f, "{}", err),
            SweepAnalysisError::ConfigRelatedError(err) => write!(f, "{}", err),
        }
    }
}

impl Debug for SweepAnalysisError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "file: {}, line: {}, error: {}", file!(), line!(), self)
    }
}

impl std::error::Error for TraceError {}
impl std::error::Error for SpectralError {}
impl std::error::Error for SweepError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for SweepAnalysisError {}

impl From<TraceError> for SweepAnalysisError {
    fn from(err: TraceError) -> SweepAnalysisError {
        SweepAnalysisError::TraceRelatedError(err)
    }
}

impl From<SpectralError> for SweepAnalysisError {
    fn from(err: SpectralError) -> SweepAnalysisError {
        SweepAnalysisError::SpectralRelatedError(err)
    }
}

impl From<SweepError> for SweepAnalysisError {
    fn from(err: SweepError) -> SweepAnalysisError {
        SweepAnalysisError::SweepRelatedError(err)
    }
}

impl From<ConfigError> for SweepAnalysisError {
    fn from(err: ConfigError) -> SweepAnalysisError {
        SweepAnalysisError::ConfigRelatedError(err)
    }
}
