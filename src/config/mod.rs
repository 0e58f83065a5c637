//! Reading analysis configuration from TOML, every setting used by a run is held in an
//! [`AnalysisConfig`] and passed down explicitly.
//!
//! ```toml
//! [sweep]
//! directory = "ON_GC_fovea"
//! prefix = "ON_GC"
//! row_marker = "R"
//! col_marker = "C"
//!
//! [sweep.rows]
//! name = "Rod"
//! values = [400, 360, 320, 280, 240, 200, 160, 120, 80, 40, 0]
//! aliases = [[0, 1]]
//!
//! [sweep.columns]
//! name = "Cone"
//! values = [20, 18, 16, 14, 12, 10, 8, 6, 4, 2, 0]
//!
//! [analysis]
//! mode = "firing_rate"
//! window = [1000.0, 6000.0]
//! threshold_high = 0.0
//! threshold_low = -20.0
//! ```

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    result::Result,
};
use log::info;
use toml::{from_str, Value};
use crate::error::{ConfigError, SweepError};
use crate::knee::{KneeMethod, KneeSettings};
use crate::spectral::{FrequencyBand, SpectralSettings};
use crate::spikes::{HysteresisThresholds, SpikeSettings};
use crate::sweep::{DuplicatePolicy, FilenamePattern, SweepAxis, SweepSettings};
use crate::trace::{AnalysisWindow, Delimiter, ParseTolerance, TraceLoaderSettings};


fn invalid(field_name: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidField { field: String::from(field_name), expected: String::from(expected) }
}

fn parse_bool(value: &Value, field_name: &str) -> Result<bool, ConfigError> {
    value
        .as_bool()
        .ok_or_else(|| invalid(field_name, "boolean"))
}

fn parse_usize(value: &Value, field_name: &str) -> Result<usize, ConfigError> {
    value
        .as_integer()
        .filter(|v| *v >= 0)
        .ok_or_else(|| invalid(field_name, "unsigned integer"))
        .map(|v| v as usize)
}

fn parse_u32(value: &Value, field_name: &str) -> Result<u32, ConfigError> {
    value
        .as_integer()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| invalid(field_name, "unsigned integer"))
}

fn parse_f64(value: &Value, field_name: &str) -> Result<f64, ConfigError> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|v| v as f64))
        .ok_or_else(|| invalid(field_name, "float"))
}

fn parse_string(value: &Value, field_name: &str) -> Result<String, ConfigError> {
    value
        .as_str()
        .ok_or_else(|| invalid(field_name, "string"))
        .map(String::from)
}

fn parse_u32_array(value: &Value, field_name: &str) -> Result<Vec<u32>, ConfigError> {
    value
        .as_array()
        .ok_or_else(|| invalid(field_name, "array of unsigned integers"))?
        .iter()
        .map(|v| parse_u32(v, field_name))
        .collect()
}

fn parse_f64_pair(value: &Value, field_name: &str) -> Result<(f64, f64), ConfigError> {
    let array = value
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| invalid(field_name, "array of two numbers"))?;

    Ok((parse_f64(&array[0], field_name)?, parse_f64(&array[1], field_name)?))
}

fn parse_aliases(value: &Value, field_name: &str) -> Result<Vec<(u32, u32)>, ConfigError> {
    value
        .as_array()
        .ok_or_else(|| invalid(field_name, "array of [display, file] pairs"))?
        .iter()
        .map(|pair| {
            let pair = parse_u32_array(pair, field_name)?;
            if pair.len() != 2 {
                return Err(invalid(field_name, "array of [display, file] pairs"));
            }

            Ok((pair[0], pair[1]))
        })
        .collect()
}

fn parse_value_with_default<T>(
    table: &Value,
    key: &str,
    parser: impl Fn(&Value, &str) -> Result<T, ConfigError>,
    default: T,
) -> Result<T, ConfigError> {
    table
        .get(key)
        .map_or(Ok(default), |value| parser(value, key))
}

fn parse_required<T>(
    table: &Value,
    key: &str,
    parser: impl Fn(&Value, &str) -> Result<T, ConfigError>,
) -> Result<T, ConfigError> {
    table
        .get(key)
        .ok_or_else(|| ConfigError::MissingField(String::from(key)))
        .and_then(|value| parser(value, key))
}

fn empty_table() -> Value {
    Value::Table(toml::value::Table::new())
}

/// Where the sweep files are and how they are named
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub directory: PathBuf,
    pub prefix: String,
    pub row_marker: String,
    pub col_marker: String,
    pub extension: String,
    pub recursive: bool,
    pub parallel: bool,
    pub duplicates: DuplicatePolicy,
    pub rows: SweepAxis,
    pub columns: SweepAxis,
}

impl SweepConfig {
    /// Compiles the filename pattern and generates settings for building a sweep
    pub fn to_settings(&self) -> Result<SweepSettings, SweepError> {
        Ok(
            SweepSettings {
                directory: self.directory.clone(),
                pattern: FilenamePattern::new(
                    &self.prefix, &self.row_marker, &self.col_marker, &self.extension,
                )?,
                rows: self.rows.clone(),
                columns: self.columns.clone(),
                recursive: self.recursive,
                parallel: self.parallel,
                duplicates: self.duplicates,
            }
        )
    }
}

/// Which metric is computed for each cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalysisMode {
    /// Spectral band power of the membrane potential (mV^2)
    BandPower(SpectralSettings),
    /// Firing rate from hysteresis spike detection (Hz)
    FiringRate(SpikeSettings),
}

/// Knee estimation settings for both directions of the matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KneeConfig {
    pub enabled: bool,
    pub settings: KneeSettings,
    /// Knee reported for each row (located along columns)
    pub row_method: KneeMethod,
    /// Knee reported for each column (located along rows)
    pub column_method: KneeMethod,
}

impl Default for KneeConfig {
    fn default() -> Self {
        KneeConfig {
            enabled: true,
            settings: KneeSettings::default(),
            row_method: KneeMethod::MaxGradient,
            column_method: KneeMethod::MaxDrop,
        }
    }
}

/// Settings for the gradient magnitude and rapid change region outputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientConfig {
    pub enabled: bool,
    pub smoothing_width: usize,
    /// Percentile of gradient magnitude at or above which a cell is marked rapid
    pub percentile: f64,
}

impl Default for GradientConfig {
    fn default() -> Self {
        GradientConfig { enabled: false, smoothing_width: 1, percentile: 90. }
    }
}

/// Output file names, relative to `directory` (or to the sweep directory if unset)
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub directory: Option<PathBuf>,
    pub matrix: String,
    pub knee_by_row: String,
    pub knee_by_column: String,
    pub gradient: String,
    pub rapid_mask: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: None,
            matrix: String::from("sweep_matrix.csv"),
            knee_by_row: String::from("knee_by_row.csv"),
            knee_by_column: String::from("knee_by_column.csv"),
            gradient: String::from("gradient_magnitude.csv"),
            rapid_mask: String::from("rapid_region_mask.csv"),
        }
    }
}

/// Full set of settings for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub sweep: SweepConfig,
    pub loader: TraceLoaderSettings,
    pub mode: AnalysisMode,
    pub knee: KneeConfig,
    pub gradient: GradientConfig,
    pub output: OutputConfig,
}

impl AnalysisConfig {
    /// Reads configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.as_ref().display(), e)))?;

        AnalysisConfig::from_toml_str(&content)
    }

    /// Reads configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Value = from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let sweep_table = config.get("sweep")
            .ok_or_else(|| ConfigError::MissingField(String::from("sweep")))?;
        let empty = empty_table();

        let sweep = get_sweep_config(sweep_table)?;
        let loader = get_loader_settings(config.get("trace").unwrap_or(&empty))?;
        let mode = get_analysis_mode(config.get("analysis").unwrap_or(&empty))?;
        let knee = get_knee_config(config.get("knee").unwrap_or(&empty))?;
        let gradient = get_gradient_config(config.get("gradient").unwrap_or(&empty))?;
        let output = get_output_config(config.get("output").unwrap_or(&empty))?;

        Ok(AnalysisConfig { sweep, loader, mode, knee, gradient, output })
    }

    /// Directory outputs are written to
    pub fn output_directory(&self) -> PathBuf {
        self.output.directory.clone().unwrap_or_else(|| self.sweep.directory.clone())
    }
}

fn get_axis(table: &Value, default_name: &str) -> Result<SweepAxis, ConfigError> {
    let name: String = parse_value_with_default(table, "name", parse_string, String::from(default_name))?;
    let values: Vec<u32> = parse_required(table, "values", parse_u32_array)?;
    info!("{}: {:?}", name, values);

    let aliases = parse_value_with_default(table, "aliases", parse_aliases, vec![])?;
    if !aliases.is_empty() {
        info!("{} aliases (display, file): {:?}", name, aliases);
    }

    let percent_scale = match table.get("max") {
        Some(value) => Some(parse_f64(value, "max")?),
        None => None,
    };
    let percent_decimals = match table.get("percent_decimals") {
        Some(value) => Some(parse_usize(value, "percent_decimals")?),
        None => None,
    };

    Ok(
        SweepAxis {
            name,
            values,
            aliases,
            percent_scale,
            percent_decimals,
        }
    )
}

fn get_sweep_config(table: &Value) -> Result<SweepConfig, ConfigError> {
    let directory: String = parse_required(table, "directory", parse_string)?;
    info!("directory: {}", directory);

    let prefix: String = parse_required(table, "prefix", parse_string)?;
    let row_marker = parse_value_with_default(table, "row_marker", parse_string, String::from("R"))?;
    let col_marker = parse_value_with_default(table, "col_marker", parse_string, String::from("C"))?;
    let extension = parse_value_with_default(table, "extension", parse_string, String::from("txt"))?;
    info!("pattern: {}_{}*_{}*.{}", prefix, row_marker, col_marker, extension);

    let recursive = parse_value_with_default(table, "recursive", parse_bool, false)?;
    info!("recursive: {}", recursive);

    let parallel = parse_value_with_default(table, "parallel", parse_bool, true)?;
    info!("parallel: {}", parallel);

    let duplicates: String = parse_value_with_default(
        table, "duplicates", parse_string, String::from("last_write_wins")
    )?;
    let duplicates = match duplicates.as_str() {
        "last_write_wins" => DuplicatePolicy::LastWriteWins,
        "reject" => DuplicatePolicy::Reject,
        _ => return Err(invalid("duplicates", "'last_write_wins' or 'reject'")),
    };
    info!("duplicates: {:?}", duplicates);

    let rows = get_axis(
        table.get("rows").ok_or_else(|| ConfigError::MissingField(String::from("sweep.rows")))?,
        "row",
    )?;
    let columns = get_axis(
        table.get("columns").ok_or_else(|| ConfigError::MissingField(String::from("sweep.columns")))?,
        "column",
    )?;

    Ok(
        SweepConfig {
            directory: PathBuf::from(directory),
            prefix,
            row_marker,
            col_marker,
            extension,
            recursive,
            parallel,
            duplicates,
            rows,
            columns,
        }
    )
}

fn get_loader_settings(table: &Value) -> Result<TraceLoaderSettings, ConfigError> {
    let defaults = TraceLoaderSettings::default();

    let header_lines = parse_value_with_default(table, "header_lines", parse_usize, defaults.header_lines)?;

    let delimiter: String = parse_value_with_default(table, "delimiter", parse_string, String::from("comma"))?;
    let delimiter = match delimiter.as_str() {
        "comma" => Delimiter::Comma,
        "whitespace" => Delimiter::Whitespace,
        "auto" => Delimiter::Auto,
        _ => return Err(invalid("delimiter", "'comma', 'whitespace' or 'auto'")),
    };

    let tolerance: String = parse_value_with_default(table, "tolerance", parse_string, String::from("strict"))?;
    let tolerance = match tolerance.as_str() {
        "strict" => ParseTolerance::Strict,
        "drop_malformed" => ParseTolerance::DropMalformed,
        _ => return Err(invalid("tolerance", "'strict' or 'drop_malformed'")),
    };

    info!("header_lines: {}, delimiter: {:?}, tolerance: {:?}", header_lines, delimiter, tolerance);

    Ok(TraceLoaderSettings { header_lines, delimiter, tolerance })
}

fn get_analysis_mode(table: &Value) -> Result<AnalysisMode, ConfigError> {
    let (start, end) = parse_value_with_default(table, "window", parse_f64_pair, (1000., 6000.))?;
    let window = AnalysisWindow::new(start, end);
    info!("window: {}-{} ms", start, end);

    let mode: String = parse_value_with_default(table, "mode", parse_string, String::from("band_power"))?;
    info!("mode: {}", mode);

    match mode.as_str() {
        "band_power" => {
            let spectral_defaults = SpectralSettings::default();

            let (low, high) = parse_value_with_default(table, "band", parse_f64_pair, (5., 15.))?;
            let hann = parse_value_with_default(table, "hann", parse_bool, spectral_defaults.hann)?;
            let detrend_linear = parse_value_with_default(
                table, "detrend_linear", parse_bool, spectral_defaults.detrend_linear
            )?;
            info!(
                "band: {}-{} Hz, hann: {}, detrend_linear: {}",
                low, high, hann, detrend_linear,
            );

            Ok(
                AnalysisMode::BandPower(SpectralSettings {
                    window,
                    band: FrequencyBand::new(low, high),
                    hann,
                    detrend_linear,
                })
            )
        },
        "firing_rate" => {
            let threshold_defaults = HysteresisThresholds::default();

            let high = parse_value_with_default(table, "threshold_high", parse_f64, threshold_defaults.high)?;
            let low = parse_value_with_default(table, "threshold_low", parse_f64, threshold_defaults.low)?;
            info!("threshold_high: {} mV, threshold_low: {} mV", high, low);

            Ok(
                AnalysisMode::FiringRate(SpikeSettings {
                    window,
                    thresholds: HysteresisThresholds { high, low },
                })
            )
        },
        _ => Err(invalid("mode", "'band_power' or 'firing_rate'")),
    }
}

fn parse_knee_method(value: &Value, field_name: &str) -> Result<KneeMethod, ConfigError> {
    match parse_string(value, field_name)?.as_str() {
        "max_gradient" => Ok(KneeMethod::MaxGradient),
        "max_drop" => Ok(KneeMethod::MaxDrop),
        _ => Err(invalid(field_name, "'max_gradient' or 'max_drop'")),
    }
}

fn get_knee_config(table: &Value) -> Result<KneeConfig, ConfigError> {
    let defaults = KneeConfig::default();

    let enabled = parse_value_with_default(table, "enabled", parse_bool, defaults.enabled)?;
    let smoothing_width = parse_value_with_default(
        table, "smoothing_width", parse_usize, defaults.settings.smoothing_width
    )?;
    let monotone_decreasing = parse_value_with_default(
        table, "monotone_decreasing", parse_bool, defaults.settings.monotone_decreasing
    )?;
    let row_method = parse_value_with_default(table, "row_method", parse_knee_method, defaults.row_method)?;
    let column_method = parse_value_with_default(
        table, "column_method", parse_knee_method, defaults.column_method
    )?;
    info!(
        "knee: {}, smoothing_width: {}, monotone_decreasing: {}",
        enabled, smoothing_width, monotone_decreasing,
    );

    Ok(
        KneeConfig {
            enabled,
            settings: KneeSettings { smoothing_width, monotone_decreasing },
            row_method,
            column_method,
        }
    )
}

fn get_gradient_config(table: &Value) -> Result<GradientConfig, ConfigError> {
    let defaults = GradientConfig::default();

    let enabled = parse_value_with_default(table, "enabled", parse_bool, defaults.enabled)?;
    let smoothing_width = parse_value_with_default(
        table, "smoothing_width", parse_usize, defaults.smoothing_width
    )?;
    let percentile = parse_value_with_default(table, "percentile", parse_f64, defaults.percentile)?;
    if !(0. ..=100.).contains(&percentile) {
        return Err(invalid("percentile", "number between 0 and 100"));
    }

    Ok(GradientConfig { enabled, smoothing_width, percentile })
}

fn get_output_config(table: &Value) -> Result<OutputConfig, ConfigError> {
    let defaults = OutputConfig::default();

    let directory = match table.get("directory") {
        Some(value) => Some(PathBuf::from(parse_string(value, "directory")?)),
        None => None,
    };

    Ok(
        OutputConfig {
            directory,
            matrix: parse_value_with_default(table, "matrix", parse_string, defaults.matrix)?,
            knee_by_row: parse_value_with_default(table, "knee_by_row", parse_string, defaults.knee_by_row)?,
            knee_by_column: parse_value_with_default(
                table, "knee_by_column", parse_string, defaults.knee_by_column
            )?,
            gradient: parse_value_with_default(table, "gradient", parse_string, defaults.gradient)?,
            rapid_mask: parse_value_with_default(table, "rapid_mask", parse_string, defaults.rapid_mask)?,
        }
    )
}
