//! Runs a configured analysis end to end: builds the sweep matrix, estimates knees
//! and gradients, and writes every table to the output directory.

use std::{fs, path::PathBuf, result::Result};
use log::info;
use ndarray::Array2;
use crate::config::{AnalysisConfig, AnalysisMode};
use crate::error::{SweepAnalysisError, SweepError};
use crate::gradient::{gradient_magnitude, smooth_grid, rapid_region_mask};
use crate::knee::{analyze_columns, analyze_rows, KneeTable};
use crate::sweep::{
    build_sweep_matrix, write_grid_csv, BandPowerMetric, CellMetric, FiringRateMetric, SweepReport,
};


/// Everything computed during a run, along with the files that were written
#[derive(Debug, Clone)]
pub struct AnalysisOutputs {
    pub report: SweepReport,
    /// Knee of each row along the column axis
    pub row_knees: Option<KneeTable>,
    /// Knee of each column along the row axis
    pub column_knees: Option<KneeTable>,
    pub gradient: Option<Array2<f64>>,
    pub rapid_mask: Option<Array2<u8>>,
    pub written: Vec<PathBuf>,
}

/// Generates the per file metric for the configured mode
pub fn metric_for(config: &AnalysisConfig) -> Box<dyn CellMetric> {
    match config.mode {
        AnalysisMode::BandPower(settings) => Box::new(BandPowerMetric { loader: config.loader, settings }),
        AnalysisMode::FiringRate(settings) => Box::new(FiringRateMetric { loader: config.loader, settings }),
    }
}

/// Builds the sweep matrix and writes the matrix, knee tables and gradient tables,
/// outputs are written even when coverage is incomplete
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisOutputs, SweepAnalysisError> {
    let settings = config.sweep.to_settings()?;
    let metric = metric_for(config);

    let report = build_sweep_matrix(&settings, metric.as_ref())?;
    let matrix = &report.matrix;

    let output_directory = config.output_directory();
    fs::create_dir_all(&output_directory).map_err(SweepError::from)?;

    let mut written = vec![];

    let matrix_path = output_directory.join(&config.output.matrix);
    matrix.write_csv(&matrix_path)?;
    written.push(matrix_path);

    let (row_knees, column_knees) = if config.knee.enabled {
        let row_knees = analyze_rows(matrix, &config.knee.settings, config.knee.row_method);
        let column_knees = analyze_columns(matrix, &config.knee.settings, config.knee.column_method);

        let row_path = output_directory.join(&config.output.knee_by_row);
        row_knees.write_csv(&row_path)?;
        written.push(row_path);

        let column_path = output_directory.join(&config.output.knee_by_column);
        column_knees.write_csv(&column_path)?;
        written.push(column_path);

        (Some(row_knees), Some(column_knees))
    } else {
        (None, None)
    };

    let (gradient, rapid_mask) = if config.gradient.enabled {
        let smoothed = smooth_grid(&matrix.cells, config.gradient.smoothing_width);
        let gradient = gradient_magnitude(
            &smoothed, &matrix.rows.percentages(), &matrix.columns.percentages(),
        );
        let rapid_mask = rapid_region_mask(&gradient, config.gradient.percentile);

        let row_labels = matrix.rows.labels();
        let col_labels = matrix.columns.labels();

        let gradient_path = output_directory.join(&config.output.gradient);
        write_grid_csv(&gradient_path, &matrix.rows.name, &row_labels, &col_labels, &gradient)?;
        written.push(gradient_path);

        let mask_path = output_directory.join(&config.output.rapid_mask);
        write_grid_csv(
            &mask_path, &matrix.rows.name, &row_labels, &col_labels, &rapid_mask.mapv(f64::from),
        )?;
        written.push(mask_path);

        (Some(gradient), Some(rapid_mask))
    } else {
        (None, None)
    };

    for path in &written {
        info!("saved {}", path.display());
    }

    Ok(
        AnalysisOutputs {
            report,
            row_knees,
            column_knees,
            gradient,
            rapid_mask,
            written,
        }
    )
}
