//! Locating the knee (steepest or largest single step decline) of each row and column
//! of a sweep matrix, with optional smoothing and monotone (isotonic) regression.

use std::{path::Path, result::Result};
use crate::error::SweepError;
use crate::sweep::{format_cell, SweepAxis, SweepMatrix};


/// Which knee position is reported for a row or column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KneeMethod {
    /// Midpoint of the step with the largest absolute slope
    MaxGradient,
    /// Midpoint of the step with the largest decrease in value
    MaxDrop,
}

/// Settings used when estimating knees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KneeSettings {
    /// Width of the moving average applied before estimation, `1` disables smoothing,
    /// even widths are widened by one
    pub smoothing_width: usize,
    /// Use `true` to fit a non increasing sequence with pool adjacent violators before estimation
    pub monotone_decreasing: bool,
}

impl Default for KneeSettings {
    fn default() -> Self {
        KneeSettings { smoothing_width: 1, monotone_decreasing: false }
    }
}

/// Edge padded moving average with an odd window
pub fn moving_average(values: &[f64], width: usize) -> Vec<f64> {
    if width <= 1 || values.len() < 2 {
        return values.to_vec();
    }

    let width = if width % 2 == 0 { width + 1 } else { width };
    let pad = width / 2;
    let last = values.len() - 1;

    (0..values.len())
        .map(|i| {
            (0..width)
                .map(|k| {
                    let idx = (i + k) as isize - pad as isize;
                    values[idx.clamp(0, last as isize) as usize]
                })
                .sum::<f64>() / width as f64
        })
        .collect()
}

/// Isotonic regression to a non decreasing sequence using pool adjacent violators,
/// `weights` default to `1.`
pub fn isotonic_increasing(values: &[f64], weights: Option<&[f64]>) -> Vec<f64> {
    // (sum of weights, weighted sum, number of points) per block
    let mut blocks: Vec<(f64, f64, usize)> = values.iter()
        .enumerate()
        .map(|(i, y)| {
            let w = weights.map_or(1., |w| w[i]);
            (w, w * y, 1)
        })
        .collect();

    let mut i = 0;
    while i + 1 < blocks.len() {
        let current = blocks[i].1 / blocks[i].0;
        let next = blocks[i + 1].1 / blocks[i + 1].0;

        if current > next {
            let merged = blocks.remove(i + 1);
            blocks[i].0 += merged.0;
            blocks[i].1 += merged.1;
            blocks[i].2 += merged.2;

            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }

    blocks.iter()
        .flat_map(|(sw, sy, len)| std::iter::repeat(sy / sw).take(*len))
        .collect()
}

/// Isotonic regression to a non increasing sequence
pub fn isotonic_decreasing(values: &[f64], weights: Option<&[f64]>) -> Vec<f64> {
    let negated: Vec<f64> = values.iter().map(|y| -y).collect();

    isotonic_increasing(&negated, weights).iter()
        .map(|y| -y)
        .collect()
}

/// Position midway between the two levels bracketing the steepest step `|dy / dx|`,
/// `f64::NAN` if there are fewer than two points or every slope is zero
pub fn steepest_step_knee(x: &[f64], y: &[f64]) -> f64 {
    let mut best: Option<(usize, f64)> = None;

    for j in 0..x.len().min(y.len()).saturating_sub(1) {
        let slope = ((y[j + 1] - y[j]) / (x[j + 1] - x[j])).abs();
        if !slope.is_finite() {
            continue;
        }

        if best.map_or(true, |(_, current)| slope > current) {
            best = Some((j, slope));
        }
    }

    match best {
        Some((j, slope)) if slope > 0. => 0.5 * (x[j] + x[j + 1]),
        _ => f64::NAN,
    }
}

/// Size and location of the largest single step decrease of a sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropMetrics {
    /// Midpoint of the two levels bracketing the drop
    pub position: f64,
    /// Decrease in value
    pub drop_abs: f64,
    /// Decrease relative to `max - min` of the sequence
    pub rel_range: f64,
    /// Decrease relative to the value before the drop
    pub rel_level: f64,
}

impl DropMetrics {
    pub fn undefined() -> Self {
        DropMetrics {
            position: f64::NAN,
            drop_abs: f64::NAN,
            rel_range: f64::NAN,
            rel_level: f64::NAN,
        }
    }
}

/// Finds the largest decrease `y[j] - y[j + 1]`, all metrics are `f64::NAN` if there are fewer
/// than two points or the sequence never decreases, relative metrics are `f64::NAN` when their
/// denominator is not positive
pub fn largest_drop(x: &[f64], y: &[f64]) -> DropMetrics {
    let mut best: Option<(usize, f64)> = None;

    for j in 0..x.len().min(y.len()).saturating_sub(1) {
        let drop = y[j] - y[j + 1];
        if !drop.is_finite() {
            continue;
        }

        if best.map_or(true, |(_, current)| drop > current) {
            best = Some((j, drop));
        }
    }

    let (j, drop_abs) = match best {
        Some((j, drop)) if drop > 0. => (j, drop),
        _ => return DropMetrics::undefined(),
    };

    let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = y.iter().copied().fold(f64::INFINITY, f64::min);
    let dynamic_range = max - min;

    DropMetrics {
        position: 0.5 * (x[j] + x[j + 1]),
        drop_abs,
        rel_range: if dynamic_range > 0. { drop_abs / dynamic_range } else { f64::NAN },
        rel_level: if y[j] > 0. { drop_abs / y[j] } else { f64::NAN },
    }
}

/// Knee estimates for one sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KneeEstimate {
    /// Knee by largest absolute slope
    pub gradient_knee: f64,
    /// Largest drop and its knee
    pub drop: DropMetrics,
}

impl KneeEstimate {
    pub fn undefined() -> Self {
        KneeEstimate { gradient_knee: f64::NAN, drop: DropMetrics::undefined() }
    }

    pub fn knee(&self, method: KneeMethod) -> f64 {
        match method {
            KneeMethod::MaxGradient => self.gradient_knee,
            KneeMethod::MaxDrop => self.drop.position,
        }
    }
}

/// Estimates the knee of a sequence of `values` observed at `levels`, missing (`NaN`) values
/// are dropped first and fewer than two remaining points give an undefined estimate
pub fn estimate_knee(levels: &[f64], values: &[f64], settings: &KneeSettings) -> KneeEstimate {
    let (x, y): (Vec<f64>, Vec<f64>) = levels.iter()
        .zip(values.iter())
        .filter(|(_, v)| !v.is_nan())
        .map(|(l, v)| (*l, *v))
        .unzip();

    if x.len() < 2 {
        return KneeEstimate::undefined();
    }

    let smoothed = moving_average(&y, settings.smoothing_width);
    let y_use = if settings.monotone_decreasing {
        isotonic_decreasing(&smoothed, None)
    } else {
        smoothed
    };

    KneeEstimate {
        gradient_knee: steepest_step_knee(&x, &y_use),
        drop: largest_drop(&x, &y_use),
    }
}

/// Maps a position along a monotone axis onto a fractional index by linear
/// interpolation, positions past either end clamp to that end
pub fn axis_index_position(axis: &[f64], position: f64) -> f64 {
    if position.is_nan() || axis.is_empty() {
        return f64::NAN;
    }
    if axis.len() == 1 {
        return 0.;
    }

    let last = axis.len() - 1;
    let ascending = axis[last] >= axis[0];
    let (low_end, high_end) = if ascending { (0, last) } else { (last, 0) };

    if position <= axis[low_end] {
        return low_end as f64;
    }
    if position >= axis[high_end] {
        return high_end as f64;
    }

    for k in 0..last {
        let (a, b) = (axis[k], axis[k + 1]);
        if (a <= position && position <= b) || (b <= position && position <= a) {
            if a == b {
                return k as f64;
            }

            return k as f64 + (position - a) / (b - a);
        }
    }

    f64::NAN
}

/// Knee estimate of one row or column
#[derive(Debug, Clone, PartialEq)]
pub struct KneeRecord {
    /// Label of the level the row or column was taken at
    pub level: String,
    pub estimate: KneeEstimate,
    /// Reported knee position along the swept axis
    pub knee: f64,
    /// Reported knee as a fractional index into the swept axis
    pub knee_index: f64,
}

/// Knee estimates for every row or every column of a matrix
#[derive(Debug, Clone, PartialEq)]
pub struct KneeTable {
    /// Name of the axis each record is taken at
    pub level_name: String,
    /// Name of the axis the knee is located along
    pub along_name: String,
    pub method: KneeMethod,
    pub records: Vec<KneeRecord>,
}

impl KneeTable {
    /// Writes one line per level with knee position, knee index, absolute drop,
    /// drop relative to range and drop relative to level, undefined values are left empty
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), SweepError> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record([
            self.level_name.clone(),
            format!("knee_{}_value", self.along_name),
            String::from("knee_index"),
            String::from("abs_drop"),
            String::from("rel_drop_range"),
            String::from("rel_drop_level"),
        ])?;

        for record in &self.records {
            writer.write_record([
                record.level.clone(),
                format_cell(record.knee),
                format_cell(record.knee_index),
                format_cell(record.estimate.drop.drop_abs),
                format_cell(record.estimate.drop.rel_range),
                format_cell(record.estimate.drop.rel_level),
            ])?;
        }

        writer.flush()?;

        Ok(())
    }
}

fn knee_table(
    level_axis: &SweepAxis,
    along_axis: &SweepAxis,
    sequences: Vec<Vec<f64>>,
    settings: &KneeSettings,
    method: KneeMethod,
) -> KneeTable {
    let positions = along_axis.positions();

    let records = level_axis.labels().into_iter()
        .zip(sequences)
        .map(|(level, values)| {
            let estimate = estimate_knee(&positions, &values, settings);
            let knee = estimate.knee(method);

            KneeRecord {
                level,
                estimate,
                knee,
                knee_index: axis_index_position(&positions, knee),
            }
        })
        .collect();

    KneeTable {
        level_name: level_axis.name.clone(),
        along_name: along_axis.name.clone(),
        method,
        records,
    }
}

/// Estimates the knee along the column axis for every row of the matrix
pub fn analyze_rows(matrix: &SweepMatrix, settings: &KneeSettings, method: KneeMethod) -> KneeTable {
    let sequences = (0..matrix.rows.len()).map(|i| matrix.row(i)).collect();

    knee_table(&matrix.rows, &matrix.columns, sequences, settings, method)
}

/// Estimates the knee along the row axis for every column of the matrix
pub fn analyze_columns(matrix: &SweepMatrix, settings: &KneeSettings, method: KneeMethod) -> KneeTable {
    let sequences = (0..matrix.columns.len()).map(|j| matrix.column(j)).collect();

    knee_table(&matrix.columns, &matrix.rows, sequences, settings, method)
}
