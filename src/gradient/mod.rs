//! Gradient magnitude of a sweep matrix over its percentage scaled axes and the
//! region of most rapid change.

use ndarray::{Array2, Axis};
use crate::knee::moving_average;


/// Applies [`moving_average`] along every row and then along every column
pub fn smooth_grid(grid: &Array2<f64>, width: usize) -> Array2<f64> {
    let mut smoothed = grid.clone();
    if width <= 1 {
        return smoothed;
    }

    for mut row in smoothed.axis_iter_mut(Axis(0)) {
        let averaged = moving_average(&row.to_vec(), width);
        row.iter_mut().zip(averaged).for_each(|(cell, v)| *cell = v);
    }

    for mut column in smoothed.axis_iter_mut(Axis(1)) {
        let averaged = moving_average(&column.to_vec(), width);
        column.iter_mut().zip(averaged).for_each(|(cell, v)| *cell = v);
    }

    smoothed
}

// derivative of `values` against `positions` at index `i`, central in the
// interior and one sided at the ends
fn derivative_at(values: &[f64], positions: &[f64], i: usize) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.;
    }

    let (a, b) = if i == 0 {
        (0, 1)
    } else if i == n - 1 {
        (n - 2, n - 1)
    } else {
        (i - 1, i + 1)
    };

    (values[a] - values[b]) / (positions[a] - positions[b])
}

/// Calculates `sqrt(gx^2 + gy^2)` where `gx` is the derivative along columns against
/// `col_positions` and `gy` the derivative along rows against `row_positions`
pub fn gradient_magnitude(grid: &Array2<f64>, row_positions: &[f64], col_positions: &[f64]) -> Array2<f64> {
    let (num_rows, num_cols) = grid.dim();
    let mut magnitude = Array2::zeros((num_rows, num_cols));

    for i in 0..num_rows {
        let row = grid.row(i).to_vec();
        for j in 0..num_cols {
            let column = grid.column(j).to_vec();

            let gx = derivative_at(&row, col_positions, j);
            let gy = derivative_at(&column, row_positions, i);

            magnitude[[i, j]] = (gx.powi(2) + gy.powi(2)).sqrt();
        }
    }

    magnitude
}

/// Percentile `q` (0 to 100) of the non `NaN` values with linear interpolation,
/// `f64::NAN` if there are no such values
pub fn nan_percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }

    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0., 100.) / 100.) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Marks with `1` every cell whose gradient is at or above the given percentile of all
/// gradients, other cells (including `NaN` cells) are `0`
pub fn rapid_region_mask(gradient: &Array2<f64>, percentile: f64) -> Array2<u8> {
    let values: Vec<f64> = gradient.iter().copied().collect();
    let threshold = nan_percentile(&values, percentile);

    gradient.mapv(|g| if g >= threshold { 1 } else { 0 })
}
