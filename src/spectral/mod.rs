//! A set of tools to estimate the one sided power spectral density of a cropped
//! membrane potential trace and integrate it over a frequency band.

use std::{f64::consts::PI, result::Result};
use ndarray::Array1;
use num_complex::Complex;
use rustfft::{FftPlanner, FftDirection};
use crate::error::SpectralError;
use crate::trace::{AnalysisWindow, Trace};


/// Closed interval of frequencies (Hz) to integrate power over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    /// Lower edge of band (Hz)
    pub low: f64,
    /// Upper edge of band (Hz)
    pub high: f64,
}

impl FrequencyBand {
    pub fn new(low: f64, high: f64) -> Self {
        FrequencyBand { low, high }
    }

    pub fn contains(&self, f: f64) -> bool {
        f >= self.low && f <= self.high
    }
}

impl Default for FrequencyBand {
    fn default() -> Self {
        FrequencyBand { low: 5., high: 15. }
    }
}

/// Settings used by [`band_power`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralSettings {
    /// Samples outside of this window are discarded before estimation
    pub window: AnalysisWindow,
    /// Band to integrate power spectral density over
    pub band: FrequencyBand,
    /// Use `true` to taper the signal with a Hann window
    pub hann: bool,
    /// Use `true` to subtract a least squares linear fit over time (s)
    pub detrend_linear: bool,
}

impl Default for SpectralSettings {
    fn default() -> Self {
        SpectralSettings {
            window: AnalysisWindow::default(),
            band: FrequencyBand::default(),
            hann: true,
            detrend_linear: false,
        }
    }
}

/// Median of the given values, `None` if empty
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.)
    } else {
        Some(sorted[mid])
    }
}

/// Calculates the sampling rate (Hz) from sample times (ms) using the median
/// difference between consecutive samples
pub fn sampling_rate(time: &[f64]) -> Result<f64, SpectralError> {
    let deltas: Vec<f64> = time.windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect();

    let dt = median(&deltas).ok_or_else(|| SpectralError::DegenerateInput(
        String::from("at least two samples are required to estimate sampling rate")
    ))?;

    let fs = 1000. / dt;
    if !fs.is_finite() || fs <= 0. {
        return Err(SpectralError::DegenerateInput(
            format!("cannot derive sampling rate from median step of {} ms", dt)
        ));
    }

    Ok(fs)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Removes the least squares line `slope * t + intercept` from `values`,
/// if `t` has no spread only the mean is removed
pub fn remove_linear_trend(values: &[f64], t: &[f64]) -> Vec<f64> {
    let t_mean = mean(t);
    let v_mean = mean(values);

    let covariance: f64 = t.iter().zip(values)
        .map(|(ti, vi)| (ti - t_mean) * (vi - v_mean))
        .sum();
    let variance: f64 = t.iter()
        .map(|ti| (ti - t_mean).powi(2))
        .sum();

    let slope = if variance > 0. { covariance / variance } else { 0. };
    let intercept = v_mean - slope * t_mean;

    values.iter().zip(t)
        .map(|(vi, ti)| vi - (slope * ti + intercept))
        .collect()
}

/// Generates a symmetric Hann window of length `n`
pub fn hann_window(n: usize) -> Array1<f64> {
    if n == 1 {
        return Array1::ones(1);
    }

    Array1::from_iter(
        (0..n).map(|i| 0.5 - 0.5 * (2. * PI * i as f64 / (n - 1) as f64).cos())
    )
}

/// Retrieves the one sided power spectral density of `x` sampled at `fs` (Hz),
/// returns tuple of frequency axis (Hz) and density respectively,
/// density is scaled by `fs * N * U` where `U` is the mean square of the taper
/// and every bin except DC and (for even `N`) Nyquist is doubled
pub fn one_sided_psd(
    x: &[f64],
    fs: f64,
    hann: bool,
    remove_mean: bool,
) -> Result<(Array1<f64>, Array1<f64>), SpectralError> {
    let n = x.len();
    if n == 0 {
        return Err(SpectralError::DegenerateInput(String::from("empty signal")));
    }

    let x_mean = if remove_mean { mean(x) } else { 0. };

    let taper = if hann { hann_window(n) } else { Array1::ones(n) };
    let u = taper.mapv(|w| w * w).sum() / n as f64;
    if u <= 0. {
        return Err(SpectralError::DegenerateInput(String::from("taper has no energy")));
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft(n, FftDirection::Forward);

    let mut x_fft: Vec<Complex<f64>> = x.iter()
        .zip(taper.iter())
        .map(|(x_i, w_i)| Complex::new((x_i - x_mean) * w_i, 0.0))
        .collect();

    fft.process(&mut x_fft);

    let num_bins = n / 2 + 1;
    let scale = fs * n as f64 * u;
    let last_doubled = if n % 2 == 0 { num_bins - 1 } else { num_bins };

    let pxx: Array1<f64> = Array1::from_iter(
        x_fft.iter()
            .take(num_bins)
            .enumerate()
            .map(|(k, val)| {
                let power = val.norm_sqr() / scale;
                if k >= 1 && k < last_doubled { 2. * power } else { power }
            })
    );

    let faxis: Array1<f64> = Array1::from_iter(
        (0..num_bins).map(|k| k as f64 * fs / n as f64)
    );

    Ok((faxis, pxx))
}

/// Integrates `y` against `x` with the trapezoidal rule
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(ys, xs)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}

/// Integrates power spectral density over the bins within `band`,
/// returns `0.` if the band is empty or no bins fall inside of it
pub fn band_integral(faxis: &Array1<f64>, pxx: &Array1<f64>, band: &FrequencyBand) -> f64 {
    if band.high <= band.low {
        return 0.;
    }

    let (f_in, p_in): (Vec<f64>, Vec<f64>) = faxis.iter()
        .zip(pxx.iter())
        .filter(|(f, _)| band.contains(**f))
        .map(|(f, p)| (*f, *p))
        .unzip();

    if f_in.is_empty() {
        return 0.;
    }

    trapezoid(&p_in, &f_in)
}

/// Calculates the band power of a trace by cropping it to `settings.window`, estimating
/// sampling rate from the median time step, removing the mean (and optionally a linear trend),
/// optionally applying a Hann taper, and integrating the one sided power spectral density over
/// `settings.band`, non-finite inputs propagate into the result
pub fn band_power(trace: &Trace, settings: &SpectralSettings) -> Result<f64, SpectralError> {
    let cropped = trace.crop(&settings.window)?;
    if cropped.len() < 2 {
        return Err(SpectralError::DegenerateInput(
            format!("{} sample(s) in window, at least two are required", cropped.len())
        ));
    }

    let fs = sampling_rate(&cropped.time)?;

    let signal = if settings.detrend_linear {
        let t_seconds: Vec<f64> = cropped.time.iter().map(|t| t * 1e-3).collect();
        remove_linear_trend(&cropped.value, &t_seconds)
    } else {
        cropped.value
    };

    let (faxis, pxx) = one_sided_psd(&signal, fs, settings.hann, true)?;

    Ok(band_integral(&faxis, &pxx, &settings.band))
}
