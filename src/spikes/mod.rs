//! Spike detection on membrane potential traces using a two level (hysteresis)
//! threshold, and conversion of spike counts to firing rates.

use std::result::Result;
use crate::error::SpectralError;
use crate::trace::{AnalysisWindow, Trace};


/// Two thresholds (mV) for detecting spikes, a spike is detected when voltage rises
/// above `high` and another cannot be detected until voltage falls below `low`,
/// `low` is expected to be less than `high`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisThresholds {
    /// Voltage that must be crossed upwards to detect a spike (mV)
    pub high: f64,
    /// Voltage that must be undershot to rearm detection (mV)
    pub low: f64,
}

impl Default for HysteresisThresholds {
    fn default() -> Self {
        HysteresisThresholds { high: 0., low: -20. }
    }
}

/// Settings used by [`firing_rate`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpikeSettings {
    /// Window to count spikes in
    pub window: AnalysisWindow,
    pub thresholds: HysteresisThresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    Armed,
    Disarmed,
}

/// Detects spikes in a voltage series, a spike occurs at index `i` when detection is armed and
/// `values[i - 1] <= high` while `values[i] > high`, detection then rearms once a value
/// falls below `low`, returns the indices of the spikes
pub fn detect_spikes(values: &[f64], thresholds: &HysteresisThresholds) -> Vec<usize> {
    let mut state = DetectorState::Armed;
    let mut spikes = vec![];

    for i in 1..values.len() {
        match state {
            DetectorState::Armed => {
                if values[i - 1] <= thresholds.high && values[i] > thresholds.high {
                    spikes.push(i);
                    state = DetectorState::Disarmed;
                }
            },
            DetectorState::Disarmed => {
                if values[i] < thresholds.low {
                    state = DetectorState::Armed;
                }
            },
        }
    }

    spikes
}

/// Summary of spiking within an analysis window
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeSummary {
    /// Number of spikes detected
    pub spike_count: usize,
    /// Time of the first sample above the high threshold for each spike (ms)
    pub spike_times: Vec<f64>,
    /// Spikes per second within the window (Hz), `f64::NAN` if window has no duration
    pub firing_rate: f64,
}

/// Converts a spike count to a rate (Hz) over `window`, returns `f64::NAN`
/// if the window has zero or negative duration
pub fn rate_from_count(spike_count: usize, window: &AnalysisWindow) -> f64 {
    let duration = window.duration_seconds();

    if duration > 0. {
        spike_count as f64 / duration
    } else {
        f64::NAN
    }
}

/// Detects spikes within the window of the trace and calculates firing rate,
/// fails if no samples fall within the window
pub fn spike_summary(trace: &Trace, settings: &SpikeSettings) -> Result<SpikeSummary, SpectralError> {
    let cropped = trace.crop(&settings.window)?;

    let spikes = detect_spikes(&cropped.value, &settings.thresholds);
    let spike_times = spikes.iter()
        .map(|i| cropped.time[*i])
        .collect::<Vec<f64>>();

    Ok(
        SpikeSummary {
            spike_count: spikes.len(),
            spike_times,
            firing_rate: rate_from_count(spikes.len(), &settings.window),
        }
    )
}

/// Calculates the firing rate (Hz) of the trace within the window
pub fn firing_rate(trace: &Trace, settings: &SpikeSettings) -> Result<f64, SpectralError> {
    Ok(spike_summary(trace, settings)?.firing_rate)
}
