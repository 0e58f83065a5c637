//! # Retinal Sweeps
//!
//! `retinal_sweeps` analyzes membrane potential time series produced by a retinal circuit
//! simulator over two dimensional parameter sweeps (for example rod survival against cone
//! survival, or two synaptic conductances). Each trace is reduced to a scalar, either the
//! spectral band power of the cropped potential or the firing rate from hysteresis spike
//! detection, and the scalars are assembled into a matrix indexed by the two swept parameters.
//! Knees (points of steepest or largest decline) can then be located along every row and
//! column of the matrix.
//!
//! ## Example Code
//!
//! ### Band power of a trace
//!
//! ```rust
//! use std::f64::consts::PI;
//! use retinal_sweeps::{
//!     spectral::{band_power, FrequencyBand, SpectralSettings},
//!     trace::{AnalysisWindow, Trace},
//! };
//!
//! // 10 Hz oscillation with an amplitude of 2 mV sampled every 1 ms
//! let time: Vec<f64> = (0..7000).map(|i| i as f64).collect();
//! let value: Vec<f64> = time.iter()
//!     .map(|t| -60. + 2. * (2. * PI * 10. * t / 1000.).sin())
//!     .collect();
//! let trace = Trace::new(time, value).unwrap();
//!
//! let settings = SpectralSettings {
//!     window: AnalysisWindow::new(1000., 6000.),
//!     band: FrequencyBand::new(5., 15.),
//!     hann: true,
//!     detrend_linear: false,
//! };
//!
//! // power of a sinusoid is amplitude squared over two
//! let power = band_power(&trace, &settings).unwrap();
//! assert!((power - 2.).abs() < 0.2);
//! ```
//!
//! ### Firing rate with hysteresis
//!
//! ```rust
//! use retinal_sweeps::{
//!     spikes::{firing_rate, HysteresisThresholds, SpikeSettings},
//!     trace::{AnalysisWindow, Trace},
//! };
//!
//! // a 5 ms spike to +20 mV every 500 ms from a -65 mV rest
//! let time: Vec<f64> = (0..7000).map(|i| i as f64).collect();
//! let value: Vec<f64> = time.iter()
//!     .map(|t| if (*t as usize) % 500 < 5 { 20. } else { -65. })
//!     .collect();
//! let trace = Trace::new(time, value).unwrap();
//!
//! let settings = SpikeSettings {
//!     window: AnalysisWindow::new(1000., 6000.),
//!     thresholds: HysteresisThresholds { high: 0., low: -20. },
//! };
//!
//! // the spike already underway at 1000 ms is not counted, the ones beginning
//! // at 1500, 2000, ..., 6000 ms are
//! assert_eq!(firing_rate(&trace, &settings).unwrap(), 2.);
//! ```
//!
//! ### Sweeping a directory
//!
//! ```rust,no_run
//! use retinal_sweeps::{
//!     knee::{analyze_rows, KneeMethod, KneeSettings},
//!     spikes::SpikeSettings,
//!     sweep::{
//!         build_sweep_matrix, DuplicatePolicy, FilenamePattern,
//!         FiringRateMetric, SweepAxis, SweepSettings,
//!     },
//!     trace::TraceLoaderSettings,
//! };
//!
//! let settings = SweepSettings {
//!     directory: "ON_GC_fovea".into(),
//!     pattern: FilenamePattern::new("ON_GC", "R", "C", "txt").unwrap(),
//!     rows: SweepAxis::new("Rod", vec![400, 360, 320, 280, 240, 200, 160, 120, 80, 40, 1]),
//!     columns: SweepAxis::new("Cone", vec![20, 18, 16, 14, 12, 10, 8, 6, 4, 2, 0]),
//!     recursive: false,
//!     parallel: true,
//!     duplicates: DuplicatePolicy::LastWriteWins,
//! };
//! let metric = FiringRateMetric {
//!     loader: TraceLoaderSettings::default(),
//!     settings: SpikeSettings::default(),
//! };
//!
//! let report = build_sweep_matrix(&settings, &metric).unwrap();
//! println!("computed {}/{} cells", report.populated, report.expected);
//!
//! let knees = analyze_rows(&report.matrix, &KneeSettings::default(), KneeMethod::MaxGradient);
//! knees.write_csv("knee_by_rod.csv").unwrap();
//! ```

pub mod config;
pub mod error;
pub mod gradient;
pub mod knee;
pub mod pipeline;
pub mod spectral;
pub mod spikes;
pub mod sweep;
pub mod trace;
