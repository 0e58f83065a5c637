#[cfg(test)]
mod tests {
    use retinal_sweeps::{
        error::SpectralError,
        spikes::{
            detect_spikes, firing_rate, rate_from_count, spike_summary,
            HysteresisThresholds, SpikeSettings,
        },
        trace::{AnalysisWindow, Trace},
    };


    // resting at -70 mV with a 3 sample pulse to +30 mV starting at each onset (ms)
    fn pulse_train(onsets: &[usize], length: usize) -> Trace {
        let time: Vec<f64> = (0..length).map(|i| i as f64).collect();
        let value: Vec<f64> = (0..length)
            .map(|i| {
                if onsets.iter().any(|onset| i >= *onset && i < onset + 3) {
                    30.
                } else {
                    -70.
                }
            })
            .collect();

        Trace::new(time, value).unwrap()
    }

    #[test]
    pub fn test_clean_pulses_counted_once_for_any_thresholds() {
        let onsets = [100, 300, 550, 700, 950];
        let trace = pulse_train(&onsets, 1000);

        let threshold_pairs = [(0., -20.), (-30., -60.), (20., 10.), (29., -69.)];

        for (high, low) in threshold_pairs {
            let thresholds = HysteresisThresholds { high, low };
            let spikes = detect_spikes(&trace.value, &thresholds);

            assert_eq!(spikes, onsets.to_vec(), "thresholds: ({}, {})", high, low);
        }
    }

    #[test]
    pub fn test_dithering_near_threshold_is_one_spike() {
        let values = [-70., 0.5, -0.5, 0.5, -0.5, 0.5, -70., -70.];

        let hysteresis = HysteresisThresholds { high: 0., low: -20. };
        assert_eq!(detect_spikes(&values, &hysteresis), vec![1]);

        // equal thresholds rearm on every dip below the single threshold
        let single_threshold = HysteresisThresholds { high: 0., low: 0. };
        assert_eq!(detect_spikes(&values, &single_threshold), vec![1, 3, 5]);
    }

    #[test]
    pub fn test_rearm_requires_undershoot() {
        // second excursion never falls below -20 mV between pulses
        let values = [-70., 10., -10., 10., -30., 10.];
        let thresholds = HysteresisThresholds::default();

        assert_eq!(detect_spikes(&values, &thresholds), vec![1, 5]);
    }

    #[test]
    pub fn test_first_sample_cannot_spike() {
        let values = [10., 10., -70., 10.];

        assert_eq!(detect_spikes(&values, &HysteresisThresholds::default()), vec![3]);
        assert!(detect_spikes(&[10.], &HysteresisThresholds::default()).is_empty());
        assert!(detect_spikes(&[], &HysteresisThresholds::default()).is_empty());
    }

    #[test]
    pub fn test_ten_spikes_in_five_seconds() {
        let onsets: Vec<usize> = (0..10).map(|i| 1200 + 500 * i).collect();
        let trace = pulse_train(&onsets, 7000);

        let settings = SpikeSettings {
            window: AnalysisWindow::new(1000., 6000.),
            thresholds: HysteresisThresholds::default(),
        };

        assert_eq!(firing_rate(&trace, &settings).unwrap(), 2.);
    }

    #[test]
    pub fn test_seven_crossings_in_window() {
        // onsets outside of the window are excluded
        let onsets = [500, 1100, 1800, 2500, 3300, 4100, 4900, 5700, 6500];
        let trace = pulse_train(&onsets, 7000);

        let settings = SpikeSettings::default();
        let summary = spike_summary(&trace, &settings).unwrap();

        assert_eq!(summary.spike_count, 7);
        assert_eq!(summary.spike_times, vec![1100., 1800., 2500., 3300., 4100., 4900., 5700.]);
        assert_eq!(summary.firing_rate, 1.4);
    }

    #[test]
    pub fn test_no_spikes_is_zero_rate() {
        let trace = pulse_train(&[], 7000);

        assert_eq!(firing_rate(&trace, &SpikeSettings::default()).unwrap(), 0.);
    }

    #[test]
    pub fn test_zero_duration_window_is_undefined() {
        assert!(rate_from_count(3, &AnalysisWindow::new(1000., 1000.)).is_nan());
        assert!(rate_from_count(3, &AnalysisWindow::new(2000., 1000.)).is_nan());
        assert_eq!(rate_from_count(3, &AnalysisWindow::new(0., 1500.)), 2.);

        let trace = pulse_train(&[], 2000);
        let settings = SpikeSettings {
            window: AnalysisWindow::new(1000., 1000.),
            thresholds: HysteresisThresholds::default(),
        };

        let summary = spike_summary(&trace, &settings).unwrap();
        assert_eq!(summary.spike_count, 0);
        assert!(summary.firing_rate.is_nan());
    }

    #[test]
    pub fn test_empty_window_fails() {
        let trace = pulse_train(&[100], 1000);

        let result = firing_rate(&trace, &SpikeSettings::default());
        assert!(matches!(result, Err(SpectralError::EmptyWindow { .. })));
    }
}
