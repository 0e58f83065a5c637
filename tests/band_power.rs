#[cfg(test)]
mod tests {
    use std::f64::consts::PI;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::{Distribution, Normal};
    use retinal_sweeps::{
        error::SpectralError,
        spectral::{
            band_power, hann_window, band_integral, median, one_sided_psd,
            sampling_rate, trapezoid, FrequencyBand, SpectralSettings,
        },
        trace::{AnalysisWindow, Trace},
    };


    fn sinusoid(num_samples: usize, dt: f64, amplitude: f64, frequency: f64, offset: f64) -> Trace {
        let time: Vec<f64> = (0..num_samples).map(|i| i as f64 * dt).collect();
        let value: Vec<f64> = time.iter()
            .map(|t| offset + amplitude * (2. * PI * frequency * t / 1000.).sin())
            .collect();

        Trace::new(time, value).unwrap()
    }

    fn settings(window: AnalysisWindow, band: FrequencyBand, hann: bool) -> SpectralSettings {
        SpectralSettings {
            window,
            band,
            hann,
            detrend_linear: false,
        }
    }

    #[test]
    pub fn test_sinusoid_power_is_half_amplitude_squared() {
        // (dt in ms, number of samples), each an integer number of 10 Hz cycles
        let samplings = [(1., 1000), (2., 1000), (0.5, 4000), (0.1, 20000)];
        let amplitude = 3.;

        for (dt, n) in samplings {
            let trace = sinusoid(n, dt, amplitude, 10., -60.);
            let window = AnalysisWindow::new(0., (n - 1) as f64 * dt);

            let power = band_power(&trace, &settings(window, FrequencyBand::new(5., 15.), false)).unwrap();

            assert!(
                (power - amplitude.powi(2) / 2.).abs() < 1e-6,
                "dt: {}, power: {}", dt, power,
            );
        }
    }

    #[test]
    pub fn test_hann_preserves_sinusoid_power() {
        let trace = sinusoid(2000, 1., 2., 10., 0.);
        let window = AnalysisWindow::new(0., 1999.);

        let power = band_power(&trace, &settings(window, FrequencyBand::new(5., 15.), true)).unwrap();

        assert!((power - 2.).abs() < 0.1, "power: {}", power);
    }

    #[test]
    pub fn test_band_outside_sinusoid_is_zero() {
        let trace = sinusoid(1000, 1., 2., 10., -50.);
        let window = AnalysisWindow::new(0., 999.);

        let power = band_power(&trace, &settings(window, FrequencyBand::new(40., 60.), false)).unwrap();
        assert!(power.abs() < 1e-9, "power: {}", power);

        let total = band_power(&trace, &settings(window, FrequencyBand::new(0., 500.), false)).unwrap();
        assert!((total - 2.).abs() < 1e-6);
    }

    #[test]
    pub fn test_noisy_oscillation_in_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0., 0.1).unwrap();

        let time: Vec<f64> = (0..5000).map(|i| 1000. + i as f64).collect();
        let value: Vec<f64> = time.iter()
            .map(|t| 2. * (2. * PI * 10. * t / 1000.).sin() + noise.sample(&mut rng))
            .collect();
        let trace = Trace::new(time, value).unwrap();

        let power = band_power(&trace, &SpectralSettings::default()).unwrap();

        assert!((power - 2.).abs() < 0.2, "power: {}", power);
    }

    #[test]
    pub fn test_band_power_is_non_negative() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise = Normal::new(-60., 5.).unwrap();

        let time: Vec<f64> = (0..3000).map(|i| i as f64 * 0.5).collect();
        let value: Vec<f64> = time.iter().map(|_| noise.sample(&mut rng)).collect();
        let trace = Trace::new(time, value).unwrap();

        for hann in [true, false] {
            let power = band_power(
                &trace, &settings(AnalysisWindow::new(0., 1500.), FrequencyBand::new(1., 100.), hann),
            ).unwrap();

            assert!(power >= 0.);
        }
    }

    #[test]
    pub fn test_linear_detrend_removes_ramp() {
        let time: Vec<f64> = (0..5001).map(|i| 1000. + i as f64).collect();
        let value: Vec<f64> = time.iter().map(|t| -70. + 0.01 * t).collect();
        let trace = Trace::new(time, value).unwrap();

        let mut spectral_settings = settings(
            AnalysisWindow::new(1000., 6000.), FrequencyBand::new(0.5, 15.), false,
        );

        let raw = band_power(&trace, &spectral_settings).unwrap();

        spectral_settings.detrend_linear = true;
        let detrended = band_power(&trace, &spectral_settings).unwrap();

        assert!(raw > 1e-3, "raw: {}", raw);
        assert!(detrended < 1e-12, "detrended: {}", detrended);
    }

    #[test]
    pub fn test_mean_is_always_removed() {
        let time: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let trace = Trace::new(time, vec![-65.; 1000]).unwrap();

        let power = band_power(
            &trace, &settings(AnalysisWindow::new(0., 999.), FrequencyBand::new(0., 5.), false),
        ).unwrap();

        assert!(power.abs() < 1e-12, "power: {}", power);
    }

    #[test]
    pub fn test_inverted_band_is_zero() {
        let trace = sinusoid(1000, 1., 2., 10., 0.);
        let window = AnalysisWindow::new(0., 999.);

        let power = band_power(&trace, &settings(window, FrequencyBand::new(15., 5.), true)).unwrap();
        assert_eq!(power, 0.);

        let power = band_power(&trace, &settings(window, FrequencyBand::new(10.2, 10.8), true)).unwrap();
        assert_eq!(power, 0.);
    }

    #[test]
    pub fn test_empty_window_fails() {
        let trace = sinusoid(1000, 1., 2., 10., 0.);
        let result = band_power(
            &trace, &settings(AnalysisWindow::new(5000., 6000.), FrequencyBand::new(5., 15.), true),
        );

        assert!(matches!(result, Err(SpectralError::EmptyWindow { .. })));
    }

    #[test]
    pub fn test_degenerate_inputs_fail() {
        let single = Trace::new(vec![1000.], vec![-65.]).unwrap();
        let result = band_power(&single, &SpectralSettings::default());
        assert!(matches!(result, Err(SpectralError::DegenerateInput(_))));

        let duplicated = Trace::new(vec![1000.; 10], vec![-65.; 10]).unwrap();
        let result = band_power(&duplicated, &SpectralSettings::default());
        assert!(matches!(result, Err(SpectralError::DegenerateInput(_))));
    }

    #[test]
    pub fn test_nan_input_propagates() {
        let mut trace = sinusoid(1000, 1., 2., 10., 0.);
        trace.value[500] = f64::NAN;

        let power = band_power(
            &trace, &settings(AnalysisWindow::new(0., 999.), FrequencyBand::new(5., 15.), true),
        ).unwrap();

        assert!(power.is_nan());
    }

    #[test]
    pub fn test_sampling_rate_uses_median_step() {
        let time = vec![0., 1., 2., 3.5, 4.5, 5.5];
        assert_eq!(sampling_rate(&time).unwrap(), 1000.);

        assert_eq!(median(&[3., 1., 2.]), Some(2.));
        assert_eq!(median(&[4., 1., 2., 3.]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    pub fn test_periodogram_bins() {
        let even = one_sided_psd(&[1., -1., 1., -1.], 1000., false, true).unwrap();
        assert_eq!(even.0.to_vec(), vec![0., 250., 500.]);

        let odd = one_sided_psd(&[1., 2., 3., 4., 5.], 1000., false, true).unwrap();
        assert_eq!(odd.0.len(), 3);
        assert!((odd.0[2] - 400.).abs() < 1e-9);

        // alternating signal only has power at Nyquist, which is not doubled
        let (faxis, pxx) = even;
        assert!(pxx[0].abs() < 1e-12);
        assert!(pxx[1].abs() < 1e-12);
        assert!((pxx[2] - 16. / (1000. * 4.)).abs() < 1e-12);
        assert_eq!(band_integral(&faxis, &pxx, &FrequencyBand::new(0., 100.)), 0.);
    }

    #[test]
    pub fn test_hann_window_shape() {
        let window = hann_window(5);
        let expected = [0., 0.5, 1., 0.5, 0.];

        for (w, e) in window.iter().zip(expected) {
            assert!((w - e).abs() < 1e-12);
        }

        assert_eq!(hann_window(1).to_vec(), vec![1.]);
    }

    #[test]
    pub fn test_trapezoid() {
        assert_eq!(trapezoid(&[1., 1., 1.], &[0., 1., 3.]), 3.);
        assert_eq!(trapezoid(&[0., 2.], &[0., 2.]), 2.);
        assert_eq!(trapezoid(&[5.], &[1.]), 0.);
    }
}
