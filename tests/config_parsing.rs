#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use tempfile::TempDir;
    use retinal_sweeps::{
        config::{AnalysisConfig, AnalysisMode, GradientConfig, KneeConfig, OutputConfig},
        error::ConfigError,
        knee::KneeMethod,
        spectral::SpectralSettings,
        sweep::DuplicatePolicy,
        trace::{AnalysisWindow, Delimiter, ParseTolerance, TraceLoaderSettings},
    };


    const MINIMAL: &str = r#"
        [sweep]
        directory = "ON_GC_fovea"
        prefix = "ON_GC"

        [sweep.rows]
        name = "Rod"
        values = [400, 200, 0]

        [sweep.columns]
        name = "Cone"
        values = [20, 10, 0]
    "#;

    fn expect_invalid_field(content: &str, expected_field: &str) {
        match AnalysisConfig::from_toml_str(content) {
            Err(ConfigError::InvalidField { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected invalid '{}', got {:?}", expected_field, other.map(|c| c.mode)),
        }
    }

    #[test]
    pub fn test_minimal_config_uses_defaults() {
        let config = AnalysisConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.sweep.directory, PathBuf::from("ON_GC_fovea"));
        assert_eq!(config.sweep.prefix, "ON_GC");
        assert_eq!(config.sweep.row_marker, "R");
        assert_eq!(config.sweep.col_marker, "C");
        assert_eq!(config.sweep.extension, "txt");
        assert!(!config.sweep.recursive);
        assert!(config.sweep.parallel);
        assert_eq!(config.sweep.duplicates, DuplicatePolicy::LastWriteWins);

        assert_eq!(config.sweep.rows.name, "Rod");
        assert_eq!(config.sweep.rows.values, vec![400, 200, 0]);
        assert!(config.sweep.rows.aliases.is_empty());
        assert_eq!(config.sweep.columns.values, vec![20, 10, 0]);

        assert_eq!(config.loader, TraceLoaderSettings::default());
        assert_eq!(config.mode, AnalysisMode::BandPower(SpectralSettings::default()));
        assert_eq!(config.knee, KneeConfig::default());
        assert_eq!(config.gradient, GradientConfig::default());
        assert_eq!(config.output, OutputConfig::default());
        assert_eq!(config.output_directory(), PathBuf::from("ON_GC_fovea"));
    }

    #[test]
    pub fn test_full_config() {
        let content = r#"
            [sweep]
            directory = "sweeps/ON_GC_fovea"
            prefix = "ON_GC"
            row_marker = "R"
            col_marker = "C"
            extension = "csv"
            recursive = true
            parallel = false
            duplicates = "reject"

            [sweep.rows]
            name = "Rod"
            values = [400, 200, 0]
            aliases = [[0, 1]]
            max = 400
            percent_decimals = 0

            [sweep.columns]
            name = "Cone"
            values = [20, 10, 0]

            [trace]
            header_lines = 2
            delimiter = "auto"
            tolerance = "drop_malformed"

            [analysis]
            mode = "firing_rate"
            window = [500, 5500.0]
            threshold_high = -10
            threshold_low = -40.5

            [knee]
            smoothing_width = 3
            monotone_decreasing = true
            row_method = "max_drop"
            column_method = "max_gradient"

            [gradient]
            enabled = true
            smoothing_width = 3
            percentile = 80

            [output]
            directory = "results"
            matrix = "firing_rate.csv"
        "#;

        let config = AnalysisConfig::from_toml_str(content).unwrap();

        assert_eq!(config.sweep.extension, "csv");
        assert!(config.sweep.recursive);
        assert!(!config.sweep.parallel);
        assert_eq!(config.sweep.duplicates, DuplicatePolicy::Reject);
        assert_eq!(config.sweep.rows.aliases, vec![(0, 1)]);
        assert_eq!(config.sweep.rows.percent_scale, Some(400.));
        assert_eq!(config.sweep.rows.percent_decimals, Some(0));
        assert_eq!(config.sweep.rows.labels(), vec!["100", "50", "0"]);

        assert_eq!(config.loader.header_lines, 2);
        assert_eq!(config.loader.delimiter, Delimiter::Auto);
        assert_eq!(config.loader.tolerance, ParseTolerance::DropMalformed);

        match config.mode {
            AnalysisMode::FiringRate(settings) => {
                assert_eq!(settings.window, AnalysisWindow::new(500., 5500.));
                assert_eq!(settings.thresholds.high, -10.);
                assert_eq!(settings.thresholds.low, -40.5);
            },
            other => panic!("expected firing rate mode, got {:?}", other),
        }

        assert!(config.knee.enabled);
        assert_eq!(config.knee.settings.smoothing_width, 3);
        assert!(config.knee.settings.monotone_decreasing);
        assert_eq!(config.knee.row_method, KneeMethod::MaxDrop);
        assert_eq!(config.knee.column_method, KneeMethod::MaxGradient);

        assert!(config.gradient.enabled);
        assert_eq!(config.gradient.smoothing_width, 3);
        assert_eq!(config.gradient.percentile, 80.);

        assert_eq!(config.output.matrix, "firing_rate.csv");
        assert_eq!(config.output.knee_by_row, "knee_by_row.csv");
        assert_eq!(config.output_directory(), PathBuf::from("results"));

        let settings = config.sweep.to_settings().unwrap();
        assert!(settings.pattern.parse("ON_GC_R400_C20.csv").is_some());
        assert!(settings.pattern.parse("ON_GC_R400_C20.txt").is_none());
    }

    #[test]
    pub fn test_band_power_settings() {
        let content = format!(
            "{}\n[analysis]\nmode = \"band_power\"\nband = [8, 12.5]\nhann = false\ndetrend_linear = true\n",
            MINIMAL,
        );

        let config = AnalysisConfig::from_toml_str(&content).unwrap();

        match config.mode {
            AnalysisMode::BandPower(settings) => {
                assert_eq!(settings.window, AnalysisWindow::default());
                assert_eq!(settings.band.low, 8.);
                assert_eq!(settings.band.high, 12.5);
                assert!(!settings.hann);
                assert!(settings.detrend_linear);
            },
            other => panic!("expected band power mode, got {:?}", other),
        }
    }

    #[test]
    pub fn test_missing_fields() {
        let result = AnalysisConfig::from_toml_str("[analysis]\nmode = \"band_power\"\n");
        assert!(matches!(result, Err(ConfigError::MissingField(field)) if field == "sweep"));

        let no_rows = "[sweep]\ndirectory = \"a\"\nprefix = \"b\"\n[sweep.columns]\nvalues = [1]\n";
        let result = AnalysisConfig::from_toml_str(no_rows);
        assert!(matches!(result, Err(ConfigError::MissingField(field)) if field == "sweep.rows"));

        let no_values = "[sweep]\ndirectory = \"a\"\nprefix = \"b\"\n[sweep.rows]\nname = \"Rod\"\n\
            [sweep.columns]\nvalues = [1]\n";
        let result = AnalysisConfig::from_toml_str(no_values);
        assert!(matches!(result, Err(ConfigError::MissingField(field)) if field == "values"));
    }

    #[test]
    pub fn test_invalid_fields() {
        expect_invalid_field(&format!("{}\n[analysis]\nmode = \"spectrogram\"\n", MINIMAL), "mode");
        expect_invalid_field(&format!("{}\n[analysis]\nwindow = [1000]\n", MINIMAL), "window");
        expect_invalid_field(&format!("{}\n[gradient]\npercentile = 150\n", MINIMAL), "percentile");
        expect_invalid_field(&format!("{}\n[trace]\ndelimiter = \";\"\n", MINIMAL), "delimiter");
        expect_invalid_field(&format!("{}\n[knee]\nrow_method = \"steepest\"\n", MINIMAL), "row_method");

        let bad_parallel = MINIMAL.replace("prefix = \"ON_GC\"", "prefix = \"ON_GC\"\nparallel = \"yes\"");
        expect_invalid_field(&bad_parallel, "parallel");

        let negative_value = MINIMAL.replace("values = [20, 10, 0]", "values = [20, -10, 0]");
        expect_invalid_field(&negative_value, "values");
    }

    #[test]
    pub fn test_unparseable_and_missing_files() {
        let result = AnalysisConfig::from_toml_str("[sweep\ndirectory = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        let dir = TempDir::new().unwrap();
        let result = AnalysisConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));

        let path = dir.path().join("analysis.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        assert!(AnalysisConfig::from_file(&path).is_ok());
    }
}
