use std::{env, process::ExitCode};
use log::{error, info, warn};
use retinal_sweeps::{config::AnalysisConfig, pipeline::run_analysis};


fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        error!("Requires .toml argument file");
        return ExitCode::from(2);
    }

    let config = match AnalysisConfig::from_file(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    match run_analysis(&config) {
        Ok(outputs) => {
            let report = &outputs.report;
            info!(
                "computed {}/{} cells ({} skipped, {} ignored)",
                report.populated, report.expected, report.skipped.len(), report.ignored,
            );
            if !report.is_complete() {
                warn!("Missing cells are left empty in the exported tables");
            }

            ExitCode::SUCCESS
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
