use chrono::Local;
use deepae::param::{self, Param};
use deepae::run;
use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle, WriteMode};
use log::{error, info, Record};
use std::error::Error;
use std::io::Write;
use std::path::Path;
use std::process;

const DEFAULT_PARAM_FILE: &str = "param.yaml";

fn custom_format(w: &mut dyn Write, _now: &mut DeferredNow, record: &Record) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} [{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        record.level(),
        &record.args()
    )
}

fn start_logger(param: &Param) -> Result<LoggerHandle, Box<dyn Error>> {
    let logger = Logger::try_with_str(&param.general.log_level)?;

    let handle = if !param.general.log_base.is_empty() {
        logger
            .log_to_file(
                FileSpec::default()
                    .basename(&param.general.log_base)
                    .suffix(&param.general.log_suffix),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .format_for_files(custom_format)
            .start()?
    } else {
        logger
            .write_mode(WriteMode::Direct)
            .format_for_stderr(custom_format)
            .start()?
    };

    Ok(handle)
}

fn load_param() -> Result<Param, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => param::get(path),
        None if Path::new(DEFAULT_PARAM_FILE).exists() => param::get(DEFAULT_PARAM_FILE.to_string()),
        None => {
            let mut param = Param::default();
            param::validate(&mut param)?;
            Ok(param)
        }
    }
}

fn main() {
    let param = match load_param() {
        Ok(param) => param,
        Err(e) => {
            eprintln!("Invalid parameters: {}", e);
            process::exit(1);
        }
    };

    let _logger = match start_logger(&param) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Cannot start logger: {}", e);
            process::exit(1);
        }
    };

    info!("deepae {}", deepae::experiment::version());

    match run(&param) {
        Ok(experiment) => {
            info!("Experiment {} completed in {:.2}s", experiment.id, experiment.execution_time);
            if let Err(e) = experiment.report(std::io::stdout()) {
                error!("Cannot write report: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
