#![allow(non_snake_case)]

pub mod data;
pub mod experiment;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod param;
pub mod sampling;

use crate::experiment::{draw_seeds, run_repetition, version, Experiment};
use chrono::Local;
use data::Data;
use log::{debug, info};
use param::Param;
use std::error::Error;

pub fn run(param: &Param) -> Result<Experiment, Box<dyn Error>> {
    // Load data
    let mut data = Data::new();
    data.load_data(&param.data.X, param.data.skip_leading_columns, param.data.skip_trailing_columns)?;
    debug!("{:?}", data);

    run_on_data(&data, &param.data.X, param)
}

pub fn run_on_data(data: &Data, data_path: &str, param: &Param) -> Result<Experiment, Box<dyn Error>> {
    let start = std::time::Instant::now();
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(param.general.thread_number)
        .build()?;

    let seeds = draw_seeds(param)?;
    info!("Seeds: {:?}", seeds);

    let mut repetitions = Vec::with_capacity(seeds.len());
    for (i, &seed) in seeds.iter().enumerate() {
        info!("Repetition #{} (seed {})\n-----------------------------------------------------", i, seed);
        let repetition = pool.install(|| run_repetition(data, param, i, seed))?;
        info!("train: {}", repetition.train);
        info!("test:  {}", repetition.test);
        info!("----------------End Iteration: {}------------------------", i);
        repetitions.push(repetition);
    }

    let results = Experiment::results_from(&repetitions, &param.general.model_name);

    Ok(Experiment {
        id: format!("{}_{}", param.general.model_name, timestamp),
        deepae_version: version(),
        timestamp,
        data_path: data_path.to_string(),
        seeds,
        repetitions,
        results,
        execution_time: start.elapsed().as_secs_f64(),
        parameters: param.clone(),
    })
}
